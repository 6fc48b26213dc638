use crate::common::constants::BROWSER_USER_AGENT;
use crate::common::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Local hour of day the cycle starts at.
    pub run_hour: u32,
    pub run_every_days: u32,
    pub failure_backoff_secs: u64,
    /// Source ids to run. Empty means every registered source.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Resolve scraped hostnames and redirect targets, rejecting those that
    /// point at private ranges.
    pub resolve_hosts: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            run_hour: 1,
            run_every_days: 1,
            failure_backoff_secs: 3600,
            sources: Vec::new(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            min_delay_ms: 3000,
            max_delay_ms: 5000,
            resolve_hosts: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/gigs.db".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ScraperError::Config(format!("Invalid value for {}: '{}'", key, raw)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScraperError::Config(format!("Invalid value for {}: '{}'", key, raw))),
    }
}

pub fn parse_source_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Reads `GIGS_CONFIG` (default `config.toml`) if present, then applies
    /// `GIGS_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GIGS_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = if Path::new(&config_path).exists() {
            let config_content = fs::read_to_string(&config_path).map_err(|e| {
                ScraperError::Config(format!("Failed to read config file '{}': {}", config_path, e))
            })?;
            Self::from_toml_str(&config_content)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GIGS_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Some(v) = lookup("GIGS_API_PORT") {
            self.api.port = parse_var("GIGS_API_PORT", &v)?;
        }
        if let Some(v) = lookup("GIGS_RUN_HOUR") {
            self.scheduler.run_hour = parse_var("GIGS_RUN_HOUR", &v)?;
        }
        if let Some(v) = lookup("GIGS_RUN_EVERY_DAYS") {
            self.scheduler.run_every_days = parse_var("GIGS_RUN_EVERY_DAYS", &v)?;
        }
        if let Some(v) = lookup("GIGS_FAILURE_BACKOFF_SECS") {
            self.scheduler.failure_backoff_secs = parse_var("GIGS_FAILURE_BACKOFF_SECS", &v)?;
        }
        if let Some(v) = lookup("GIGS_SOURCES") {
            self.scheduler.sources = parse_source_list(&v);
        }
        if let Some(v) = lookup("GIGS_REQUEST_TIMEOUT_SECS") {
            self.http.request_timeout_secs = parse_var("GIGS_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("GIGS_USER_AGENT") {
            self.http.user_agent = v;
        }
        if let Some(v) = lookup("GIGS_MIN_DELAY_MS") {
            self.http.min_delay_ms = parse_var("GIGS_MIN_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("GIGS_MAX_DELAY_MS") {
            self.http.max_delay_ms = parse_var("GIGS_MAX_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("GIGS_RESOLVE_HOSTS") {
            self.http.resolve_hosts = parse_bool("GIGS_RESOLVE_HOSTS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.run_hour > 23 {
            return Err(ScraperError::Config(format!(
                "run_hour must be 0-23, got {}",
                self.scheduler.run_hour
            )));
        }
        if self.scheduler.run_every_days == 0 {
            return Err(ScraperError::Config("run_every_days must be at least 1".into()));
        }
        if self.http.min_delay_ms > self.http.max_delay_ms {
            return Err(ScraperError::Config(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.http.min_delay_ms, self.http.max_delay_ms
            )));
        }
        Ok(())
    }
}
