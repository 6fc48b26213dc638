use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required node: {0}")]
    MissingNode(String),

    #[error("Could not parse {field} from '{input}'")]
    Parse { field: &'static str, input: String },

    #[error("Unknown month name: '{0}'")]
    UnknownMonth(String),

    #[error("Refusing unsafe URL: {0}")]
    UnsafeUrl(String),

    #[error("Store error: {message}")]
    Store { message: String },
}

impl ScraperError {
    pub fn parse(field: &'static str, input: impl Into<String>) -> Self {
        ScraperError::Parse {
            field,
            input: input.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        ScraperError::Store {
            message: message.into(),
        }
    }

    /// True when the error comes from the URL guard rather than from markup.
    pub fn is_security_rejection(&self) -> bool {
        matches!(self, ScraperError::UnsafeUrl(_))
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScraperError::Http(_) | ScraperError::Status { .. } => "http",
            ScraperError::Json(_) | ScraperError::Toml(_) => "decode",
            ScraperError::Io(_) => "io",
            ScraperError::Sqlite(_) | ScraperError::Store { .. } => "store",
            ScraperError::Env(_) | ScraperError::Config(_) => "config",
            ScraperError::MissingNode(_) => "missing_node",
            ScraperError::Parse { .. } => "parse",
            ScraperError::UnknownMonth(_) => "unknown_month",
            ScraperError::UnsafeUrl(_) => "unsafe_url",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
