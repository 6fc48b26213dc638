//! Long-running runner: load the snapshot once, then cycle through every
//! registered scraper, reconcile, purge and sleep until the next slot.

use crate::app::ports::{EventStore, HttpFetcher, VenueStore};
use crate::config::Config;
use crate::domain::Event;
use crate::reconcile::{ReconcileSummary, Reconciler};
use crate::resolver::VenueResolver;
use crate::scrapers::{EventScraper, Pacing, ScrapeContext};
use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Loading,
    Running,
    Sleeping,
    Stopped,
}

/// When cycles run, and how long to back off after a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub run_hour: u32,
    pub run_every_days: u32,
    pub failure_backoff: Duration,
}

impl Schedule {
    pub fn from_config(config: &Config) -> Self {
        Self {
            run_hour: config.scheduler.run_hour,
            run_every_days: config.scheduler.run_every_days,
            failure_backoff: Duration::from_secs(config.scheduler.failure_backoff_secs),
        }
    }

    pub fn delay_after(&self, cycle_failed: bool, now: NaiveDateTime) -> Duration {
        if cycle_failed {
            self.failure_backoff
        } else {
            next_run_delay(now, self.run_hour, self.run_every_days)
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Time until `run_hour:00`, `every_days` days after `now`'s date. A target
/// less than an hour away is pushed back by a day.
pub fn next_run_delay(now: NaiveDateTime, run_hour: u32, every_days: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(run_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut target = now
        .date()
        .checked_add_days(Days::new(u64::from(every_days)))
        .unwrap_or(now.date())
        .and_time(at);
    while target - now < chrono::Duration::hours(1) {
        target += chrono::Duration::days(1);
    }
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

/// Drops events dated strictly before `today`.
pub fn retain_current(mut snapshot: Vec<Event>, today: NaiveDate) -> Vec<Event> {
    snapshot.retain(|e| !e.is_expired(today));
    snapshot
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: &'static str,
    pub scraped: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl SourceReport {
    fn new(source: &'static str, scraped: usize, summary: &ReconcileSummary) -> Self {
        Self {
            source,
            scraped,
            inserted: summary.inserted,
            updated: summary.updated,
            unchanged: summary.unchanged,
            failed: summary.failed,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub per_source: Vec<SourceReport>,
    pub purged: u64,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct CycleOutcome {
    pub snapshot: Vec<Event>,
    pub report: CycleReport,
    /// Set when a scraper failed in a way that aborts the cycle.
    pub failure: Option<String>,
    pub cancelled: bool,
}

pub struct Runner {
    scrapers: Vec<Arc<dyn EventScraper>>,
    store: Arc<dyn EventStore>,
    reconciler: Reconciler,
    resolver: VenueResolver,
    http: Arc<dyn HttpFetcher>,
    schedule: Schedule,
    pacing: Pacing,
    resolve_hosts: bool,
    cancel: CancellationToken,
    state: RunnerState,
}

impl Runner {
    pub fn new<S>(
        scrapers: Vec<Arc<dyn EventScraper>>,
        store: Arc<S>,
        http: Arc<dyn HttpFetcher>,
        schedule: Schedule,
        cancel: CancellationToken,
    ) -> Self
    where
        S: EventStore + VenueStore + 'static,
    {
        let events: Arc<dyn EventStore> = store.clone();
        let venues: Arc<dyn VenueStore> = store;
        Self {
            scrapers,
            reconciler: Reconciler::new(events.clone()),
            store: events,
            resolver: VenueResolver::new(venues),
            http,
            schedule,
            pacing: Pacing::default(),
            resolve_hosts: true,
            cancel,
            state: RunnerState::Idle,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_resolve_hosts(mut self, resolve_hosts: bool) -> Self {
        self.resolve_hosts = resolve_hosts;
        self
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    fn context(&self, today: NaiveDate) -> ScrapeContext {
        ScrapeContext {
            http: self.http.clone(),
            resolver: self.resolver.clone(),
            today,
            pacing: self.pacing,
            resolve_hosts: self.resolve_hosts,
            cancel: self.cancel.clone(),
        }
    }

    /// Loads every stored event, retrying after the failure backoff.
    /// `None` when cancelled first.
    pub async fn load_snapshot(&mut self) -> Option<Vec<Event>> {
        self.state = RunnerState::Loading;
        loop {
            match self.store.list_all_events().await {
                Ok(events) => {
                    info!(events = events.len(), "Loaded event snapshot");
                    return Some(events);
                }
                Err(e) => {
                    error!(error = %e, backoff_secs = self.schedule.failure_backoff.as_secs(), "Failed to load events");
                }
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.schedule.failure_backoff) => {}
            }
        }
    }

    /// One pass over every scraper in registration order, then the purge.
    /// Each scraper's batch is reconciled before the next one runs.
    pub async fn run_cycle(&mut self, mut snapshot: Vec<Event>, today: NaiveDate) -> CycleOutcome {
        self.state = RunnerState::Running;
        let started = Instant::now();
        let mut report = CycleReport::default();
        let ctx = self.context(today);
        info!(%today, sources = self.scrapers.len(), "Starting scrape cycle");

        for scraper in self.scrapers.clone() {
            if self.cancel.is_cancelled() {
                return self.cancelled(snapshot, report, started);
            }
            let source = scraper.source().id;
            let task_ctx = ctx.clone();
            let task_scraper = scraper.clone();
            let mut handle =
                tokio::spawn(async move { task_scraper.scrape_events(&task_ctx).await });

            let joined = tokio::select! {
                _ = self.cancel.cancelled() => None,
                joined = &mut handle => Some(joined),
            };
            let Some(joined) = joined else {
                handle.abort();
                info!(source, "Cancelled during scrape");
                return self.cancelled(snapshot, report, started);
            };

            let candidates = match joined {
                Ok(Ok(events)) => events,
                Ok(Err(e)) => {
                    error!(source, error = %e, "Scraper failed, aborting cycle");
                    return self.failed(snapshot, report, started, format!("{}: {}", source, e));
                }
                Err(e) => {
                    error!(source, error = %e, "Scraper task crashed, aborting cycle");
                    return self.failed(snapshot, report, started, format!("{}: {}", source, e));
                }
            };

            let scraped = candidates.len();
            let reconciled = self.reconciler.reconcile(candidates, snapshot).await;
            snapshot = reconciled.snapshot;
            report
                .per_source
                .push(SourceReport::new(source, scraped, &reconciled.summary));
        }

        let (snapshot, purged) = self.purge(snapshot, today).await;
        report.purged = purged;
        report.duration = started.elapsed();
        histogram!("gigs_cycle_duration_seconds").record(report.duration.as_secs_f64());
        log_report(&report);

        CycleOutcome {
            snapshot,
            report,
            failure: None,
            cancelled: false,
        }
    }

    /// Deletes past events from the store, and from the snapshot only once
    /// the store accepted the delete.
    async fn purge(&self, snapshot: Vec<Event>, today: NaiveDate) -> (Vec<Event>, u64) {
        match self.store.delete_events_before(today).await {
            Ok(purged) => {
                counter!("gigs_purged_events_total").increment(purged);
                info!(purged, %today, "Purged past events");
                (retain_current(snapshot, today), purged)
            }
            Err(e) => {
                warn!(error = %e, "Purge failed, keeping snapshot as is");
                (snapshot, 0)
            }
        }
    }

    fn cancelled(&self, snapshot: Vec<Event>, mut report: CycleReport, started: Instant) -> CycleOutcome {
        report.duration = started.elapsed();
        CycleOutcome {
            snapshot,
            report,
            failure: None,
            cancelled: true,
        }
    }

    fn failed(
        &self,
        snapshot: Vec<Event>,
        mut report: CycleReport,
        started: Instant,
        failure: String,
    ) -> CycleOutcome {
        report.duration = started.elapsed();
        histogram!("gigs_cycle_duration_seconds").record(report.duration.as_secs_f64());
        CycleOutcome {
            snapshot,
            report,
            failure: Some(failure),
            cancelled: false,
        }
    }

    /// Runs until cancelled.
    pub async fn run(&mut self) {
        let Some(mut snapshot) = self.load_snapshot().await else {
            info!("Cancelled before the first cycle");
            self.state = RunnerState::Stopped;
            return;
        };

        loop {
            let today = Local::now().date_naive();
            let outcome = self.run_cycle(snapshot, today).await;
            snapshot = outcome.snapshot;
            if outcome.cancelled || self.cancel.is_cancelled() {
                break;
            }

            let delay = self
                .schedule
                .delay_after(outcome.failure.is_some(), Local::now().naive_local());
            if let Some(failure) = &outcome.failure {
                warn!(%failure, retry_in_secs = delay.as_secs(), "Cycle failed, backing off");
            } else {
                info!(next_run_in_hours = delay.as_secs_f64() / 3600.0, "Cycle complete");
            }

            self.state = RunnerState::Sleeping;
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Runner stopped");
        self.state = RunnerState::Stopped;
    }

    /// Loads the snapshot and runs exactly one cycle.
    pub async fn run_once(&mut self) -> Option<CycleOutcome> {
        let snapshot = self.load_snapshot().await?;
        let outcome = self.run_cycle(snapshot, Local::now().date_naive()).await;
        self.state = RunnerState::Stopped;
        Some(outcome)
    }
}

fn log_report(report: &CycleReport) {
    for s in &report.per_source {
        info!(
            source = s.source,
            scraped = s.scraped,
            inserted = s.inserted,
            updated = s.updated,
            unchanged = s.unchanged,
            failed = s.failed,
            "Source summary"
        );
    }
    info!(
        sources = report.per_source.len(),
        purged = report.purged,
        duration_ms = report.duration.as_millis() as u64,
        "Cycle finished"
    );
}
