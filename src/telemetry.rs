//! Prometheus recorder behind the `gigs_*` counters and histograms.
//!
//! The recorder is installed once per process. The read API renders it on
//! `GET /metrics`.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn describe_metrics() {
    describe_counter!(
        "gigs_scrape_events_total",
        "Events parsed per source, after per-run deduplication"
    );
    describe_counter!(
        "gigs_scrape_errors_total",
        "Listing, node and detail page failures by source and error kind"
    );
    describe_counter!("gigs_reconcile_total", "Reconcile outcomes by kind");
    describe_counter!("gigs_purged_events_total", "Past events deleted from the store");
    describe_histogram!(
        "gigs_cycle_duration_seconds",
        Unit::Seconds,
        "Wall time of one full scrape cycle"
    );
}

/// Installs the global recorder. Idempotent. Returns the render handle, or
/// `None` when another recorder was installed first.
pub fn init_metrics() -> Option<PrometheusHandle> {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle was already set");
            }
            describe_metrics();
            info!("Prometheus recorder installed");
        }
        Err(e) => warn!(error = %e, "Failed to install Prometheus recorder"),
    });
    HANDLE.get().cloned()
}

/// Current metrics in the Prometheus text format, when the recorder is installed.
pub fn render() -> Option<String> {
    let handle = HANDLE.get()?;
    handle.run_upkeep();
    Some(handle.render())
}
