use clap::{Parser, Subcommand};
use gigs_scraper::config::{parse_source_list, Config};
use gigs_scraper::infra::http_client::ReqwestFetcher;
use gigs_scraper::logging;
use gigs_scraper::scheduler::{Runner, Schedule};
use gigs_scraper::scrapers::{self, Pacing};
use gigs_scraper::server;
use gigs_scraper::telemetry;
use gigs_scraper::storage::{EventStore, SqliteStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "gigs_scraper")]
#[command(about = "Concert listing scraper for Finnish live music venues")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scrape scheduler, serving the read API alongside it
    Run {
        /// Source ids to scrape (comma-separated). Defaults to the configured set
        #[arg(long)]
        sources: Option<String>,
        /// Do not start the read API
        #[arg(long)]
        no_api: bool,
    },
    /// Run a single scrape cycle and exit
    Once {
        /// Source ids to scrape (comma-separated)
        #[arg(long)]
        sources: Option<String>,
    },
    /// List the registered sources
    Sources,
    /// Serve the read API only
    Serve,
}

fn build_runner(
    config: &Config,
    sources: Option<String>,
    store: Arc<SqliteStore>,
    cancel: CancellationToken,
) -> anyhow::Result<Runner> {
    let filter = sources
        .as_deref()
        .map(parse_source_list)
        .unwrap_or_else(|| config.scheduler.sources.clone());
    let registry = scrapers::registry(&filter);
    if registry.is_empty() {
        anyhow::bail!("no known sources selected");
    }
    info!(sources = registry.len(), "Registered scrapers");

    let http = Arc::new(ReqwestFetcher::new(&config.http)?);
    Ok(Runner::new(registry, store, http, Schedule::from_config(config), cancel)
        .with_pacing(Pacing::new(config.http.min_delay_ms, config.http.max_delay_ms))
        .with_resolve_hosts(config.http.resolve_hosts))
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
        cancel.cancel();
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    if let Commands::Sources = cli.command {
        for id in gigs_scraper::common::constants::get_supported_sources() {
            if let Some(scraper) = scrapers::create_scraper(id) {
                let source = scraper.source();
                println!("{:<20} {} ({})", source.id, source.venue, source.city);
            }
        }
        return Ok(());
    }

    telemetry::init_metrics();
    let store = Arc::new(SqliteStore::open(&config.storage.db_path)?);
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Run { sources, no_api } => {
            let mut runner = build_runner(&config, sources, store.clone(), cancel.clone())?;
            let api = if no_api {
                None
            } else {
                let events: Arc<dyn EventStore> = store.clone();
                Some(tokio::spawn(server::start_server(
                    events,
                    config.api.port,
                    cancel.clone(),
                )))
            };

            runner.run().await;

            if let Some(api) = api {
                cancel.cancel();
                match api.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
                    Err(e) => error!(error = %e, "HTTP server task crashed"),
                }
            }
        }
        Commands::Once { sources } => {
            let mut runner = build_runner(&config, sources, store, cancel)?;
            match runner.run_once().await {
                Some(outcome) => {
                    println!("\nCycle results:");
                    for s in &outcome.report.per_source {
                        println!(
                            "   {:<20} scraped {:>3}  new {:>3}  updated {:>3}  unchanged {:>3}  failed {:>3}",
                            s.source, s.scraped, s.inserted, s.updated, s.unchanged, s.failed
                        );
                    }
                    println!("   Purged: {}", outcome.report.purged);
                    println!("   Events known: {}", outcome.snapshot.len());
                    if let Some(failure) = outcome.failure {
                        anyhow::bail!("cycle failed: {}", failure);
                    }
                }
                None => info!("Cancelled before the cycle started"),
            }
        }
        Commands::Serve => {
            let events: Arc<dyn EventStore> = store;
            server::start_server(events, config.api.port, cancel).await?;
        }
        Commands::Sources => {}
    }

    Ok(())
}
