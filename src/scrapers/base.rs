//! Shared scrape lifecycle: fetch listing, select nodes, follow detail links,
//! normalize, dedupe. Venue specifics live in [`Dialect`] implementations.

use super::html::{self, Css};
use super::EventScraper;
use crate::app::ports::HttpFetcher;
use crate::common::error::{Result, ScraperError};
use crate::dates::Showtime;
use crate::domain::{City, Event, Venue};
use crate::normalize;
use crate::resolver::VenueResolver;
use crate::url_guard;
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use rand::Rng;
use scraper::{ElementRef, Html};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Fixed identity of one listing source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub id: &'static str,
    pub venue: &'static str,
    pub city: &'static str,
    pub url: &'static str,
}

/// Raw fields read off a page, before normalization.
#[derive(Debug, Clone)]
pub struct EventFields {
    pub artist: String,
    pub showtime: Showtime,
    pub price: String,
}

/// Data a listing node hands over to its detail page.
#[derive(Debug, Clone, Default)]
pub struct ListingHint {
    pub artist: Option<String>,
}

#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Parsed(EventFields),
    FollowLink { href: String, hint: ListingHint },
    Skip(&'static str),
}

/// Markup dialect of one venue site.
pub trait Dialect: Send + Sync + 'static {
    /// Event nodes on the listing page.
    fn event_nodes(&self) -> &'static Css;

    /// Element that must wrap the event nodes, when the page has one.
    fn container(&self) -> Option<&'static Css> {
        None
    }

    fn read_node(&self, node: ElementRef<'_>, today: NaiveDate) -> Result<NodeOutcome>;

    fn read_detail(&self, _doc: &Html, _hint: &ListingHint, _today: NaiveDate) -> Result<EventFields> {
        Err(ScraperError::MissingNode("detail page".into()))
    }
}

/// Randomized wait between detail page fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min_ms: u64,
    max_ms: u64,
}

impl Pacing {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn next_delay(&self) -> Duration {
        let ms = if self.max_ms > self.min_ms {
            rand::thread_rng().gen_range(self.min_ms..self.max_ms)
        } else {
            self.min_ms
        };
        Duration::from_millis(ms)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(3000, 5000)
    }
}

/// Capabilities handed to a scraper for one run.
#[derive(Clone)]
pub struct ScrapeContext {
    pub http: Arc<dyn HttpFetcher>,
    pub resolver: VenueResolver,
    pub today: NaiveDate,
    pub pacing: Pacing,
    pub resolve_hosts: bool,
    pub cancel: CancellationToken,
}

/// A [`Dialect`] bound to its source.
pub struct SourceScraper<D> {
    info: SourceInfo,
    dialect: D,
}

impl<D: Dialect> SourceScraper<D> {
    pub fn new(info: SourceInfo, dialect: D) -> Self {
        Self { info, dialect }
    }
}

#[async_trait]
impl<D: Dialect> EventScraper for SourceScraper<D> {
    fn source(&self) -> &SourceInfo {
        &self.info
    }

    async fn scrape_events(&self, ctx: &ScrapeContext) -> Result<Vec<Event>> {
        scrape_source(&self.info, &self.dialect, ctx).await
    }
}

pub(crate) fn plan_listing<D: Dialect>(
    dialect: &D,
    body: &str,
    today: NaiveDate,
) -> Result<Vec<Result<NodeOutcome>>> {
    let doc = Html::parse_document(body);
    let scope = match dialect.container() {
        Some(css) => html::require(doc.root_element(), css)?,
        None => doc.root_element(),
    };
    let outcomes = scope
        .select(dialect.event_nodes().selector())
        .map(|node| dialect.read_node(node, today))
        .collect();
    Ok(outcomes)
}

pub(crate) fn parse_detail<D: Dialect>(
    dialect: &D,
    body: &str,
    hint: &ListingHint,
    today: NaiveDate,
) -> Result<EventFields> {
    let doc = Html::parse_document(body);
    dialect.read_detail(&doc, hint, today)
}

fn build_event(fields: EventFields, venue: &Venue, city: &City) -> Result<Event> {
    let artist = normalize::clean(&fields.artist);
    if artist.is_empty() {
        return Err(ScraperError::MissingNode("artist".into()));
    }
    Ok(Event {
        id: None,
        artist,
        showtime: fields.showtime.at,
        has_showtime: fields.showtime.has_time,
        price: normalize::clean(&fields.price),
        venue: venue.clone(),
        city: city.clone(),
    })
}

fn record_node_error(info: &SourceInfo, index: usize, err: &ScraperError) {
    if err.is_security_rejection() {
        warn!(security = true, index, error = %err, "skipped link rejected by URL guard");
    } else {
        warn!(index, kind = err.kind(), error = %err, "skipping event node");
    }
    counter!("gigs_scrape_errors_total", "source" => info.id, "kind" => err.kind()).increment(1);
}

/// Waits one pacing interval. False when cancelled meanwhile.
async fn pause(ctx: &ScrapeContext) -> bool {
    let delay = ctx.pacing.next_delay();
    if delay.is_zero() {
        return !ctx.cancel.is_cancelled();
    }
    tokio::select! {
        _ = ctx.cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

async fn follow_link<D: Dialect>(
    info: &SourceInfo,
    dialect: &D,
    ctx: &ScrapeContext,
    href: &str,
    hint: &ListingHint,
) -> Result<EventFields> {
    let url = url_guard::resolve_link(info.url, href)?;
    url_guard::check_fetchable(&url, ctx.resolve_hosts).await?;
    let body = ctx.http.get_text(url.as_str()).await?;
    parse_detail(dialect, &body, hint, ctx.today)
}

/// Runs one source end to end.
///
/// Per-node failures are logged and skipped, and a failed listing fetch
/// yields an empty list. Only a resolver failure is returned as `Err`.
#[instrument(skip_all, fields(source = info.id))]
pub async fn scrape_source<D: Dialect>(
    info: &SourceInfo,
    dialect: &D,
    ctx: &ScrapeContext,
) -> Result<Vec<Event>> {
    info!(url = info.url, "Fetching listing");
    let listing = match ctx.http.get_text(info.url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Listing fetch failed, source contributes nothing this cycle");
            counter!("gigs_scrape_errors_total", "source" => info.id, "kind" => e.kind()).increment(1);
            return Ok(Vec::new());
        }
    };

    let planned = match plan_listing(dialect, &listing, ctx.today) {
        Ok(planned) => planned,
        Err(e) => {
            warn!(error = %e, "Listing markup not recognised");
            counter!("gigs_scrape_errors_total", "source" => info.id, "kind" => e.kind()).increment(1);
            return Ok(Vec::new());
        }
    };
    if planned.is_empty() {
        warn!("No events found - the page structure may have changed");
        return Ok(Vec::new());
    }
    info!(nodes = planned.len(), "Found event nodes");

    let (venue, city) = ctx.resolver.resolve(info.venue, info.city).await?;

    let mut events: Vec<Event> = Vec::new();
    let mut detail_fetches = 0usize;
    for (index, outcome) in planned.into_iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            info!(index, "Cancelled, stopping source early");
            break;
        }
        let fields = match outcome {
            Ok(NodeOutcome::Parsed(fields)) => Ok(fields),
            Ok(NodeOutcome::Skip(reason)) => {
                debug!(index, reason, "Skipping node");
                continue;
            }
            Ok(NodeOutcome::FollowLink { href, hint }) => {
                if detail_fetches > 0 && !pause(ctx).await {
                    info!(index, "Cancelled while pacing");
                    break;
                }
                detail_fetches += 1;
                follow_link(info, dialect, ctx, &href, &hint).await
            }
            Err(e) => Err(e),
        };
        match fields.and_then(|f| build_event(f, &venue, &city)) {
            Ok(event) => {
                debug!(%event, "Parsed event");
                if !events.contains(&event) {
                    events.push(event);
                }
            }
            Err(e) => record_node_error(info, index, &e),
        }
    }

    counter!("gigs_scrape_events_total", "source" => info.id).increment(events.len() as u64);
    info!(events = events.len(), "Parsed events");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::in_memory::InMemoryStore;
    use once_cell::sync::Lazy;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpFetcher for FakeFetcher {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or(ScraperError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    static ITEMS: Lazy<Css> = Lazy::new(|| Css::new("li"));
    static TIME: Lazy<Css> = Lazy::new(|| Css::new("time"));

    /// `<li data-artist=.. data-date=..>` on the listing; `<a>` items go to detail pages.
    struct TestDialect;

    impl Dialect for TestDialect {
        fn event_nodes(&self) -> &'static Css {
            &ITEMS
        }

        fn read_node(&self, node: ElementRef<'_>, today: NaiveDate) -> Result<NodeOutcome> {
            if let Some(href) = html::first_href(node, &html::LINK) {
                return Ok(NodeOutcome::FollowLink {
                    href,
                    hint: ListingHint::default(),
                });
            }
            let artist = node.value().attr("data-artist").unwrap_or_default().to_string();
            let date = node.value().attr("data-date").unwrap_or_default();
            Ok(NodeOutcome::Parsed(EventFields {
                artist,
                showtime: crate::dates::formats::day_month_with_clock(date, "20:00", today)?,
                price: "10 €".into(),
            }))
        }

        fn read_detail(&self, doc: &Html, _hint: &ListingHint, today: NaiveDate) -> Result<EventFields> {
            let root = doc.root_element();
            Ok(EventFields {
                artist: html::require_text(root, &html::H1)?,
                showtime: crate::dates::formats::day_month_with_clock(
                    &html::require_text(root, &TIME)?,
                    "",
                    today,
                )?,
                price: String::new(),
            })
        }
    }

    const LISTING_URL: &str = "https://venue.example/events";

    fn info() -> SourceInfo {
        SourceInfo {
            id: "test",
            venue: "Test Venue",
            city: "Helsinki",
            url: LISTING_URL,
        }
    }

    fn ctx(fetcher: Arc<FakeFetcher>) -> ScrapeContext {
        ScrapeContext {
            http: fetcher,
            resolver: VenueResolver::new(Arc::new(InMemoryStore::new())),
            today: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            pacing: Pacing::none(),
            resolve_hosts: false,
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn bad_nodes_are_skipped_and_duplicates_collapse() {
        let listing = r#"<ul>
            <li data-artist="Circle" data-date="pe 22.3."></li>
            <li data-artist="Broken" data-date="whenever"></li>
            <li data-artist=" circle " data-date="pe 22.3."></li>
            <li data-artist="Pariisin Kevät" data-date="la 23.3."></li>
        </ul>"#;
        let fetcher = Arc::new(FakeFetcher::new(&[(LISTING_URL, listing)]));
        let events = scrape_source(&info(), &TestDialect, &ctx(fetcher)).await.unwrap();
        let artists: Vec<_> = events.iter().map(|e| e.artist.as_str()).collect();
        assert_eq!(artists, vec!["Circle", "Pariisin Kevät"]);
        assert!(events.iter().all(|e| e.price == "10€"));
        assert!(events.iter().all(|e| e.venue.id.is_some()));
    }

    #[tokio::test]
    async fn failed_listing_fetch_yields_nothing() {
        let fetcher = Arc::new(FakeFetcher::new(&[]));
        let events = scrape_source(&info(), &TestDialect, &ctx(fetcher)).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn unsafe_links_are_never_fetched() {
        let listing = r#"<ul>
            <li><a href="http://169.254.169.254/latest/">x</a></li>
            <li><a href="/event/2">y</a></li>
        </ul>"#;
        let detail = "<h1>Ok Artist</h1><time>pe 22.3.</time>";
        let fetcher = Arc::new(FakeFetcher::new(&[
            (LISTING_URL, listing),
            ("https://venue.example/event/2", detail),
        ]));
        let events = scrape_source(&info(), &TestDialect, &ctx(fetcher.clone()))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].artist, "Ok Artist");
        assert!(!events[0].has_showtime);
        let requested = fetcher.requested.lock().unwrap().clone();
        assert!(requested.iter().all(|u| !u.contains("169.254")));
    }

    #[tokio::test]
    async fn cancellation_stops_between_nodes() {
        let listing = r#"<ul><li data-artist="Circle" data-date="pe 22.3."></li></ul>"#;
        let fetcher = Arc::new(FakeFetcher::new(&[(LISTING_URL, listing)]));
        let ctx = ctx(fetcher);
        ctx.cancel.cancel();
        let events = scrape_source(&info(), &TestDialect, &ctx).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn resolver_failure_is_returned() {
        let listing = r#"<ul><li data-artist="Circle" data-date="pe 22.3."></li></ul>"#;
        let fetcher = Arc::new(FakeFetcher::new(&[(LISTING_URL, listing)]));
        let store = Arc::new(InMemoryStore::new());
        store.fail_venue_lookups(true);
        let mut ctx = ctx(fetcher);
        ctx.resolver = VenueResolver::new(store);
        assert!(scrape_source(&info(), &TestDialect, &ctx).await.is_err());
    }

    #[test]
    fn pacing_stays_within_bounds() {
        let pacing = Pacing::new(3000, 5000);
        for _ in 0..50 {
            let d = pacing.next_delay();
            assert!(d >= Duration::from_millis(3000) && d < Duration::from_millis(5000));
        }
        assert!(Pacing::none().next_delay().is_zero());
    }
}
