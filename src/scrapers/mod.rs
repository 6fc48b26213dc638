pub mod base;
pub mod html;

pub mod glivelab;
pub mod house_of_rock;
pub mod kulttuuritalo;
pub mod kuudes_linja;
pub mod sawohouse;
pub mod suistoklubi;
pub mod tapahtuma;
pub mod tavara_asema;
pub mod tiketti;

use crate::common::constants::*;
use crate::common::error::Result;
use crate::domain::Event;
use async_trait::async_trait;
use base::{SourceInfo, SourceScraper};
use std::sync::Arc;
use tracing::warn;

pub use base::{Pacing, ScrapeContext};

/// Core trait that every listing source implements
#[async_trait]
pub trait EventScraper: Send + Sync {
    fn source(&self) -> &SourceInfo;

    /// Best-effort scrape. Page and node failures are absorbed; `Err` means
    /// the venue/city could not be resolved.
    async fn scrape_events(&self, ctx: &ScrapeContext) -> Result<Vec<Event>>;
}

fn info(id: &'static str, venue: &'static str, city: &'static str, url: &'static str) -> SourceInfo {
    SourceInfo { id, venue, city, url }
}

pub fn create_scraper(source_id: &str) -> Option<Arc<dyn EventScraper>> {
    let scraper: Arc<dyn EventScraper> = match source_id {
        TAVASTIA_SOURCE => Arc::new(SourceScraper::new(
            info(TAVASTIA_SOURCE, TAVASTIA_VENUE_NAME, HELSINKI, TAVASTIA_URL),
            tiketti::Tiketti,
        )),
        SEMIFINAL_SOURCE => Arc::new(SourceScraper::new(
            info(SEMIFINAL_SOURCE, SEMIFINAL_VENUE_NAME, HELSINKI, SEMIFINAL_URL),
            tiketti::Tiketti,
        )),
        GLIVELAB_HELSINKI_SOURCE => Arc::new(SourceScraper::new(
            info(GLIVELAB_HELSINKI_SOURCE, GLIVELAB_HELSINKI_VENUE_NAME, HELSINKI, GLIVELAB_HELSINKI_URL),
            glivelab::GLiveLab,
        )),
        GLIVELAB_TAMPERE_SOURCE => Arc::new(SourceScraper::new(
            info(GLIVELAB_TAMPERE_SOURCE, GLIVELAB_TAMPERE_VENUE_NAME, TAMPERE, GLIVELAB_TAMPERE_URL),
            glivelab::GLiveLab,
        )),
        ON_THE_ROCKS_SOURCE => Arc::new(SourceScraper::new(
            info(ON_THE_ROCKS_SOURCE, ON_THE_ROCKS_VENUE_NAME, HELSINKI, ON_THE_ROCKS_URL),
            tapahtuma::Tapahtuma,
        )),
        LEPAKKOMIES_SOURCE => Arc::new(SourceScraper::new(
            info(LEPAKKOMIES_SOURCE, LEPAKKOMIES_VENUE_NAME, HELSINKI, LEPAKKOMIES_URL),
            tapahtuma::Tapahtuma,
        )),
        KUUDES_LINJA_SOURCE => Arc::new(SourceScraper::new(
            info(KUUDES_LINJA_SOURCE, KUUDES_LINJA_VENUE_NAME, HELSINKI, KUUDES_LINJA_URL),
            kuudes_linja::KuudesLinja,
        )),
        SUISTOKLUBI_SOURCE => Arc::new(SourceScraper::new(
            info(SUISTOKLUBI_SOURCE, SUISTOKLUBI_VENUE_NAME, HAMEENLINNA, SUISTOKLUBI_URL),
            suistoklubi::Suistoklubi,
        )),
        HOUSE_OF_ROCK_SOURCE => Arc::new(SourceScraper::new(
            info(HOUSE_OF_ROCK_SOURCE, HOUSE_OF_ROCK_VENUE_NAME, KOUVOLA, HOUSE_OF_ROCK_URL),
            house_of_rock::HouseOfRock,
        )),
        SAWOHOUSE_SOURCE => Arc::new(SourceScraper::new(
            info(SAWOHOUSE_SOURCE, SAWOHOUSE_VENUE_NAME, KUOPIO, SAWOHOUSE_URL),
            sawohouse::Sawohouse,
        )),
        TAVARA_ASEMA_SOURCE => Arc::new(SourceScraper::new(
            info(TAVARA_ASEMA_SOURCE, TAVARA_ASEMA_VENUE_NAME, TAMPERE, TAVARA_ASEMA_URL),
            tavara_asema::TavaraAsema,
        )),
        KULTTUURITALO_SOURCE => Arc::new(SourceScraper::new(
            info(KULTTUURITALO_SOURCE, KULTTUURITALO_VENUE_NAME, HELSINKI, KULTTUURITALO_URL),
            kulttuuritalo::Kulttuuritalo,
        )),
        _ => return None,
    };
    Some(scraper)
}

/// Scrapers in registration order, restricted to `filter` when it is non-empty.
pub fn registry(filter: &[String]) -> Vec<Arc<dyn EventScraper>> {
    if filter.is_empty() {
        return get_supported_sources()
            .into_iter()
            .filter_map(create_scraper)
            .collect();
    }
    let mut scrapers = Vec::new();
    for id in get_supported_sources() {
        if filter.iter().any(|f| f == id) {
            scrapers.extend(create_scraper(id));
        }
    }
    for unknown in filter
        .iter()
        .filter(|f| !get_supported_sources().contains(&f.as_str()))
    {
        warn!(source = %unknown, "Unknown source id ignored");
    }
    scrapers
}
