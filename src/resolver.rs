use crate::app::ports::VenueStore;
use crate::common::error::{Result, ScraperError};
use crate::domain::{City, EntityId, Venue};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Maps city and venue names to store ids, creating rows on first sight.
///
/// Nothing is cached here. Scrapers resolve once at the start of a run and
/// hold the result for that run only.
#[derive(Clone)]
pub struct VenueResolver {
    store: Arc<dyn VenueStore>,
}

impl VenueResolver {
    pub fn new(store: Arc<dyn VenueStore>) -> Self {
        Self { store }
    }

    pub async fn get_or_create_city_id(&self, name: &str) -> Result<EntityId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScraperError::parse("city_name", name));
        }
        self.store.get_or_create_city(name).await
    }

    pub async fn get_or_create_venue_id(&self, name: &str, city_id: EntityId) -> Result<EntityId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScraperError::parse("venue_name", name));
        }
        self.store.get_or_create_venue(name, city_id).await
    }

    /// City first, then the venue inside it.
    #[instrument(skip(self))]
    pub async fn resolve(&self, venue_name: &str, city_name: &str) -> Result<(Venue, City)> {
        let city_id = self.get_or_create_city_id(city_name).await?;
        let venue_id = self.get_or_create_venue_id(venue_name, city_id).await?;
        debug!(city_id, venue_id, "resolved venue");
        Ok((
            Venue {
                id: Some(venue_id),
                name: venue_name.trim().to_string(),
                city_id: Some(city_id),
            },
            City {
                id: Some(city_id),
                name: city_name.trim().to_string(),
            },
        ))
    }
}
