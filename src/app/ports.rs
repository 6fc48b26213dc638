use crate::common::error::Result;
use crate::domain::{EntityId, Event};
use async_trait::async_trait;
use chrono::NaiveDate;

// Fetch-side port
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Body of a successful GET. Non-2xx statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String>;
}

// Store-side ports
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list_all_events(&self) -> Result<Vec<Event>>;
    /// Persists a new event and returns its store id.
    async fn insert_event(&self, event: &Event) -> Result<EntityId>;
    /// `Ok(false)` when no row with that id exists.
    async fn update_price(&self, event_id: EntityId, price: &str) -> Result<bool>;
    /// Deletes events dated strictly before `date`, returning how many went.
    async fn delete_events_before(&self, date: NaiveDate) -> Result<u64>;
}

/// Idempotent get-or-create for cities and venues. Uniqueness is the
/// store's job; concurrent callers with the same name get the same id.
#[async_trait]
pub trait VenueStore: Send + Sync {
    async fn get_or_create_city(&self, name: &str) -> Result<EntityId>;
    async fn get_or_create_venue(&self, name: &str, city_id: EntityId) -> Result<EntityId>;
}
