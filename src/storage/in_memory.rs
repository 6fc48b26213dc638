use crate::app::ports::{EventStore, VenueStore};
use crate::common::error::{Result, ScraperError};
use crate::domain::{EntityId, Event};
use crate::storage::name_key;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct Inner {
    events: BTreeMap<EntityId, Event>,
    cities: HashMap<String, EntityId>,
    venues: HashMap<(EntityId, String), EntityId>,
    next_id: EntityId,
}

impl Inner {
    fn mint_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store for development/testing, with switchable failures.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
    fail_venue_lookups: AtomicBool,
    insert_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `event` directly, bypassing failure injection and call counts.
    pub fn seed(&self, event: &Event) -> EntityId {
        let mut inner = self.lock();
        let id = inner.mint_id();
        let mut stored = event.clone();
        stored.id = Some(id);
        inner.events.insert(id, stored);
        id
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_venue_lookups(&self, fail: bool) {
        self.fail_venue_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    fn check_venue_lookups(&self) -> Result<()> {
        if self.fail_venue_lookups.load(Ordering::SeqCst) {
            return Err(ScraperError::store("venue store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn list_all_events(&self) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self.lock().events.values().cloned().collect();
        events.sort_by_key(|e| e.showtime);
        Ok(events)
    }

    async fn insert_event(&self, event: &Event) -> Result<EntityId> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(ScraperError::store("insert rejected"));
        }
        let id = self.seed(event);
        debug!(id, artist = %event.artist, "inserted event");
        Ok(id)
    }

    async fn update_price(&self, event_id: EntityId, price: &str) -> Result<bool> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ScraperError::store("update rejected"));
        }
        let mut inner = self.lock();
        match inner.events.get_mut(&event_id) {
            Some(event) => {
                event.price = price.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_events_before(&self, date: NaiveDate) -> Result<u64> {
        let mut inner = self.lock();
        let before = inner.events.len();
        inner.events.retain(|_, e| e.date() >= date);
        Ok((before - inner.events.len()) as u64)
    }
}

#[async_trait]
impl VenueStore for InMemoryStore {
    async fn get_or_create_city(&self, name: &str) -> Result<EntityId> {
        self.check_venue_lookups()?;
        let key = name_key(name);
        let mut inner = self.lock();
        if let Some(id) = inner.cities.get(&key) {
            return Ok(*id);
        }
        let id = inner.mint_id();
        inner.cities.insert(key, id);
        Ok(id)
    }

    async fn get_or_create_venue(&self, name: &str, city_id: EntityId) -> Result<EntityId> {
        self.check_venue_lookups()?;
        let key = (city_id, name_key(name));
        let mut inner = self.lock();
        if let Some(id) = inner.venues.get(&key) {
            return Ok(*id);
        }
        let id = inner.mint_id();
        inner.venues.insert(key, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{City, Venue};

    fn event_on(day: u32, price: &str) -> Event {
        Event {
            id: None,
            artist: "Circle".into(),
            showtime: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            has_showtime: true,
            price: price.into(),
            venue: Venue::named("Tavastiaklubi"),
            city: City::named("Helsinki"),
        }
    }

    #[tokio::test]
    async fn insert_then_update_price() {
        let store = InMemoryStore::new();
        let id = store.insert_event(&event_on(20, "10€")).await.unwrap();
        assert!(store.update_price(id, "15€").await.unwrap());
        let events = store.list_all_events().await.unwrap();
        assert_eq!(events[0].price, "15€");
        assert_eq!(events[0].id, Some(id));
    }

    #[tokio::test]
    async fn update_of_missing_row_reports_false() {
        let store = InMemoryStore::new();
        assert!(!store.update_price(42, "15€").await.unwrap());
    }

    #[tokio::test]
    async fn delete_before_keeps_the_boundary_day() {
        let store = InMemoryStore::new();
        store.seed(&event_on(14, ""));
        store.seed(&event_on(15, ""));
        let removed = store
            .delete_events_before(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_store_errors() {
        let store = InMemoryStore::new();
        store.fail_inserts(true);
        assert!(store.insert_event(&event_on(20, "")).await.is_err());
        assert_eq!(store.insert_calls(), 1);
        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn city_lookup_is_case_insensitive() {
        let store = InMemoryStore::new();
        let a = store.get_or_create_city("Helsinki").await.unwrap();
        let b = store.get_or_create_city("helsinki ").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn venues_are_scoped_to_their_city() {
        let store = InMemoryStore::new();
        let helsinki = store.get_or_create_city("Helsinki").await.unwrap();
        let tampere = store.get_or_create_city("Tampere").await.unwrap();
        let hki = store.get_or_create_venue("G Livelab", helsinki).await.unwrap();
        let tre = store.get_or_create_venue("G Livelab", tampere).await.unwrap();
        assert_ne!(hki, tre);
        let again = store.get_or_create_venue("g livelab ", helsinki).await.unwrap();
        assert_eq!(again, hki);
    }
}
