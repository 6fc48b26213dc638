//! Event, venue and city persistence.
//!
//! Both adapters implement the [`EventStore`] and [`VenueStore`] ports.
//! `InMemoryStore` backs tests and dry runs, `SqliteStore` is the real thing.

pub mod in_memory;
pub mod sqlite;

pub use crate::app::ports::{EventStore, VenueStore};
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Lookup key for city and venue names, shared by both adapters so they
/// agree on which spellings are the same place. SQLite's NOCASE only folds
/// ASCII, so folding happens here.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
