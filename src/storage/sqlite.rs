use crate::app::ports::{EventStore, VenueStore};
use crate::common::error::{Result, ScraperError};
use crate::domain::{City, EntityId, Event, Venue};
use crate::storage::name_key;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Stored and served as local time without offset.
pub const EVENT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const SCHEMA: &str = r#"
    PRAGMA foreign_keys=ON;
    CREATE TABLE IF NOT EXISTS cities (
        city_id    INTEGER PRIMARY KEY AUTOINCREMENT,
        city_name  TEXT NOT NULL,
        city_key   TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS venues (
        venue_id    INTEGER PRIMARY KEY AUTOINCREMENT,
        venue_name  TEXT NOT NULL,
        venue_key   TEXT NOT NULL,
        city_id     INTEGER NOT NULL REFERENCES cities(city_id),
        UNIQUE (venue_key, city_id)
    );
    CREATE TABLE IF NOT EXISTS events (
        event_id            INTEGER PRIMARY KEY AUTOINCREMENT,
        venue_id            INTEGER NOT NULL REFERENCES venues(venue_id),
        event_artist        TEXT NOT NULL,
        event_date          TEXT NOT NULL,
        event_price         TEXT NOT NULL DEFAULT '',
        event_has_showtime  INTEGER NOT NULL DEFAULT 1,
        event_added         TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_events_date ON events(event_date);
    CREATE VIEW IF NOT EXISTS view_events AS
        SELECT e.event_id, e.event_artist, e.event_date, e.event_price, e.event_has_showtime,
               v.venue_id, v.venue_name, c.city_id, c.city_name
        FROM events e
        JOIN venues v ON v.venue_id = e.venue_id
        JOIN cities c ON c.city_id = v.city_id;
"#;

/// SQLite-backed store. Calls run on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<(Event, String)> {
    let raw_date: String = row.get(2)?;
    let event = Event {
        id: Some(row.get(0)?),
        artist: row.get(1)?,
        showtime: NaiveDateTime::MIN,
        price: row.get(3)?,
        has_showtime: row.get::<_, i64>(4)? != 0,
        venue: Venue {
            id: Some(row.get(5)?),
            name: row.get(6)?,
            city_id: Some(row.get(7)?),
        },
        city: City {
            id: Some(row.get(7)?),
            name: row.get(8)?,
        },
    };
    Ok((event, raw_date))
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let journal: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), journal = %journal, "opened event database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&guard)
        })
        .await
        .map_err(|e| ScraperError::store(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn list_all_events(&self) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT event_id, event_artist, event_date, event_price, event_has_showtime,
                        venue_id, venue_name, city_id, city_name
                 FROM view_events ORDER BY event_date, event_id",
            )?;
            let rows = stmt.query_map([], event_from_row)?;
            let mut events = Vec::new();
            for row in rows {
                let (mut event, raw_date) = row?;
                event.showtime = NaiveDateTime::parse_from_str(&raw_date, EVENT_DATE_FORMAT)
                    .map_err(|_| ScraperError::parse("event_date", raw_date.clone()))?;
                events.push(event);
            }
            Ok(events)
        })
        .await
    }

    async fn insert_event(&self, event: &Event) -> Result<EntityId> {
        let venue_id = event
            .venue
            .id
            .ok_or_else(|| ScraperError::store(format!("venue '{}' has no id", event.venue.name)))?;
        let artist = event.artist.clone();
        let date = event.showtime.format(EVENT_DATE_FORMAT).to_string();
        let price = event.price.clone();
        let has_showtime = event.has_showtime;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO events (venue_id, event_artist, event_date, event_price, event_has_showtime)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![venue_id, artist, date, price, has_showtime as i64],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, artist = %artist, "inserted event");
            Ok(id)
        })
        .await
    }

    async fn update_price(&self, event_id: EntityId, price: &str) -> Result<bool> {
        let price = price.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE events SET event_price = ?1 WHERE event_id = ?2",
                params![price, event_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_events_before(&self, date: NaiveDate) -> Result<u64> {
        let cutoff = date.format("%Y-%m-%d").to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM events WHERE substr(event_date, 1, 10) < ?1",
                params![cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
    }
}

#[async_trait]
impl VenueStore for SqliteStore {
    async fn get_or_create_city(&self, name: &str) -> Result<EntityId> {
        let name = name.trim().to_string();
        let key = name_key(&name);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO cities (city_name, city_key) VALUES (?1, ?2)
                 ON CONFLICT(city_key) DO NOTHING",
                params![name, key],
            )?;
            let id = conn.query_row(
                "SELECT city_id FROM cities WHERE city_key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
    }

    async fn get_or_create_venue(&self, name: &str, city_id: EntityId) -> Result<EntityId> {
        let name = name.trim().to_string();
        let key = name_key(&name);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO venues (venue_name, venue_key, city_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(venue_key, city_id) DO NOTHING",
                params![name, key, city_id],
            )?;
            let id = conn.query_row(
                "SELECT venue_id FROM venues WHERE venue_key = ?1 AND city_id = ?2",
                params![key, city_id],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
    }
}
