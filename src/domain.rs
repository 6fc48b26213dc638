use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier minted by the backing store. Meaningless outside of it.
pub type EntityId = i64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct City {
    pub id: Option<EntityId>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Venue {
    pub id: Option<EntityId>,
    pub name: String,
    pub city_id: Option<EntityId>,
}

impl City {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl Venue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            city_id: None,
        }
    }
}

/// A concert listing, either a freshly scraped candidate or a persisted row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<EntityId>,
    pub artist: String,
    pub showtime: NaiveDateTime,
    pub has_showtime: bool,
    pub price: String,
    pub venue: Venue,
    pub city: City,
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl Event {
    /// Identity equality: artist, showtime and venue name. Price is ignored.
    pub fn is_same_event(&self, other: &Event) -> bool {
        self.showtime == other.showtime
            && same_text(&self.artist, &other.artist)
            && same_text(&self.venue.name, &other.venue.name)
    }

    pub fn date(&self) -> NaiveDate {
        self.showtime.date()
    }

    /// True once the showtime date is strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.date() < today
    }
}

/// Full equality: identity plus price.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_event(other) && same_text(&self.price, &other.price)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = if self.has_showtime {
            self.showtime.format("%d.%m.%Y %H:%M").to_string()
        } else {
            self.showtime.format("%d.%m.%Y").to_string()
        };
        write!(
            f,
            "{} @ {}, {} ({}) [{}]",
            self.artist, self.venue.name, self.city.name, when, self.price
        )
    }
}
