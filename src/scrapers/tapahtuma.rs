//! Single-page "tapahtuma" listings (On The Rocks, Lepakkomies).

use super::base::{Dialect, EventFields, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::Result;
use crate::dates::formats;
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::ElementRef;

static ITEMS: Lazy<Css> = Lazy::new(|| Css::new("div.tapahtuma-inner"));
static DATE: Lazy<Css> = Lazy::new(|| Css::new("span.date-info"));
static TICKET_INFO: Lazy<Css> = Lazy::new(|| Css::new("span.lippujen-lisatieto"));

pub struct Tapahtuma;

impl Dialect for Tapahtuma {
    fn event_nodes(&self) -> &'static Css {
        &ITEMS
    }

    fn read_node(&self, node: ElementRef<'_>, today: NaiveDate) -> Result<NodeOutcome> {
        let artist = html::require_text(node, &html::H1)?;
        let date = html::require_text(node, &DATE)?;
        let price = html::first_text(node, &TICKET_INFO).unwrap_or_default();
        Ok(NodeOutcome::Parsed(EventFields {
            artist,
            showtime: formats::date_with_klo(&date, today)?,
            price: normalize::clean_price(&[price]),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::base::plan_listing;

    #[test]
    fn reads_single_page_cards() {
        let listing = r#"
          <div class="tapahtuma-inner">
            <h1>Children of Bodom tribute</h1>
            <span class="date-info">la 6.4.2024 klo 21:00</span>
            <span class="lippujen-lisatieto">Liput 15 € + kulut</span>
          </div>
          <div class="tapahtuma-inner">
            <h1>Klubi</h1>
            <span class="date-info">su 7.4.2024</span>
          </div>"#;
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let planned = plan_listing(&Tapahtuma, listing, today).unwrap();

        let Ok(NodeOutcome::Parsed(first)) = &planned[0] else {
            panic!("expected parsed node");
        };
        assert_eq!(first.showtime.at.to_string(), "2024-04-06 21:00:00");
        assert_eq!(first.price, "15€");

        let Ok(NodeOutcome::Parsed(second)) = &planned[1] else {
            panic!("expected parsed node");
        };
        assert!(!second.showtime.has_time);
        assert_eq!(second.price, "");
    }
}
