//! Tiketti-powered listings (Tavastia, Semifinal). Everything is on the
//! listing page: `a.tiketti-list-item` cards inside `div.tiketti-list`.

use super::base::{Dialect, EventFields, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::Result;
use crate::dates::formats;
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::ElementRef;

static LIST: Lazy<Css> = Lazy::new(|| Css::new("div.tiketti-list"));
static ITEMS: Lazy<Css> = Lazy::new(|| Css::new("a.tiketti-list-item"));
static DATE: Lazy<Css> = Lazy::new(|| Css::new("div.date"));
static TIMETABLE: Lazy<Css> = Lazy::new(|| Css::new("div.timetable"));
static TICKETS: Lazy<Css> = Lazy::new(|| Css::new("div.tickets"));

pub struct Tiketti;

impl Dialect for Tiketti {
    fn container(&self) -> Option<&'static Css> {
        Some(&*LIST)
    }

    fn event_nodes(&self) -> &'static Css {
        &ITEMS
    }

    fn read_node(&self, node: ElementRef<'_>, today: NaiveDate) -> Result<NodeOutcome> {
        let artist = html::require_text(node, &html::H3)?;
        let date = html::require_text(node, &DATE)?;
        let time = html::first_text(node, &TIMETABLE).unwrap_or_default();
        let tickets = html::first_text(node, &TICKETS).unwrap_or_default();

        // "25 € / 30 €" lists presale and door prices in one node
        let fragments: Vec<&str> = tickets.split('/').collect();
        Ok(NodeOutcome::Parsed(EventFields {
            artist,
            showtime: formats::day_month_with_clock(&date, &time, today)?,
            price: normalize::clean_price(&fragments),
        }))
    }
}
