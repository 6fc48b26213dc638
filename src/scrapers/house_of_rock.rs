use super::base::{Dialect, EventFields, ListingHint, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::{Result, ScraperError};
use crate::dates::formats;
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html};

static CARDS: Lazy<Css> = Lazy::new(|| Css::new("div.em-item-info"));
static PRIMARY: Lazy<Css> = Lazy::new(|| Css::new("div.zak-primary"));
static DATE: Lazy<Css> = Lazy::new(|| Css::new("div.em-event-date"));
static TIME: Lazy<Css> = Lazy::new(|| Css::new("div.em-event-time"));
static PARAGRAPHS: Lazy<Css> = Lazy::new(|| Css::new("section.em-event-content p"));

pub struct HouseOfRock;

/// Amounts from the description paragraphs, up to the first blank one.
fn price_from_paragraphs(paragraphs: &[String]) -> String {
    let mut amounts = Vec::new();
    for p in paragraphs {
        if p.trim().is_empty() {
            break;
        }
        if normalize::is_sold_out(p) {
            return normalize::SOLD_OUT.to_string();
        }
        amounts.extend(normalize::euro_amounts(p));
    }
    amounts.join(" / ")
}

impl Dialect for HouseOfRock {
    fn event_nodes(&self) -> &'static Css {
        &CARDS
    }

    // The artist only appears on the listing card
    fn read_node(&self, node: ElementRef<'_>, _today: NaiveDate) -> Result<NodeOutcome> {
        let artist = html::require_text(node, &html::H3)?;
        Ok(NodeOutcome::FollowLink {
            href: html::require_href(node, &html::LINK)?,
            hint: ListingHint {
                artist: Some(artist),
            },
        })
    }

    fn read_detail(&self, doc: &Html, hint: &ListingHint, today: NaiveDate) -> Result<EventFields> {
        let primary = html::require(doc.root_element(), &PRIMARY)?;
        let date = html::require_text(primary, &DATE)?;
        let time = html::first_text(primary, &TIME).unwrap_or_default();
        let paragraphs = html::all_texts(primary, &PARAGRAPHS);
        let artist = hint
            .artist
            .clone()
            .ok_or_else(|| ScraperError::MissingNode("h3".into()))?;
        Ok(EventFields {
            artist,
            showtime: formats::day_month_with_clock(&date, &time, today)?,
            price: price_from_paragraphs(&paragraphs),
        })
    }
}
