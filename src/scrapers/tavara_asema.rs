use super::base::{Dialect, EventFields, ListingHint, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::{Result, ScraperError};
use crate::dates::formats;
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html};

static FEED_ITEMS: Lazy<Css> = Lazy::new(|| Css::new("div.event-feed-item__content"));
static HEADER: Lazy<Css> = Lazy::new(|| Css::new("div.event-header__content"));
static ARTISTS: Lazy<Css> = Lazy::new(|| Css::new("h2.event-artist"));
static DATE: Lazy<Css> = Lazy::new(|| Css::new("span.event-date"));
static INFO: Lazy<Css> = Lazy::new(|| Css::new("ul.event-info"));
static INFO_ITEMS: Lazy<Css> = Lazy::new(|| Css::new("li"));

pub struct TavaraAsema;

/// Headliners, without the trailing `<span>` genre tags.
fn artists(header: ElementRef<'_>) -> Result<String> {
    let names: Vec<String> = html::all(header, &ARTISTS)
        .into_iter()
        .filter_map(|h2| h2.text().map(str::trim).find(|t| !t.is_empty()))
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(ScraperError::MissingNode(ARTISTS.source().into()));
    }
    Ok(names.join(", "))
}

fn price_from_items(items: &[String]) -> String {
    if items.iter().any(|i| normalize::is_sold_out(i)) {
        return normalize::SOLD_OUT.to_string();
    }
    if items.iter().any(|i| i.contains("Vapaa") || normalize::is_free_entry(i)) {
        return normalize::FREE_ENTRY.to_string();
    }
    items
        .iter()
        .filter(|i| i.contains('€'))
        .flat_map(|i| normalize::euro_amounts(i))
        .collect::<Vec<_>>()
        .join(" / ")
}

impl Dialect for TavaraAsema {
    fn event_nodes(&self) -> &'static Css {
        &FEED_ITEMS
    }

    fn read_node(&self, node: ElementRef<'_>, _today: NaiveDate) -> Result<NodeOutcome> {
        Ok(NodeOutcome::FollowLink {
            href: html::require_href(node, &html::LINK)?,
            hint: ListingHint::default(),
        })
    }

    fn read_detail(&self, doc: &Html, _hint: &ListingHint, today: NaiveDate) -> Result<EventFields> {
        let header = html::require(doc.root_element(), &HEADER)?;
        let date = html::require_text(header, &DATE)?;
        let info = html::require(header, &INFO)?;
        let items = html::all_texts(info, &INFO_ITEMS);
        Ok(EventFields {
            artist: artists(header)?,
            showtime: formats::date_with_doors(&date, &html::node_text(info), today)?,
            price: price_from_items(&items),
        })
    }
}
