use super::base::{Dialect, EventFields, ListingHint, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::Result;
use crate::dates::formats;
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html};

static ARTICLES: Lazy<Css> = Lazy::new(|| Css::new("article.mec-event-article"));
static IMAGE_LINK: Lazy<Css> = Lazy::new(|| Css::new("div.mec-event-image a[href]"));
static DETAILS: Lazy<Css> = Lazy::new(|| Css::new("section.mec-container"));
static START_DATE: Lazy<Css> = Lazy::new(|| Css::new("span.mec-start-date-label"));
static TIME: Lazy<Css> = Lazy::new(|| Css::new("div.single-event-time"));
static COST: Lazy<Css> = Lazy::new(|| Css::new("dd.event-cost"));

/// Sawohouse Underground, a Modern Events Calendar site: Finnish month
/// names in the date label and a 12-hour clock.
pub struct Sawohouse;

impl Dialect for Sawohouse {
    fn event_nodes(&self) -> &'static Css {
        &ARTICLES
    }

    fn read_node(&self, node: ElementRef<'_>, _today: NaiveDate) -> Result<NodeOutcome> {
        let href = match html::first_href(node, &IMAGE_LINK) {
            Some(href) => href,
            None => html::require_href(node, &html::LINK)?,
        };
        Ok(NodeOutcome::FollowLink {
            href,
            hint: ListingHint::default(),
        })
    }

    fn read_detail(&self, doc: &Html, _hint: &ListingHint, today: NaiveDate) -> Result<EventFields> {
        let details = html::require(doc.root_element(), &DETAILS)?;
        let artist = html::require_text(details, &html::H1)?;
        let date = html::require_text(details, &START_DATE)?;
        let time = html::first_text(details, &TIME).unwrap_or_default();
        let cost = html::first_text(details, &COST).unwrap_or_default();
        Ok(EventFields {
            artist,
            showtime: formats::month_name_with_twelve_hour(&date, &time, today)?,
            price: normalize::clean_price(&[cost]),
        })
    }
}
