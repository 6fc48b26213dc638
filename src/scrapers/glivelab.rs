//! G Livelab (Helsinki and Tampere). The listing only links to detail pages.

use super::base::{Dialect, EventFields, ListingHint, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::Result;
use crate::dates::formats;
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html};

static TAB: Lazy<Css> = Lazy::new(|| Css::new("div.segmented-control-tab"));
static ITEMS: Lazy<Css> = Lazy::new(|| Css::new("li.item"));
static PAGE: Lazy<Css> = Lazy::new(|| Css::new("article.page"));
static DATETIME: Lazy<Css> = Lazy::new(|| Css::new("div.datetime"));
static PRICES: Lazy<Css> = Lazy::new(|| Css::new("span.prices"));

pub struct GLiveLab;

impl Dialect for GLiveLab {
    fn container(&self) -> Option<&'static Css> {
        Some(&*TAB)
    }

    fn event_nodes(&self) -> &'static Css {
        &ITEMS
    }

    fn read_node(&self, node: ElementRef<'_>, _today: NaiveDate) -> Result<NodeOutcome> {
        let markup = node.html();
        if markup.contains("stickyevent") || markup.contains("advert") {
            return Ok(NodeOutcome::Skip("sticky or advert item"));
        }
        Ok(NodeOutcome::FollowLink {
            href: html::require_href(node, &html::LINK)?,
            hint: ListingHint::default(),
        })
    }

    fn read_detail(&self, doc: &Html, _hint: &ListingHint, today: NaiveDate) -> Result<EventFields> {
        let page = html::require(doc.root_element(), &PAGE)?;
        let heading = html::require_text(page, &html::H1)?;
        // Support acts follow the headliner after a comma
        let artist = heading.split(',').next().unwrap_or_default().to_string();
        let datetime = html::require_text(page, &DATETIME)?;
        let prices = html::all_texts(page, &PRICES);
        Ok(EventFields {
            artist,
            showtime: formats::datetime_block(&datetime, today)?,
            price: normalize::clean_price(&prices),
        })
    }
}
