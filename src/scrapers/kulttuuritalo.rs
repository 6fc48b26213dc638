use super::base::{Dialect, EventFields, ListingHint, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::Result;
use crate::dates::formats;
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html};

static POSTS: Lazy<Css> = Lazy::new(|| Css::new("div.pp-content-posts"));
static ITEMS: Lazy<Css> = Lazy::new(|| Css::new("div.tapahtuma"));
static PAGE: Lazy<Css> = Lazy::new(|| Css::new("div.fl-page-content"));
static DATE: Lazy<Css> = Lazy::new(|| Css::new("h2"));
static CALLOUT: Lazy<Css> = Lazy::new(|| Css::new("div.fl-callout-text-wrap"));
static RICH_TEXT: Lazy<Css> = Lazy::new(|| Css::new("div.fl-rich-text"));

pub struct Kulttuuritalo;

fn price_from_rich_texts(blocks: &[String]) -> String {
    let Some(block) = blocks.iter().find(|b| b.contains('€')) else {
        return String::new();
    };
    if normalize::is_sold_out(block) {
        return normalize::SOLD_OUT.to_string();
    }
    normalize::euro_amounts(&block.replace("€€", "€")).join(" / ")
}

impl Dialect for Kulttuuritalo {
    fn container(&self) -> Option<&'static Css> {
        Some(&*POSTS)
    }

    fn event_nodes(&self) -> &'static Css {
        &ITEMS
    }

    fn read_node(&self, node: ElementRef<'_>, _today: NaiveDate) -> Result<NodeOutcome> {
        Ok(NodeOutcome::FollowLink {
            href: html::require_href(node, &html::LINK)?,
            hint: ListingHint::default(),
        })
    }

    fn read_detail(&self, doc: &Html, _hint: &ListingHint, today: NaiveDate) -> Result<EventFields> {
        let page = html::require(doc.root_element(), &PAGE)?;
        let artist = html::require_text(page, &html::H1)?;
        let date = html::require_text(page, &DATE)?;
        let doors = html::first_text(page, &CALLOUT).unwrap_or_default();
        let blocks = html::all_texts(page, &RICH_TEXT);
        Ok(EventFields {
            artist,
            showtime: formats::date_with_doors(&date, &doors, today)?,
            price: price_from_rich_texts(&blocks),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::base::{parse_detail, plan_listing};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn listing_needs_the_posts_wrapper() {
        let listing = r#"<div class="pp-content-posts">
            <div class="tapahtuma type-tapahtuma"><a href="https://kulttuuritalo.fi/tapahtumat/x/">x</a></div>
        </div>"#;
        let planned = plan_listing(&Kulttuuritalo, listing, today()).unwrap();
        assert_eq!(planned.len(), 1);
        assert!(matches!(planned[0], Ok(NodeOutcome::FollowLink { .. })));
    }

    #[test]
    fn detail_page_fields() {
        let detail = r#"<div class="fl-page-content">
            <h1>Apulanta</h1>
            <h2>12.10.2024</h2>
            <div class="fl-callout-text-wrap">Ovet: 19:00
              Konsertti alkaa 20:00</div>
            <div class="fl-module fl-module-rich-text fl-rich-text"><p>Esittely</p></div>
            <div class="fl-module fl-module-rich-text fl-rich-text"><p>Liput 49,50 € / 59,50 €</p></div>
        </div>"#;
        let fields = parse_detail(&Kulttuuritalo, detail, &ListingHint::default(), today()).unwrap();
        assert_eq!(fields.artist, "Apulanta");
        assert_eq!(fields.showtime.at.to_string(), "2024-10-12 19:00:00");
        assert_eq!(fields.price, "49,50€ / 59,50€");
    }
}
