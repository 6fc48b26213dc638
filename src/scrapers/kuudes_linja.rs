use super::base::{Dialect, EventFields, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::Result;
use crate::dates::formats;
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::ElementRef;

static ARTICLES: Lazy<Css> = Lazy::new(|| Css::new("article.event"));
static TITLE: Lazy<Css> = Lazy::new(|| Css::new("div.title"));
static DATE: Lazy<Css> = Lazy::new(|| Css::new("div.pvm"));
static INFO: Lazy<Css> = Lazy::new(|| Css::new("div.info"));

const TITLE_PREFIX: &str = "KONSERTTI:";

pub struct KuudesLinja;

fn strip_title_prefix(title: &str) -> &str {
    match title.split_once(TITLE_PREFIX) {
        Some((_, rest)) => rest.trim(),
        None => title.trim(),
    }
}

/// The info block reads like "Liput 12 €. Ovet klo 21–04. K18.", so the
/// price is the first sentence of the first line mentioning euros.
fn price_from_info(info: ElementRef<'_>) -> String {
    let text = html::node_text(info);
    if normalize::is_sold_out(&text) {
        return normalize::clean_price(&[text]);
    }
    let lines = html::node_lines(info);
    let fragments: Vec<&str> = lines
        .iter()
        .find(|line| line.contains('€'))
        .and_then(|line| line.split(". ").next())
        .into_iter()
        .collect();
    normalize::clean_price(&fragments)
}

impl Dialect for KuudesLinja {
    fn event_nodes(&self) -> &'static Css {
        &ARTICLES
    }

    fn read_node(&self, node: ElementRef<'_>, today: NaiveDate) -> Result<NodeOutcome> {
        let title = html::require_text(node, &TITLE)?;
        let date = html::require_text(node, &DATE)?;
        let info = html::require(node, &INFO)?;
        Ok(NodeOutcome::Parsed(EventFields {
            artist: strip_title_prefix(&title).to_string(),
            showtime: formats::date_with_doors(&date, &html::node_text(info), today)?,
            price: price_from_info(info),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::base::plan_listing;

    #[test]
    fn reads_concert_articles() {
        let listing = r#"
          <article class="event">
            <div class="title">KONSERTTI: Radiopuhelimet</div>
            <div class="pvm">to 21.3.</div>
            <div class="info">Liput 15 €. Ovet klo 21–04. K18.
            Tiketistä</div>
          </article>
          <article class="event">
            <div class="title">Klubi-ilta</div>
            <div class="pvm">pe 22.3.</div>
            <div class="info">Ovet 22:00–
            Loppuunmyyty</div>
          </article>"#;
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let planned = plan_listing(&KuudesLinja, listing, today).unwrap();

        let Ok(NodeOutcome::Parsed(first)) = &planned[0] else {
            panic!("expected parsed node");
        };
        assert_eq!(first.artist, "Radiopuhelimet");
        assert_eq!(first.showtime.at.to_string(), "2024-03-21 21:00:00");
        assert_eq!(first.price, "15€");

        let Ok(NodeOutcome::Parsed(second)) = &planned[1] else {
            panic!("expected parsed node");
        };
        assert_eq!(second.artist, "Klubi-ilta");
        assert_eq!(second.showtime.at.to_string(), "2024-03-22 22:00:00");
        assert_eq!(second.price, normalize::SOLD_OUT);
    }
}
