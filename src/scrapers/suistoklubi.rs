use super::base::{Dialect, EventFields, ListingHint, NodeOutcome};
use super::html::{self, Css};
use crate::common::error::{Result, ScraperError};
use crate::dates::{find_day_month, formats};
use crate::normalize;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html};

static WIDGET_ITEMS: Lazy<Css> = Lazy::new(|| Css::new("li.tribe-events-list-widget-events"));
static SINGLE: Lazy<Css> = Lazy::new(|| Css::new("div.tribe-events-single"));
static STRONG: Lazy<Css> = Lazy::new(|| Css::new("strong"));

pub struct Suistoklubi;

/// "pe 22.3. Kauko Röyhkä (20:00-23:00)" -> "Kauko Röyhkä"
fn heading_artist(heading: &str) -> Result<String> {
    let dm = find_day_month(heading).ok_or_else(|| ScraperError::parse("date", heading.trim()))?;
    let rest = &heading[dm.end..];
    let artist = rest.split('(').next().unwrap_or_default().trim();
    Ok(artist.to_string())
}

/// Euro amounts from the bold lines. No amounts at all means free entry.
fn price_from_strongs(strongs: &[String]) -> String {
    if strongs.iter().any(|s| normalize::is_sold_out(s)) {
        return normalize::SOLD_OUT.to_string();
    }
    let amounts: Vec<String> = strongs
        .iter()
        .filter(|s| s.contains('€'))
        .flat_map(|s| normalize::euro_amounts(s))
        .collect();
    if amounts.is_empty() {
        return normalize::FREE_ENTRY.to_string();
    }
    amounts.join(" / ")
}

impl Dialect for Suistoklubi {
    fn event_nodes(&self) -> &'static Css {
        &WIDGET_ITEMS
    }

    fn read_node(&self, node: ElementRef<'_>, _today: NaiveDate) -> Result<NodeOutcome> {
        Ok(NodeOutcome::FollowLink {
            href: html::require_href(node, &html::LINK)?,
            hint: ListingHint::default(),
        })
    }

    fn read_detail(&self, doc: &Html, _hint: &ListingHint, today: NaiveDate) -> Result<EventFields> {
        let single = html::require(doc.root_element(), &SINGLE)?;
        let heading = normalize::clean(&html::require_text(single, &html::H1)?);
        let strongs = html::all_texts(single, &STRONG);
        Ok(EventFields {
            artist: heading_artist(&heading)?,
            showtime: formats::heading_with_range(&heading, today)?,
            price: price_from_strongs(&strongs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::base::parse_detail;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn detail_heading_carries_artist_and_time() {
        let detail = r#"<div class="tribe-events-single">
            <h1>pe 22.3. Kauko Röyhkä (20:00-23:00)</h1>
            <p><strong>Liput 20 € / 25 €</strong></p>
        </div>"#;
        let fields = parse_detail(&Suistoklubi, detail, &ListingHint::default(), today()).unwrap();
        assert_eq!(fields.artist, "Kauko Röyhkä");
        assert_eq!(fields.showtime.at.to_string(), "2024-03-22 20:00:00");
        assert_eq!(fields.price, "20€ / 25€");
    }

    #[test]
    fn no_amounts_means_free_entry() {
        let detail = r#"<div class="tribe-events-single">
            <h1>la 23.3. Jamit (18:00-22:00)</h1>
            <p><strong>Tervetuloa!</strong></p>
        </div>"#;
        let fields = parse_detail(&Suistoklubi, detail, &ListingHint::default(), today()).unwrap();
        assert_eq!(fields.price, normalize::FREE_ENTRY);
    }

    #[test]
    fn missing_wrapper_is_a_node_error() {
        let err = parse_detail(&Suistoklubi, "<h1>x</h1>", &ListingHint::default(), today()).unwrap_err();
        assert!(matches!(err, ScraperError::MissingNode(_)));
    }
}
