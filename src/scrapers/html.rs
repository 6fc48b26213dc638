//! Small query helpers over `scraper`. Missing nodes become
//! `ScraperError::MissingNode` so callers can `?` through a listing.
//!
//! Selectors are compiled once into `Lazy<Css>` statics next to the dialect
//! that uses them.

use crate::common::error::{Result, ScraperError};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

/// A compiled selector that keeps its source text for error reports.
pub struct Css {
    source: &'static str,
    selector: Selector,
}

impl Css {
    /// Panics on invalid CSS. Only built from literals inside `Lazy` statics.
    pub fn new(source: &'static str) -> Self {
        let selector = Selector::parse(source)
            .unwrap_or_else(|e| panic!("invalid selector {:?}: {:?}", source, e));
        Self { source, selector }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

pub static LINK: Lazy<Css> = Lazy::new(|| Css::new("a[href]"));
pub static H1: Lazy<Css> = Lazy::new(|| Css::new("h1"));
pub static H3: Lazy<Css> = Lazy::new(|| Css::new("h3"));

/// All descendant text, concatenated as it appears in the markup.
pub fn node_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Non-empty trimmed text lines under `el`.
pub fn node_lines(el: ElementRef<'_>) -> Vec<String> {
    el.text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn first<'a>(el: ElementRef<'a>, css: &Css) -> Option<ElementRef<'a>> {
    el.select(css.selector()).next()
}

pub fn require<'a>(el: ElementRef<'a>, css: &Css) -> Result<ElementRef<'a>> {
    first(el, css).ok_or_else(|| ScraperError::MissingNode(css.source().to_string()))
}

pub fn all<'a>(el: ElementRef<'a>, css: &Css) -> Vec<ElementRef<'a>> {
    el.select(css.selector()).collect()
}

pub fn require_text(el: ElementRef<'_>, css: &Css) -> Result<String> {
    Ok(node_text(require(el, css)?))
}

pub fn first_text(el: ElementRef<'_>, css: &Css) -> Option<String> {
    first(el, css).map(node_text)
}

pub fn all_texts(el: ElementRef<'_>, css: &Css) -> Vec<String> {
    all(el, css).into_iter().map(node_text).collect()
}

/// `href` of the first matching link. `el` itself counts when it matches.
pub fn first_href(el: ElementRef<'_>, css: &Css) -> Option<String> {
    if css.selector().matches(&el) {
        if let Some(href) = el.value().attr("href") {
            return Some(href.to_string());
        }
    }
    el.select(css.selector())
        .find_map(|a| a.value().attr("href"))
        .map(str::to_string)
}

pub fn require_href(el: ElementRef<'_>, css: &Css) -> Result<String> {
    first_href(el, css).ok_or_else(|| ScraperError::MissingNode(format!("{} href", css.source())))
}

pub fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}
