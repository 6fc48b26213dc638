//! Date and time primitives shared by every listing dialect.
//!
//! Listings rarely print a year, so every parsed date goes through
//! [`infer_year`]: a month/day already behind `today` belongs to next year.

pub mod formats;

use crate::common::error::{Result, ScraperError};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.?(?:\d{4})?").expect("valid day-month regex")
});
static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[:.](\d{2})\b").expect("valid clock regex"));
static DOORS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:ovet|klo|alkaa)\b:?\s*(?:klo\s*)?(\d{1,2})(?:[:.](\d{2}))?")
        .expect("valid door time regex")
});
static TWELVE_HOUR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\b").expect("valid 12-hour regex")
});

const WEEKDAY_ABBREVIATIONS: &[&str] = &["ma", "ti", "ke", "to", "pe", "la", "su"];
const WEEKDAY_NAMES: &[&str] = &[
    "maanantai",
    "tiistai",
    "keskiviikko",
    "torstai",
    "perjantai",
    "lauantai",
    "sunnuntai",
];

/// Month stems, as in "maaliskuuta", "maalis" or "maaliskuu".
const MONTH_STEMS: &[(&str, u32)] = &[
    ("tammi", 1),
    ("helmi", 2),
    ("maalis", 3),
    ("huhti", 4),
    ("touko", 5),
    ("kesä", 6),
    ("heinä", 7),
    ("elo", 8),
    ("syys", 9),
    ("loka", 10),
    ("marras", 11),
    ("joulu", 12),
];

/// A parsed showtime. `has_time` is false when the listing only gave a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Showtime {
    pub at: NaiveDateTime,
    pub has_time: bool,
}

impl Showtime {
    pub fn new(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self {
            at: date.and_time(time.unwrap_or(NaiveTime::MIN)),
            has_time: time.is_some(),
        }
    }
}

/// Current year, unless month/day is already behind `today`.
pub fn infer_year(month: u32, day: u32, today: NaiveDate) -> i32 {
    if month < today.month() || (month == today.month() && day < today.day()) {
        today.year() + 1
    } else {
        today.year()
    }
}

pub fn date_for(day: u32, month: u32, today: NaiveDate) -> Result<NaiveDate> {
    let year = infer_year(month, day, today);
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ScraperError::parse("date", format!("{}.{}.{}", day, month, year)))
}

pub fn month_from_finnish(word: &str) -> Result<u32> {
    let normalized = word.trim().trim_end_matches('.').to_lowercase();
    MONTH_STEMS
        .iter()
        .find(|(stem, _)| normalized.starts_with(stem))
        .map(|(_, month)| *month)
        .ok_or_else(|| ScraperError::UnknownMonth(word.trim().to_string()))
}

/// True for "pe", "La.", "perjantai" and friends. Month words like
/// "maalis" are not weekdays even though they share a prefix.
pub fn is_weekday_prefix(token: &str) -> bool {
    let t = token
        .trim()
        .trim_end_matches(|c: char| c == '.' || c == ',')
        .to_lowercase();
    WEEKDAY_ABBREVIATIONS.contains(&t.as_str()) || WEEKDAY_NAMES.contains(&t.as_str())
}

/// Drops a leading weekday token, if there is one.
pub fn strip_weekday(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) if is_weekday_prefix(first) => rest.trim_start(),
        _ => trimmed,
    }
}

/// A `dd.mm` match along with the byte offset right after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayMonth {
    pub day: u32,
    pub month: u32,
    pub end: usize,
}

/// First plausible `d.m.` / `dd.mm.yyyy` date in `text`. Any printed year is ignored.
pub fn find_day_month(text: &str) -> Option<DayMonth> {
    for caps in DAY_MONTH_RE.captures_iter(text) {
        let (Ok(day), Ok(month)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
            continue;
        };
        if (1..=31).contains(&day) && (1..=12).contains(&month) {
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            return Some(DayMonth { day, month, end });
        }
    }
    None
}

/// First `HH:MM` or `HH.MM` clock time in `text`.
pub fn find_clock(text: &str) -> Option<NaiveTime> {
    for caps in CLOCK_RE.captures_iter(text) {
        let (Ok(h), Ok(m)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
            continue;
        };
        if let Some(time) = NaiveTime::from_hms_opt(h, m, 0) {
            return Some(time);
        }
    }
    None
}

/// Door or start time written as "Ovet klo 21", "Ovet 19:00–" or "klo 20.30".
pub fn find_doors(text: &str) -> Option<NaiveTime> {
    for caps in DOORS_RE.captures_iter(text) {
        let Ok(h) = caps[1].parse::<u32>() else {
            continue;
        };
        let m = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0);
        if let Some(time) = NaiveTime::from_hms_opt(h, m, 0) {
            return Some(time);
        }
    }
    None
}

/// "8:00 pm", "11 am". 12 am is midnight and 12 pm is noon.
pub fn find_twelve_hour(text: &str) -> Option<NaiveTime> {
    for caps in TWELVE_HOUR_RE.captures_iter(text) {
        let Ok(h) = caps[1].parse::<u32>() else {
            continue;
        };
        if !(1..=12).contains(&h) {
            continue;
        }
        let m = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0);
        let pm = caps[3].eq_ignore_ascii_case("p");
        let hour = h % 12 + if pm { 12 } else { 0 };
        if let Some(time) = NaiveTime::from_hms_opt(hour, m, 0) {
            return Some(time);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn year_rolls_over_for_past_dates() {
        assert_eq!(infer_year(2, 1, today()), 2025);
        assert_eq!(infer_year(3, 14, today()), 2025);
    }

    #[test]
    fn year_stays_for_upcoming_dates() {
        assert_eq!(infer_year(4, 1, today()), 2024);
        assert_eq!(infer_year(3, 16, today()), 2024);
    }

    #[test]
    fn today_counts_as_not_yet_passed() {
        assert_eq!(infer_year(3, 15, today()), 2024);
    }

    #[test]
    fn impossible_dates_are_parse_errors() {
        let err = date_for(30, 2, today()).unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn month_names_resolve_from_stems() {
        assert_eq!(month_from_finnish("maalis").unwrap(), 3);
        assert_eq!(month_from_finnish("Maaliskuuta").unwrap(), 3);
        assert_eq!(month_from_finnish("kesäkuu").unwrap(), 6);
        assert_eq!(month_from_finnish(" joulu. ").unwrap(), 12);
    }

    #[test]
    fn unknown_month_is_its_own_error() {
        let err = month_from_finnish("smarch").unwrap_err();
        assert!(matches!(err, ScraperError::UnknownMonth(ref m) if m == "smarch"));
    }

    #[test]
    fn weekday_detection() {
        for token in ["ma", "ti", "Ke", "to.", "PE", "la", "su,", "perjantai"] {
            assert!(is_weekday_prefix(token), "{}", token);
        }
        assert!(!is_weekday_prefix("maalis"));
        assert!(!is_weekday_prefix("14.3."));
        assert_eq!(strip_weekday("pe 14.3."), "14.3.");
        assert_eq!(strip_weekday("14.3."), "14.3.");
    }

    #[test]
    fn finds_day_and_month() {
        let dm = find_day_month("pe 14.3.").unwrap();
        assert_eq!((dm.day, dm.month), (14, 3));
        let dm = find_day_month("14.03.2025").unwrap();
        assert_eq!((dm.day, dm.month), (14, 3));
        assert!(find_day_month("no date here").is_none());
    }

    #[test]
    fn day_month_skips_implausible_matches() {
        let dm = find_day_month("20.00 / 14.3.").unwrap();
        assert_eq!((dm.day, dm.month), (14, 3));
    }

    #[test]
    fn finds_clock_with_either_separator() {
        assert_eq!(find_clock("20.00"), NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(find_clock("klo 19:30"), NaiveTime::from_hms_opt(19, 30, 0));
        assert!(find_clock("25:00").is_none());
    }

    #[test]
    fn finds_door_times() {
        assert_eq!(find_doors("Ovet klo 21–"), NaiveTime::from_hms_opt(21, 0, 0));
        assert_eq!(find_doors("Ovet 19:00–23:00"), NaiveTime::from_hms_opt(19, 0, 0));
        assert_eq!(find_doors("Ovet: 18.30"), NaiveTime::from_hms_opt(18, 30, 0));
        assert!(find_doors("Liput 20€").is_none());
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(find_twelve_hour("8:00 pm"), NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(find_twelve_hour("12:30 am"), NaiveTime::from_hms_opt(0, 30, 0));
        assert_eq!(find_twelve_hour("12 PM"), NaiveTime::from_hms_opt(12, 0, 0));
        assert!(find_twelve_hour("20:00").is_none());
    }

    #[test]
    fn showtime_without_time_is_midnight_and_flagged() {
        let s = Showtime::new(today(), None);
        assert!(!s.has_time);
        assert_eq!(s.at.time(), NaiveTime::MIN);
    }
}
