use super::{
    date_for, find_clock, find_day_month, find_doors, find_twelve_hour, month_from_finnish,
    strip_weekday, Showtime,
};
use crate::common::error::{Result, ScraperError};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static RANGE_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*(\d{1,2})[:.](\d{2})").expect("valid time range regex"));

fn require_day_month(text: &str) -> Result<super::DayMonth> {
    find_day_month(text).ok_or_else(|| ScraperError::parse("date", text.trim()))
}

/// Date and time in separate nodes: "pe 14.3." + "20.00", or "14.03.2025" +
/// "Ovet: 19:00". An empty time node means the time is unknown.
pub fn day_month_with_clock(date_text: &str, time_text: &str, today: NaiveDate) -> Result<Showtime> {
    let dm = require_day_month(date_text)?;
    let date = date_for(dm.day, dm.month, today)?;
    let time = find_clock(time_text);
    if time.is_none() && !time_text.trim().is_empty() {
        return Err(ScraperError::parse("time", time_text.trim()));
    }
    Ok(Showtime::new(date, time))
}

/// One block holding the date and then the time, e.g. "14.3.\nla\n20:00".
pub fn datetime_block(text: &str, today: NaiveDate) -> Result<Showtime> {
    let dm = require_day_month(text)?;
    let date = date_for(dm.day, dm.month, today)?;
    let time = find_clock(&text[dm.end..]);
    Ok(Showtime::new(date, time))
}

/// "pe 14.3.2025 klo 20:00". The time must follow "klo" after the date.
pub fn date_with_klo(text: &str, today: NaiveDate) -> Result<Showtime> {
    let dm = require_day_month(text)?;
    let date = date_for(dm.day, dm.month, today)?;
    Ok(Showtime::new(date, find_doors(&text[dm.end..])))
}

/// Date node plus a free-text info block with "Ovet klo 21–" style door times.
pub fn date_with_doors(date_text: &str, info_text: &str, today: NaiveDate) -> Result<Showtime> {
    let dm = require_day_month(date_text)?;
    let date = date_for(dm.day, dm.month, today)?;
    Ok(Showtime::new(date, find_doors(info_text)))
}

/// Heading of the form "pe 14.3. Artist (20:00-23:00)". The start of the
/// last parenthesized range is the showtime.
pub fn heading_with_range(text: &str, today: NaiveDate) -> Result<Showtime> {
    let dm = require_day_month(text)?;
    let date = date_for(dm.day, dm.month, today)?;
    let time = RANGE_START_RE
        .captures_iter(text)
        .last()
        .and_then(|caps| {
            let h = caps[1].parse::<u32>().ok()?;
            let m = caps[2].parse::<u32>().ok()?;
            chrono::NaiveTime::from_hms_opt(h, m, 0)
        });
    Ok(Showtime::new(date, time))
}

/// "maalis 14" + "8:00 pm".
pub fn month_name_with_twelve_hour(
    date_text: &str,
    time_text: &str,
    today: NaiveDate,
) -> Result<Showtime> {
    let mut tokens = strip_weekday(date_text).split_whitespace();
    let (Some(month_word), Some(day_word)) = (tokens.next(), tokens.next()) else {
        return Err(ScraperError::parse("date", date_text.trim()));
    };
    let month = month_from_finnish(month_word)?;
    let day = day_word
        .trim_end_matches(|c: char| c == '.' || c == ',')
        .parse::<u32>()
        .map_err(|_| ScraperError::parse("day", day_word))?;
    let date = date_for(day, month, today)?;
    let time = find_twelve_hour(time_text).or_else(|| find_clock(time_text));
    Ok(Showtime::new(date, time))
}
