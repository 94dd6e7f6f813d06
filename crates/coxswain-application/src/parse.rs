//! Free-text parsing for dialog replies.
//!
//! Replies to slot prompts arrive as raw text ("tomorrow", "7:30 pm",
//! "an hour and a half"). These parsers turn them into values; anything
//! unparseable is a validation re-prompt, never an error.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?$").unwrap());

static TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm|a\.m\.|p\.m\.)?$").unwrap());

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)\s*(hours?|hrs?|hr|h|minutes?|mins?|min|m)?$").unwrap()
});

/// Parses a date reply: `today`, `tomorrow`, a weekday name (next
/// occurrence, today included), `M/D`, `M/D/YYYY`, or ISO `YYYY-MM-DD`.
///
/// A month/day with no year is read as the next occurrence: `1/5` spoken
/// in December lands in January of next year.
pub fn parse_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = input.trim().to_lowercase();
    let text = text
        .trim_start_matches("on ")
        .trim_start_matches("next ")
        .trim();

    match text {
        "today" => return Some(today),
        "tomorrow" => return Some(today + chrono::Duration::days(1)),
        _ => {}
    }

    if let Some(weekday) = parse_weekday(text) {
        let ahead =
            (weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
        return Some(today + chrono::Duration::days(i64::from(ahead)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    if let Some(caps) = DATE_NUMERIC.captures(text) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        if let Some(year_raw) = caps.get(3) {
            let mut year: i32 = year_raw.as_str().parse().ok()?;
            if year < 100 {
                year += 2000;
            }
            return NaiveDate::from_ymd_opt(year, month, day);
        }
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
        if this_year < today {
            return NaiveDate::from_ymd_opt(today.year() + 1, month, day);
        }
        return Some(this_year);
    }

    None
}

fn parse_weekday(text: &str) -> Option<Weekday> {
    match text {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parses a time reply. Returns the time and whether the member spelled
/// out a meridiem; a bare "7" leaves the morning/evening reading to the
/// caller's policy.
pub fn parse_time(input: &str) -> Option<(NaiveTime, bool)> {
    let text = input.trim().to_lowercase();
    let text = text.trim_start_matches("at ").trim();

    if text == "noon" {
        return Some((NaiveTime::from_hms_opt(12, 0, 0)?, true));
    }

    let caps = TIME.captures(text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps
        .get(2)
        .map(|m| m.as_str().parse().ok())
        .unwrap_or(Some(0))?;
    let meridiem = caps.get(3).map(|m| m.as_str().starts_with('p'));

    match meridiem {
        Some(true) if hour < 12 => hour += 12,
        Some(false) if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0).map(|time| (time, meridiem.is_some()))
}

/// Parses a duration reply into minutes. A bare number is minutes;
/// fractional hours are fine ("1.5 hours").
pub fn parse_duration(input: &str) -> Option<u32> {
    let text = input.trim().to_lowercase();
    let text = text.trim_start_matches("for ").trim();

    match text {
        "an hour" | "one hour" => return Some(60),
        "half an hour" | "half hour" => return Some(30),
        "an hour and a half" => return Some(90),
        _ => {}
    }

    let caps = DURATION.captures(text)?;
    let amount: f64 = caps[1].parse().ok()?;
    let minutes = match caps.get(2).map(|m| m.as_str()) {
        Some(unit) if unit.starts_with('h') => amount * 60.0,
        _ => amount,
    };
    if minutes <= 0.0 || minutes.fract() != 0.0 {
        return None;
    }
    Some(minutes as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        // A Thursday
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_relative_dates() {
        assert_eq!(parse_date("today", today()), Some(today()));
        assert_eq!(parse_date("Tomorrow", today()), Some(date(2026, 8, 7)));
    }

    #[test]
    fn test_weekdays_roll_forward() {
        // Saturday after a Thursday is two days out
        assert_eq!(parse_date("saturday", today()), Some(date(2026, 8, 8)));
        // The same weekday means today
        assert_eq!(parse_date("thursday", today()), Some(today()));
        assert_eq!(parse_date("on monday", today()), Some(date(2026, 8, 10)));
    }

    #[test]
    fn test_numeric_dates() {
        assert_eq!(parse_date("8/10", today()), Some(date(2026, 8, 10)));
        assert_eq!(parse_date("8/10/2026", today()), Some(date(2026, 8, 10)));
        assert_eq!(parse_date("2026-08-10", today()), Some(date(2026, 8, 10)));
        // A month/day already past rolls into next year
        assert_eq!(parse_date("1/5", today()), Some(date(2027, 1, 5)));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_date("someday", today()), None);
        assert_eq!(parse_date("13/40", today()), None);
    }

    #[test]
    fn test_times() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(parse_time("7:30 am"), Some((t(7, 30), true)));
        assert_eq!(parse_time("7:30 pm"), Some((t(19, 30), true)));
        assert_eq!(parse_time("12 am"), Some((t(0, 0), true)));
        assert_eq!(parse_time("noon"), Some((t(12, 0), true)));
        assert_eq!(parse_time("at 7"), Some((t(7, 0), false)));
        assert_eq!(parse_time("19:15"), Some((t(19, 15), false)));
        assert_eq!(parse_time("sevenish"), None);
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration("30 minutes"), Some(30));
        assert_eq!(parse_duration("90"), Some(90));
        assert_eq!(parse_duration("1 hour"), Some(60));
        assert_eq!(parse_duration("1.5 hours"), Some(90));
        assert_eq!(parse_duration("an hour"), Some(60));
        assert_eq!(parse_duration("for 45 min"), Some(45));
        assert_eq!(parse_duration("a while"), None);
        // Fractional minutes don't quantize to anything sensible
        assert_eq!(parse_duration("1.7 hours"), None);
    }
}
