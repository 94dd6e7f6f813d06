//! Human-readable rendering of reservations and summaries.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use coxswain_core::model::Reservation;

/// "Monday 8/10"
pub fn format_date(date: NaiveDate) -> String {
    format!("{} {}/{}", date.format("%A"), date.format("%-m"), date.format("%-d"))
}

/// "7:30 AM"
pub fn format_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// "1 hour 30 minutes", "45 minutes", "2 hours"
pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{} {}", m, pluralize_unit(m, "minute")),
        (h, 0) => format!("{} {}", h, pluralize_unit(h, "hour")),
        (h, m) => format!(
            "{} {} {} {}",
            h,
            pluralize_unit(h, "hour"),
            m,
            pluralize_unit(m, "minute")
        ),
    }
}

fn pluralize_unit(n: u32, unit: &str) -> String {
    if n == 1 {
        unit.to_string()
    } else {
        format!("{}s", unit)
    }
}

/// "3 reservations" / "1 reservation"
pub fn count_noun(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

/// "Santa Maria on Monday 8/10 from 7:00 AM to 8:00 AM"
pub fn describe_reservation(reservation: &Reservation, boat_name: &str) -> String {
    format!(
        "{} on {} from {} to {}",
        boat_name,
        format_date(reservation.start.date()),
        format_time(reservation.start.time()),
        format_time(reservation.end.time())
    )
}

/// Numbered list of reservation descriptions.
pub fn numbered_list(descriptions: &[String]) -> String {
    descriptions
        .iter()
        .enumerate()
        .map(|(index, line)| format!("  {}. {}", index + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Combines a date and time reply into the reservation start.
pub fn combine(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_and_time() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        assert_eq!(format_date(date), "Monday 8/10");
        assert_eq!(
            format_time(NaiveTime::from_hms_opt(7, 30, 0).unwrap()),
            "7:30 AM"
        );
        assert_eq!(
            format_time(NaiveTime::from_hms_opt(19, 0, 0).unwrap()),
            "7:00 PM"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45 minutes");
        assert_eq!(format_duration(60), "1 hour");
        assert_eq!(format_duration(90), "1 hour 30 minutes");
        assert_eq!(format_duration(120), "2 hours");
    }

    #[test]
    fn test_count_noun() {
        assert_eq!(count_noun(1, "reservation"), "1 reservation");
        assert_eq!(count_noun(3, "reservation"), "3 reservations");
    }

    #[test]
    fn test_describe_reservation() {
        let start = NaiveDate::from_ymd_opt(2026, 8, 10)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        let reservation = Reservation {
            reference_number: "ref-1".to_string(),
            resource_id: 1,
            owner_user_id: 2,
            participant_ids: vec![],
            start,
            end: start + chrono::Duration::minutes(60),
            check_in_date: None,
            check_out_date: None,
        };
        assert_eq!(
            describe_reservation(&reservation, "Santa Maria"),
            "Santa Maria on Monday 8/10 from 7:00 AM to 8:00 AM"
        );
    }
}
