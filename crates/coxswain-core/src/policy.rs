//! Club reservation policy bounds.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Booking rules enforced while collecting a reservation request.
///
/// Checks return the feedback text shown to the member when a value is
/// out of bounds, so the dialog can re-prompt with a concrete reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationPolicy {
    /// How far ahead a reservation may start, in days
    #[serde(default = "default_max_days_ahead")]
    pub max_days_ahead: i64,
    /// Earliest allowed start time of day
    #[serde(default = "default_earliest_start")]
    pub earliest_start: NaiveTime,
    /// Latest allowed start time of day
    #[serde(default = "default_latest_start")]
    pub latest_start: NaiveTime,
    /// Start times and durations snap to this grid
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    #[serde(default = "default_min_duration_minutes")]
    pub min_duration_minutes: u32,
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: u32,
    /// Privately owned boats are exempt from the duration bounds
    #[serde(default = "default_private_exempt")]
    pub private_exempt_from_duration: bool,
}

fn default_max_days_ahead() -> i64 {
    14
}
fn default_earliest_start() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).unwrap()
}
fn default_latest_start() -> NaiveTime {
    NaiveTime::from_hms_opt(20, 0, 0).unwrap()
}
fn default_slot_minutes() -> u32 {
    15
}
fn default_min_duration_minutes() -> u32 {
    30
}
fn default_max_duration_minutes() -> u32 {
    120
}
fn default_private_exempt() -> bool {
    true
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            max_days_ahead: default_max_days_ahead(),
            earliest_start: default_earliest_start(),
            latest_start: default_latest_start(),
            slot_minutes: default_slot_minutes(),
            min_duration_minutes: default_min_duration_minutes(),
            max_duration_minutes: default_max_duration_minutes(),
            private_exempt_from_duration: default_private_exempt(),
        }
    }
}

impl ReservationPolicy {
    /// Validates a requested start date against the booking horizon.
    pub fn check_date(&self, date: NaiveDate, today: NaiveDate) -> Result<(), String> {
        if date < today {
            return Err("That date has already passed.".to_string());
        }
        if date > today + chrono::Duration::days(self.max_days_ahead) {
            return Err(format!(
                "Reservations can be made at most {} days ahead.",
                self.max_days_ahead
            ));
        }
        Ok(())
    }

    /// Validates a requested start time against the daily window and the
    /// slot grid.
    pub fn check_start_time(&self, time: NaiveTime) -> Result<(), String> {
        if time < self.earliest_start || time > self.latest_start {
            return Err(format!(
                "Start times must be between {} and {}.",
                self.earliest_start.format("%-I:%M %p"),
                self.latest_start.format("%-I:%M %p")
            ));
        }
        if !self.on_slot_grid(time) {
            return Err(format!(
                "Start times must fall on a {}-minute boundary.",
                self.slot_minutes
            ));
        }
        Ok(())
    }

    /// Validates a requested duration. Private boats skip the bounds when
    /// the exemption is enabled; the slot grid always applies.
    pub fn check_duration(&self, minutes: u32, is_private: bool) -> Result<(), String> {
        if minutes == 0 || minutes % self.slot_minutes != 0 {
            return Err(format!(
                "Durations must be a multiple of {} minutes.",
                self.slot_minutes
            ));
        }
        if is_private && self.private_exempt_from_duration {
            return Ok(());
        }
        if minutes < self.min_duration_minutes || minutes > self.max_duration_minutes {
            return Err(format!(
                "Durations must be between {} and {} minutes.",
                self.min_duration_minutes, self.max_duration_minutes
            ));
        }
        Ok(())
    }

    fn on_slot_grid(&self, time: NaiveTime) -> bool {
        use chrono::Timelike;
        time.second() == 0 && time.minute() % self.slot_minutes == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    #[test]
    fn test_past_date_rejected() {
        let policy = ReservationPolicy::default();
        let yesterday = today() - chrono::Duration::days(1);
        assert!(policy.check_date(yesterday, today()).is_err());
        assert!(policy.check_date(today(), today()).is_ok());
    }

    #[test]
    fn test_horizon_enforced() {
        let policy = ReservationPolicy::default();
        let at_horizon = today() + chrono::Duration::days(14);
        let past_horizon = today() + chrono::Duration::days(15);
        assert!(policy.check_date(at_horizon, today()).is_ok());
        assert!(policy.check_date(past_horizon, today()).is_err());
    }

    #[test]
    fn test_time_window_and_grid() {
        let policy = ReservationPolicy::default();
        assert!(
            policy
                .check_start_time(NaiveTime::from_hms_opt(7, 15, 0).unwrap())
                .is_ok()
        );
        assert!(
            policy
                .check_start_time(NaiveTime::from_hms_opt(5, 0, 0).unwrap())
                .is_err()
        );
        assert!(
            policy
                .check_start_time(NaiveTime::from_hms_opt(21, 0, 0).unwrap())
                .is_err()
        );
        assert!(
            policy
                .check_start_time(NaiveTime::from_hms_opt(7, 10, 0).unwrap())
                .is_err()
        );
    }

    #[test]
    fn test_duration_bounds_and_private_exemption() {
        let policy = ReservationPolicy::default();
        assert!(policy.check_duration(60, false).is_ok());
        assert!(policy.check_duration(15, false).is_err());
        assert!(policy.check_duration(180, false).is_err());
        // Private boats skip bounds but still snap to the grid
        assert!(policy.check_duration(180, true).is_ok());
        assert!(policy.check_duration(50, true).is_err());
    }
}
