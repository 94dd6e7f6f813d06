//! Bookings and the request/filter types around them.

use super::resource::ResourceId;
use super::user::UserId;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A booking held by the scheduling service.
///
/// Reservations are created and destroyed via the external service; the
/// engine only holds transient working copies during a dialog turn. All
/// timestamps are club-local wall-clock times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Opaque reference assigned by the scheduling service
    pub reference_number: String,
    pub resource_id: ResourceId,
    pub owner_user_id: UserId,
    /// Additional participants (partner in a two-seat boat)
    #[serde(default)]
    pub participant_ids: Vec<UserId>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub check_in_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub check_out_date: Option<NaiveDateTime>,
}

impl Reservation {
    /// True when the member has already checked in on the water.
    pub fn is_checked_in(&self) -> bool {
        self.check_in_date.is_some()
    }

    /// True when the outing is finished.
    pub fn is_checked_out(&self) -> bool {
        self.check_out_date.is_some()
    }

    /// True when the reservation starts on the given day.
    pub fn starts_on(&self, date: NaiveDate) -> bool {
        self.start.date() == date
    }

    /// True when the given member owns or participates in this reservation.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.owner_user_id == user_id || self.participant_ids.contains(&user_id)
    }

    /// Duration in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Filter for reservation list queries.
///
/// Every field is optional; an empty filter returns everything the
/// service is willing to list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationFilter {
    pub user_id: Option<UserId>,
    pub resource_id: Option<ResourceId>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Request payload for creating a reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub resource_id: ResourceId,
    pub owner_user_id: UserId,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    /// Partner for a two-seat boat
    pub participant_id: Option<UserId>,
}

impl NewReservation {
    /// End of the requested slot.
    pub fn end(&self) -> NaiveDateTime {
        self.start + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Reservation {
        let start = NaiveDate::from_ymd_opt(2026, 8, 10)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        Reservation {
            reference_number: "ref-100".to_string(),
            resource_id: 3,
            owner_user_id: 21,
            participant_ids: vec![22],
            start,
            end: start + chrono::Duration::minutes(60),
            check_in_date: None,
            check_out_date: None,
        }
    }

    #[test]
    fn test_starts_on() {
        let r = sample();
        assert!(r.starts_on(NaiveDate::from_ymd_opt(2026, 8, 10).unwrap()));
        assert!(!r.starts_on(NaiveDate::from_ymd_opt(2026, 8, 11).unwrap()));
    }

    #[test]
    fn test_involves_owner_and_participant() {
        let r = sample();
        assert!(r.involves(21));
        assert!(r.involves(22));
        assert!(!r.involves(23));
    }

    #[test]
    fn test_duration_minutes() {
        assert_eq!(sample().duration_minutes(), 60);
    }
}
