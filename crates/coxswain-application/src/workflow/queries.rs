//! Reservation listing and availability queries.

use super::{Filtered, ReservationWorkflow};
use crate::format;
use crate::intent::{EntityKind, RecognizedIntent};
use crate::parse;
use chrono::{DateTime, Utc};
use coxswain_core::error::Result;
use coxswain_core::model::{ReservationFilter, SchedUser};
use coxswain_core::resolver::{ResolveOutcome, find_best_resource_match};
use coxswain_scheduling::retry::retry_with;

impl ReservationWorkflow {
    /// Lists the member's reservations, optionally narrowed by a boat
    /// or date mentioned in the utterance. Finding nothing is a normal
    /// outcome, not an error.
    pub(crate) async fn check_reservations(
        &self,
        member: &SchedUser,
        recognized: &RecognizedIntent,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let today = now.date_naive();
        let reservations = self.member_reservations(member).await?;
        let upcoming: Vec<_> = reservations
            .into_iter()
            .filter(|r| r.start.date() >= today)
            .collect();

        let filtered = match self.apply_entity_filters(upcoming, recognized, today).await {
            Filtered::List(list) => list,
            Filtered::Clarify(question) => return Ok(question),
        };

        if filtered.is_empty() {
            return Ok("No reservations found.".to_string());
        }

        let mut lines = Vec::with_capacity(filtered.len());
        for reservation in &filtered {
            let boat = self.boat_name(reservation.resource_id).await;
            lines.push(format::describe_reservation(reservation, &boat));
        }
        Ok(format!(
            "You have {}:\n{}",
            format::count_noun(filtered.len(), "reservation"),
            format::numbered_list(&lines)
        ))
    }

    /// Reports what's booked for a boat (or the whole fleet) on a day.
    pub(crate) async fn check_availability(
        &self,
        _member: &SchedUser,
        recognized: &RecognizedIntent,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let today = now.date_naive();
        let date = match recognized.entity(EntityKind::StartDate) {
            Some(entity) => match parse::parse_date(entity.value(), today) {
                Some(date) => date,
                None => return Ok("I didn't understand that date.".to_string()),
            },
            None => today,
        };

        let boat_words = recognized.entity_words(EntityKind::BoatName);
        let boat = if boat_words.is_empty() {
            None
        } else {
            let resources = self.cache.resources().await;
            match find_best_resource_match(&resources, &boat_words) {
                ResolveOutcome::Match(resource) => Some(resource.clone()),
                ResolveOutcome::Ambiguous(_) => {
                    return Ok("A few boats match that name. Which one do you mean?".to_string());
                }
                ResolveOutcome::NoMatch => {
                    return Ok("I couldn't find a boat by that name.".to_string());
                }
            }
        };

        let filter = ReservationFilter {
            resource_id: boat.as_ref().map(|b| b.resource_id),
            start: Some(date.and_time(chrono::NaiveTime::MIN)),
            end: Some((date + chrono::Duration::days(1)).and_time(chrono::NaiveTime::MIN)),
            ..ReservationFilter::default()
        };
        let api = &self.api;
        let mut booked = retry_with(&self.retry, || api.get_reservations(&filter)).await?;
        booked.sort_by_key(|r| r.start);

        let day = format::format_date(date);
        match boat {
            Some(boat) => {
                if booked.is_empty() {
                    Ok(format!("{} looks free on {}.", boat.name, day))
                } else {
                    let lines: Vec<String> = booked
                        .iter()
                        .map(|r| {
                            format!(
                                "{} to {}",
                                format::format_time(r.start.time()),
                                format::format_time(r.end.time())
                            )
                        })
                        .collect();
                    Ok(format!(
                        "{} is booked on {}:\n{}",
                        boat.name,
                        day,
                        format::numbered_list(&lines)
                    ))
                }
            }
            None => {
                if booked.is_empty() {
                    Ok(format!(
                        "Nothing is booked on {} - the whole fleet is open.",
                        day
                    ))
                } else {
                    let mut lines = Vec::with_capacity(booked.len());
                    for reservation in &booked {
                        let name = self.boat_name(reservation.resource_id).await;
                        lines.push(format::describe_reservation(reservation, &name));
                    }
                    Ok(format!(
                        "Here's what's booked on {}:\n{}",
                        day,
                        format::numbered_list(&lines)
                    ))
                }
            }
        }
    }
}
