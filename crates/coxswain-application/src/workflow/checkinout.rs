//! Outing check-in and check-out.
//!
//! Same branch-on-count shape as cancellation, scoped to today's
//! outings: check-in wants a reservation not yet started, check-out one
//! that's on the water.

use super::{Filtered, ReservationWorkflow};
use crate::context::{ActiveDialog, CheckDirection, ConversationContext};
use crate::format;
use crate::intent::RecognizedIntent;
use chrono::{DateTime, Utc};
use coxswain_core::dialogue::{DialogState, SelectionPrompt, SelectionStep};
use coxswain_core::error::Result;
use coxswain_core::model::{Reservation, SchedUser};
use coxswain_scheduling::error::SchedulingError;
use coxswain_scheduling::retry::retry_with;

impl CheckDirection {
    fn verb(self) -> &'static str {
        match self {
            Self::In => "check in",
            Self::Out => "check out",
        }
    }

    fn eligible(self, reservation: &Reservation) -> bool {
        match self {
            Self::In => !reservation.is_checked_in(),
            Self::Out => reservation.is_checked_in() && !reservation.is_checked_out(),
        }
    }
}

impl ReservationWorkflow {
    pub(crate) async fn start_check(
        &self,
        ctx: &mut ConversationContext,
        member: &SchedUser,
        recognized: &RecognizedIntent,
        now: DateTime<Utc>,
        direction: CheckDirection,
    ) -> Result<String> {
        let today = now.date_naive();
        let reservations = self.member_reservations(member).await?;
        let eligible: Vec<_> = reservations
            .into_iter()
            .filter(|r| r.involves(member.id) && r.starts_on(today) && direction.eligible(r))
            .collect();

        let matches = match self.apply_entity_filters(eligible, recognized, today).await {
            Filtered::List(list) => list,
            Filtered::Clarify(question) => return Ok(question),
        };

        match matches.len() {
            0 => Ok(format!(
                "I don't see an outing of yours today to {}.",
                direction.verb()
            )),
            1 => {
                self.perform_check(&matches[0].reference_number, direction)
                    .await
            }
            _ => {
                let mut labels = Vec::with_capacity(matches.len());
                for reservation in &matches {
                    let boat = self.boat_name(reservation.resource_id).await;
                    labels.push(format::describe_reservation(reservation, &boat));
                }
                let references: Vec<String> = matches
                    .iter()
                    .map(|r| r.reference_number.clone())
                    .collect();

                let mut state = DialogState::new();
                state.pending_candidates = labels.clone();
                let prompt = SelectionPrompt::new(
                    format!("Which outing would you like to {}?", direction.verb()),
                    labels,
                );
                let text = prompt.render();
                ctx.dialog = Some(ActiveDialog::CheckSelect {
                    state,
                    references,
                    direction,
                });
                Ok(text)
            }
        }
    }

    pub(crate) async fn resume_check_select(
        &self,
        ctx: &mut ConversationContext,
        mut state: DialogState,
        references: Vec<String>,
        direction: CheckDirection,
        utterance: &str,
    ) -> Result<String> {
        let prompt = SelectionPrompt::new(
            format!("Which outing would you like to {}?", direction.verb()),
            state.pending_candidates.clone(),
        );
        match prompt.handle_reply(&mut state, utterance) {
            SelectionStep::Chosen(index) => {
                let Some(reference) = references.get(index) else {
                    return Ok("That option is gone; nothing changed.".to_string());
                };
                self.perform_check(reference, direction).await
            }
            SelectionStep::NoneOfTheAbove | SelectionStep::Cancelled => {
                Ok("Okay, nothing changed.".to_string())
            }
            SelectionStep::Retry(text) => {
                ctx.dialog = Some(ActiveDialog::CheckSelect {
                    state,
                    references,
                    direction,
                });
                Ok(text)
            }
            SelectionStep::TooManyAttempts => Ok(
                "Sorry, I didn't get that after several tries. Nothing changed.".to_string(),
            ),
        }
    }

    async fn perform_check(&self, reference: &str, direction: CheckDirection) -> Result<String> {
        let api = &self.api;
        let result = match direction {
            CheckDirection::In => retry_with(&self.retry, || api.check_in(reference)).await,
            CheckDirection::Out => retry_with(&self.retry, || api.check_out(reference)).await,
        };
        match result {
            Ok(()) => Ok(match direction {
                CheckDirection::In => "You're checked in - have a great row!".to_string(),
                CheckDirection::Out => "You're checked out. Welcome back!".to_string(),
            }),
            Err(SchedulingError::Rejected { message })
            | Err(SchedulingError::Api { message, .. }) => Ok(format!(
                "The scheduling system wouldn't {} that outing: {}",
                direction.verb(),
                message
            )),
            Err(SchedulingError::NotFound(_)) => {
                Ok("That reservation isn't on the books anymore.".to_string())
            }
            Err(err) => {
                tracing::warn!(
                    "[ReservationWorkflow] {} failed for {}: {}",
                    direction.verb(),
                    reference,
                    err
                );
                Ok(format!(
                    "I couldn't reach the scheduling system to {} right now. \
                     Please try again in a few minutes.",
                    direction.verb()
                ))
            }
        }
    }
}
