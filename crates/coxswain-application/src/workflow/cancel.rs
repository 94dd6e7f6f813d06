//! Reservation cancellation.
//!
//! Branches on how many of the member's reservations match: none is a
//! normal "nothing found" reply, one gets a yes/no confirmation, several
//! get the bounded-attempt numeric selection.

use super::{Filtered, ReservationWorkflow};
use crate::context::{ActiveDialog, ConversationContext};
use crate::format;
use crate::intent::RecognizedIntent;
use chrono::{DateTime, Utc};
use coxswain_core::dialogue::{DialogState, SelectionPrompt, SelectionStep, is_cancel, parse_yes_no};
use coxswain_core::error::Result;
use coxswain_core::model::SchedUser;
use coxswain_scheduling::error::SchedulingError;
use coxswain_scheduling::retry::retry_with;

const UNCHANGED: &str = "Your reservations are unchanged.";

impl ReservationWorkflow {
    pub(crate) async fn start_cancel(
        &self,
        ctx: &mut ConversationContext,
        member: &SchedUser,
        recognized: &RecognizedIntent,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let today = now.date_naive();
        let reservations = self.member_reservations(member).await?;
        let owned: Vec<_> = reservations
            .into_iter()
            .filter(|r| r.owner_user_id == member.id && r.start.date() >= today)
            .collect();

        let matches = match self.apply_entity_filters(owned, recognized, today).await {
            Filtered::List(list) => list,
            Filtered::Clarify(question) => return Ok(question),
        };

        match matches.len() {
            0 => Ok("I couldn't find any reservations of yours to cancel.".to_string()),
            1 => {
                let reservation = &matches[0];
                let boat = self.boat_name(reservation.resource_id).await;
                let description = format::describe_reservation(reservation, &boat);
                ctx.dialog = Some(ActiveDialog::CancelConfirm {
                    reference: reservation.reference_number.clone(),
                    description: description.clone(),
                });
                Ok(format!(
                    "Is this the reservation you want to cancel?\n  {}\n(yes/no)",
                    description
                ))
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
                let prompt =
                    SelectionPrompt::new("Which reservation would you like to cancel?", labels);
                let text = prompt.render();
                ctx.dialog = Some(ActiveDialog::CancelSelect { state, references });
                Ok(text)
            }
        }
    }

    pub(crate) async fn resume_cancel_confirm(
        &self,
        ctx: &mut ConversationContext,
        reference: String,
        description: String,
        utterance: &str,
    ) -> Result<String> {
        if is_cancel(utterance) {
            return Ok(format!("Okay. {}", UNCHANGED));
        }
        match parse_yes_no(utterance) {
            Some(true) => self.delete_by_reference(&reference).await,
            Some(false) => Ok(format!("Okay, I'll leave it alone. {}", UNCHANGED)),
            None => {
                // Stay in the confirmation until we get a clear answer
                ctx.dialog = Some(ActiveDialog::CancelConfirm {
                    reference,
                    description: description.clone(),
                });
                Ok(format!(
                    "Please answer yes or no. Is this the reservation you want to cancel?\n  {}",
                    description
                ))
            }
        }
    }

    pub(crate) async fn resume_cancel_select(
        &self,
        ctx: &mut ConversationContext,
        mut state: DialogState,
        references: Vec<String>,
        utterance: &str,
    ) -> Result<String> {
        let prompt = SelectionPrompt::new(
            "Which reservation would you like to cancel?",
            state.pending_candidates.clone(),
        );
        match prompt.handle_reply(&mut state, utterance) {
            SelectionStep::Chosen(index) => {
                let Some(reference) = references.get(index) else {
                    return Ok(format!("That option is gone. {}", UNCHANGED));
                };
                self.delete_by_reference(reference).await
            }
            SelectionStep::NoneOfTheAbove | SelectionStep::Cancelled => {
                Ok(format!("Okay, nothing cancelled. {}", UNCHANGED))
            }
            SelectionStep::Retry(text) => {
                ctx.dialog = Some(ActiveDialog::CancelSelect { state, references });
                Ok(text)
            }
            SelectionStep::TooManyAttempts => Ok(format!(
                "Sorry, I didn't get that after several tries. {}",
                UNCHANGED
            )),
        }
    }

    async fn delete_by_reference(&self, reference: &str) -> Result<String> {
        let api = &self.api;
        match retry_with(&self.retry, || api.delete_reservation(reference)).await {
            Ok(()) => Ok("Done - your reservation is cancelled.".to_string()),
            Err(SchedulingError::NotFound(_)) => {
                Ok("That reservation isn't on the books anymore.".to_string())
            }
            Err(SchedulingError::Rejected { message }) => Ok(format!(
                "The scheduling system wouldn't cancel it: {}",
                message
            )),
            Err(err) => {
                tracing::warn!("[ReservationWorkflow] cancellation failed: {}", err);
                Ok(format!(
                    "I couldn't reach the scheduling system to cancel that. {}",
                    UNCHANGED
                ))
            }
        }
    }
}
