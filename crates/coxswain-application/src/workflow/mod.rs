//! Reservation workflow controller.
//!
//! One operation per supported intent, composed from the roster cache,
//! the name resolver, the slot-filling dialogue engine, and the retrying
//! scheduling client. Each turn takes the conversation context plus the
//! recognizer's output and produces the reply text; dialog state rides
//! along in the context.
//!
//! - `create`: The slot-filling reservation form
//! - `queries`: Availability and reservation listing
//! - `cancel`: Cancellation with confirmation/disambiguation
//! - `checkinout`: Outing check-in and check-out

mod cancel;
mod checkinout;
mod create;
mod queries;

pub use create::FormCtx;

use crate::context::{ActiveDialog, CheckDirection, ConversationContext};
use crate::intent::{EntityKind, Intent, RecognizedIntent};
use chrono::{DateTime, NaiveDate, Utc};
use coxswain_core::error::{CoxswainError, Result};
use coxswain_core::model::{Reservation, ReservationFilter, SchedUser};
use coxswain_core::policy::ReservationPolicy;
use coxswain_core::resolver::{ResolveOutcome, find_best_resource_match};
use coxswain_infrastructure::cache::TenantCache;
use coxswain_scheduling::client::SchedulingApi;
use coxswain_scheduling::retry::{RetryPolicy, retry_with};
use std::sync::Arc;

/// One inbound message: the raw text plus the recognizer's reading of it.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnInput {
    pub utterance: String,
    pub recognized: RecognizedIntent,
}

impl TurnInput {
    pub fn new(utterance: impl Into<String>, recognized: RecognizedIntent) -> Self {
        Self {
            utterance: utterance.into(),
            recognized,
        }
    }
}

/// A reservation list narrowed by the entities in an utterance, or a
/// clarification request when an entity couldn't be applied.
pub(crate) enum Filtered {
    List(Vec<Reservation>),
    Clarify(String),
}

/// The conversational reservation engine for one tenant.
///
/// Dependencies are injected at construction; nothing here is a global.
pub struct ReservationWorkflow {
    cache: Arc<TenantCache>,
    api: Arc<dyn SchedulingApi>,
    policy: ReservationPolicy,
    retry: RetryPolicy,
    club_name: String,
}

impl ReservationWorkflow {
    pub fn new(
        cache: Arc<TenantCache>,
        api: Arc<dyn SchedulingApi>,
        policy: ReservationPolicy,
        club_name: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            api,
            policy,
            retry: RetryPolicy::interactive(),
            club_name: club_name.into(),
        }
    }

    /// Overrides the retry schedule for member-facing calls (defaults to
    /// the interactive policy).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Handles one conversation turn.
    pub async fn handle_turn(&self, ctx: &mut ConversationContext, input: TurnInput) -> String {
        self.handle_turn_at(ctx, input, Utc::now()).await
    }

    /// Same as [`Self::handle_turn`] with the clock injected.
    ///
    /// A turn never escapes as an error: unexpected failures are logged
    /// loudly and the member still gets a reply.
    pub async fn handle_turn_at(
        &self,
        ctx: &mut ConversationContext,
        input: TurnInput,
        now: DateTime<Utc>,
    ) -> String {
        let turn_id = uuid::Uuid::new_v4();
        let reply = match self.dispatch(ctx, &input, now).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(
                    "[ReservationWorkflow] turn {} for {} failed: {}",
                    turn_id,
                    ctx.session.external_user_id,
                    err
                );
                ctx.dialog = None;
                match err {
                    CoxswainError::Transport { .. } | CoxswainError::Auth(_) => {
                        "I'm having trouble reaching the scheduling system right now. \
                         Please try again in a few minutes."
                            .to_string()
                    }
                    _ => "Something went wrong on my end. Please try that again.".to_string(),
                }
            }
        };
        self.with_help_prefix(ctx, reply)
    }

    async fn dispatch(
        &self,
        ctx: &mut ConversationContext,
        input: &TurnInput,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let Some(member) = self.ensure_member(ctx, now).await else {
            return Ok(format!(
                "I couldn't find you in {}'s member list. \
                 Please contact the club to get your account linked.",
                self.club_name
            ));
        };

        if let Some(dialog) = ctx.dialog.take() {
            return self
                .resume_dialog(ctx, dialog, &member, &input.utterance, now)
                .await;
        }

        match input.recognized.intent {
            Intent::CreateReservation => {
                self.start_create(ctx, &member, &input.recognized, now).await
            }
            Intent::CheckReservations => {
                self.check_reservations(&member, &input.recognized, now).await
            }
            Intent::CheckBoatAvailability => {
                self.check_availability(&member, &input.recognized, now).await
            }
            Intent::CancelReservation => {
                self.start_cancel(ctx, &member, &input.recognized, now).await
            }
            Intent::Checkin => {
                self.start_check(ctx, &member, &input.recognized, now, CheckDirection::In)
                    .await
            }
            Intent::Checkout => {
                self.start_check(ctx, &member, &input.recognized, now, CheckDirection::Out)
                    .await
            }
            Intent::Help | Intent::None => Ok(self.help_text()),
        }
    }

    async fn resume_dialog(
        &self,
        ctx: &mut ConversationContext,
        dialog: ActiveDialog,
        member: &SchedUser,
        utterance: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        match dialog {
            ActiveDialog::Create(state) => {
                self.resume_create(ctx, member, state, utterance, now).await
            }
            ActiveDialog::CancelConfirm {
                reference,
                description,
            } => {
                self.resume_cancel_confirm(ctx, reference, description, utterance)
                    .await
            }
            ActiveDialog::CancelSelect { state, references } => {
                self.resume_cancel_select(ctx, state, references, utterance)
                    .await
            }
            ActiveDialog::CheckSelect {
                state,
                references,
                direction,
            } => {
                self.resume_check_select(ctx, state, references, direction, utterance)
                    .await
            }
        }
    }

    /// Resolves the conversation to a roster member, re-checking the
    /// link when the session has gone stale.
    async fn ensure_member(
        &self,
        ctx: &mut ConversationContext,
        now: DateTime<Utc>,
    ) -> Option<SchedUser> {
        if !ctx.session.is_stale(now) {
            if let Some(id) = ctx.session.sched_user_id {
                if let Some(user) = self.cache.get_user(id).await {
                    return Some(user);
                }
            }
        }

        let users = self.cache.users().await;
        let found = users
            .into_iter()
            .find(|u| u.user_name.eq_ignore_ascii_case(&ctx.session.external_user_id));
        match found {
            Some(user) => {
                ctx.session.mark_refreshed(user.id, user.timezone.clone(), now);
                Some(user)
            }
            None => None,
        }
    }

    fn help_text(&self) -> String {
        format!(
            "I'm the {} reservation assistant. I can create a reservation, \
             check boat availability, list your reservations, cancel one, \
             and check you in or out of an outing. Say \"quit\" at any point \
             to abandon what we're doing.",
            self.club_name
        )
    }

    fn with_help_prefix(&self, ctx: &mut ConversationContext, reply: String) -> String {
        if ctx.session.help_shown {
            reply
        } else {
            ctx.session.help_shown = true;
            format!("{}\n\n{}", self.help_text(), reply)
        }
    }

    /// The member's reservations, newest fetch each time.
    pub(crate) async fn member_reservations(
        &self,
        member: &SchedUser,
    ) -> Result<Vec<Reservation>> {
        let filter = ReservationFilter {
            user_id: Some(member.id),
            ..ReservationFilter::default()
        };
        let api = &self.api;
        let mut reservations = retry_with(&self.retry, || api.get_reservations(&filter)).await?;
        reservations.sort_by_key(|r| r.start);
        Ok(reservations)
    }

    /// Applies optional boat and date entities as filters over a
    /// reservation list. An unresolvable boat name comes back as a
    /// clarification request instead of a filtered list.
    pub(crate) async fn apply_entity_filters(
        &self,
        mut reservations: Vec<Reservation>,
        recognized: &RecognizedIntent,
        today: NaiveDate,
    ) -> Filtered {
        let boat_words = recognized.entity_words(EntityKind::BoatName);
        if !boat_words.is_empty() {
            let resources = self.cache.resources().await;
            match find_best_resource_match(&resources, &boat_words) {
                ResolveOutcome::Match(resource) => {
                    let id = resource.resource_id;
                    reservations.retain(|r| r.resource_id == id);
                }
                ResolveOutcome::Ambiguous(_) => {
                    return Filtered::Clarify(
                        "A few boats match that name. Which one do you mean?".to_string(),
                    );
                }
                ResolveOutcome::NoMatch => {
                    return Filtered::Clarify("I couldn't find a boat by that name.".to_string());
                }
            }
        }

        if let Some(entity) = recognized.entity(EntityKind::StartDate) {
            match crate::parse::parse_date(entity.value(), today) {
                Some(date) => reservations.retain(|r| r.starts_on(date)),
                None => {
                    return Filtered::Clarify("I didn't understand that date.".to_string());
                }
            }
        }

        Filtered::List(reservations)
    }

    /// Display name for a boat id, falling back to the raw id when the
    /// roster has moved on.
    pub(crate) async fn boat_name(&self, resource_id: i64) -> String {
        self.cache
            .snapshot()
            .await
            .resource(resource_id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| format!("boat #{}", resource_id))
    }
}
