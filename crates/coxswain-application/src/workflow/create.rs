//! The slot-filling reservation form.
//!
//! Fields in order: boat, start date, start time, duration, and a
//! partner when the chosen boat seats two. Validators lean on the
//! resolver and the club policy; the booking itself happens only after
//! the member confirms the summary.

use super::ReservationWorkflow;
use crate::context::{ActiveDialog, ConversationContext};
use crate::intent::{EntityKind, RecognizedIntent};
use crate::parse;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use coxswain_core::dialogue::{
    DialogPhase, DialogState, FormBuilder, FormDefinition, FormStep, Validation,
};
use coxswain_core::error::Result;
use coxswain_core::model::{NewReservation, Resource, SchedGroup, SchedUser};
use coxswain_core::policy::ReservationPolicy;
use coxswain_core::resolver::{ResolveOutcome, find_best_resource_match, find_best_user_match};
use coxswain_infrastructure::cache::RosterSnapshot;
use coxswain_scheduling::error::SchedulingError;
use coxswain_scheduling::retry::retry_with;
use std::collections::HashMap;

/// Value stored for the partner field when the member rows alone.
const NO_PARTNER: &str = "nobody";

/// Everything the form validators need for one turn: a stable view of
/// the roster plus the member and policy. Rebuilt each turn; the dialog
/// state is what persists.
pub struct FormCtx {
    pub resources: Vec<Resource>,
    pub users: Vec<SchedUser>,
    pub groups: Vec<SchedGroup>,
    pub member: SchedUser,
    pub policy: ReservationPolicy,
    pub today: NaiveDate,
}

impl FormCtx {
    pub fn from_snapshot(
        snapshot: &RosterSnapshot,
        member: SchedUser,
        policy: ReservationPolicy,
        today: NaiveDate,
    ) -> Self {
        let mut users: Vec<SchedUser> = snapshot.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        let mut groups: Vec<SchedGroup> = snapshot.groups.values().cloned().collect();
        groups.sort_by_key(|g| g.id);
        Self {
            resources: snapshot.resources.clone(),
            users,
            groups,
            member,
            policy,
            today,
        }
    }

    /// Whether the member may take this boat out: direct permission, a
    /// group grant, or any public boat.
    fn may_offer(&self, resource: &Resource) -> bool {
        if self.member.may_book(resource.resource_id) {
            return true;
        }
        if self
            .groups
            .iter()
            .any(|g| self.member.group_ids.contains(&g.id) && g.grants(resource.resource_id))
        {
            return true;
        }
        !resource.is_private
    }
}

/// Whether the boat recorded in the state seats a partner.
fn needs_partner(state: &DialogState) -> bool {
    state
        .value("boat_seats")
        .and_then(|s| s.parse::<u32>().ok())
        .is_some_and(|seats| seats > 1)
}

fn build_create_form(state: &DialogState) -> FormDefinition<FormCtx> {
    let mut builder = FormBuilder::new()
        .field("boat", "Which boat would you like?", validate_boat)
        .field(
            "start_date",
            "What day would you like to go out?",
            validate_date,
        )
        .field(
            "start_time",
            "What time would you like to start?",
            validate_time,
        )
        .field("duration", "How long will you be out?", validate_duration);
    if needs_partner(state) {
        builder = builder.field(
            "partner",
            "Who will be rowing with you? (Say \"nobody\" to go alone.)",
            validate_partner,
        );
    }
    builder.summary(build_summary)
}

fn validate_boat(ctx: &FormCtx, _state: &DialogState, input: &str) -> Validation {
    let words: Vec<String> = input
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect();
    match find_best_resource_match(&ctx.resources, &words) {
        ResolveOutcome::Match(resource) => {
            if !ctx.may_offer(resource) {
                return Validation::invalid(format!(
                    "You don't have permission to take out {}.",
                    resource.name
                ));
            }
            Validation::valid_with(
                resource.name.clone(),
                vec![
                    ("resource_id".to_string(), resource.resource_id.to_string()),
                    ("boat_private".to_string(), resource.is_private.to_string()),
                    (
                        "boat_seats".to_string(),
                        resource.max_participants.to_string(),
                    ),
                ],
            )
        }
        ResolveOutcome::Ambiguous(candidates) => {
            let names: Vec<&str> = candidates.iter().map(|r| r.name.as_str()).collect();
            Validation::invalid(format!(
                "A few boats match that: {}. Which one do you mean?",
                names.join(", ")
            ))
        }
        ResolveOutcome::NoMatch => {
            Validation::invalid("I couldn't find a good match for that boat name.")
        }
    }
}

fn validate_date(ctx: &FormCtx, _state: &DialogState, input: &str) -> Validation {
    let Some(date) = parse::parse_date(input, ctx.today) else {
        return Validation::invalid("I didn't understand that date.");
    };
    match ctx.policy.check_date(date, ctx.today) {
        Ok(()) => Validation::valid(date.format("%Y-%m-%d").to_string()),
        Err(feedback) => Validation::invalid(feedback),
    }
}

fn validate_time(ctx: &FormCtx, _state: &DialogState, input: &str) -> Validation {
    let Some((time, meridiem_given)) = parse::parse_time(input) else {
        return Validation::invalid("I didn't understand that time.");
    };
    match ctx.policy.check_start_time(time) {
        Ok(()) => Validation::valid(time.format("%H:%M").to_string()),
        Err(feedback) => {
            // A bare "7" can mean 7 PM; prefer the reading that is
            // actually bookable
            if !meridiem_given && time.hour() < 12 {
                let evening = time + chrono::Duration::hours(12);
                if ctx.policy.check_start_time(evening).is_ok() {
                    return Validation::valid(evening.format("%H:%M").to_string());
                }
            }
            Validation::invalid(feedback)
        }
    }
}

fn validate_duration(ctx: &FormCtx, state: &DialogState, input: &str) -> Validation {
    let Some(minutes) = parse::parse_duration(input) else {
        return Validation::invalid("I didn't understand that duration.");
    };
    let is_private = state.value("boat_private") == Some("true");
    match ctx.policy.check_duration(minutes, is_private) {
        Ok(()) => Validation::valid(minutes.to_string()),
        Err(feedback) => Validation::invalid(feedback),
    }
}

fn validate_partner(ctx: &FormCtx, _state: &DialogState, input: &str) -> Validation {
    let text = input.trim().to_lowercase();
    if matches!(
        text.as_str(),
        "nobody" | "none" | "no one" | "noone" | "alone" | "solo" | "just me"
    ) {
        return Validation::valid(NO_PARTNER);
    }

    let words: Vec<String> = text.split_whitespace().map(|w| w.to_string()).collect();
    let others: Vec<SchedUser> = ctx
        .users
        .iter()
        .filter(|u| u.id != ctx.member.id)
        .cloned()
        .collect();
    match find_best_user_match(&others, &words) {
        ResolveOutcome::Match(partner) => Validation::valid_with(
            partner.full_name(),
            vec![("partner_id".to_string(), partner.id.to_string())],
        ),
        ResolveOutcome::Ambiguous(candidates) => {
            let names: Vec<String> = candidates.iter().map(|u| u.full_name()).collect();
            Validation::invalid(format!(
                "More than one member matches: {}. Which one?",
                names.join(", ")
            ))
        }
        ResolveOutcome::NoMatch => Validation::invalid("I couldn't find a member by that name."),
    }
}

fn build_summary(_ctx: &FormCtx, state: &DialogState) -> String {
    let boat = state.value("boat").unwrap_or("?");
    let date = state
        .value("start_date")
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map(crate::format::format_date)
        .unwrap_or_else(|| "?".to_string());
    let time = state
        .value("start_time")
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
        .map(crate::format::format_time)
        .unwrap_or_else(|| "?".to_string());
    let duration = state
        .value("duration")
        .and_then(|m| m.parse::<u32>().ok())
        .map(crate::format::format_duration)
        .unwrap_or_else(|| "?".to_string());
    let partner = match state.value("partner") {
        Some(name) if name != NO_PARTNER => format!(", with {}", name),
        _ => String::new(),
    };
    format!(
        "Here's what I have: {} on {} at {} for {}{}.\nShall I book it? (yes/no)",
        boat, date, time, duration, partner
    )
}

/// Maps recognizer entities onto form field pre-fills.
fn prefill_from(recognized: &RecognizedIntent) -> HashMap<String, String> {
    let mut prefilled = HashMap::new();
    let mut put = |name: &str, kind: EntityKind| {
        if let Some(entity) = recognized.entity(kind) {
            prefilled.insert(name.to_string(), entity.value().to_string());
        }
    };
    put("boat", EntityKind::BoatName);
    put("start_date", EntityKind::StartDate);
    put("start_time", EntityKind::StartTime);
    put("duration", EntityKind::Duration);
    put("partner", EntityKind::UserName);
    prefilled
}

impl ReservationWorkflow {
    pub(crate) async fn start_create(
        &self,
        ctx: &mut ConversationContext,
        member: &SchedUser,
        recognized: &RecognizedIntent,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let snapshot = self.cache.snapshot().await;
        let fctx = FormCtx::from_snapshot(
            &snapshot,
            member.clone(),
            self.policy.clone(),
            now.date_naive(),
        );
        let mut state = DialogState::new();
        let prefilled = prefill_from(recognized);

        let step = build_create_form(&state).begin(&fctx, &mut state, &prefilled);
        let step = fixup_partner(&fctx, &mut state, step);
        self.apply_create_step(ctx, &fctx, state, step).await
    }

    pub(crate) async fn resume_create(
        &self,
        ctx: &mut ConversationContext,
        member: &SchedUser,
        mut state: DialogState,
        utterance: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let snapshot = self.cache.snapshot().await;
        let fctx = FormCtx::from_snapshot(
            &snapshot,
            member.clone(),
            self.policy.clone(),
            now.date_naive(),
        );

        let step = build_create_form(&state).handle_reply(&fctx, &mut state, utterance);
        let step = fixup_partner(&fctx, &mut state, step);
        self.apply_create_step(ctx, &fctx, state, step).await
    }

    async fn apply_create_step(
        &self,
        ctx: &mut ConversationContext,
        fctx: &FormCtx,
        state: DialogState,
        step: FormStep,
    ) -> Result<String> {
        match step {
            FormStep::Prompt(text) => {
                ctx.dialog = Some(ActiveDialog::Create(state));
                Ok(text)
            }
            FormStep::Cancelled => {
                Ok("Okay, I've dropped that request. Nothing was reserved.".to_string())
            }
            FormStep::Completed => self.book(fctx, &state).await,
        }
    }

    /// Places the booking from a completed form.
    async fn book(&self, fctx: &FormCtx, state: &DialogState) -> Result<String> {
        let request = match booking_request(fctx, state) {
            Some(request) => request,
            None => {
                // A completed form always carries these values; anything
                // else is a bug worth failing the turn over
                return Err(coxswain_core::CoxswainError::internal(
                    "completed reservation form missing values",
                ));
            }
        };

        let api = &self.api;
        match retry_with(&self.retry, || api.create_reservation(&request)).await {
            Ok(reservation) => {
                let boat = state.value("boat").unwrap_or("your boat");
                Ok(format!(
                    "You're all set! {} is yours on {} at {} (reference {}).",
                    boat,
                    crate::format::format_date(reservation.start.date()),
                    crate::format::format_time(reservation.start.time()),
                    reservation.reference_number
                ))
            }
            Err(SchedulingError::Rejected { message }) => Ok(format!(
                "The scheduling system wouldn't accept that reservation: {}",
                message
            )),
            Err(err) => {
                tracing::warn!("[ReservationWorkflow] booking failed: {}", err);
                Ok(
                    "I couldn't reach the scheduling system to book that. \
                     Your reservation was NOT made; please try again in a few minutes."
                        .to_string(),
                )
            }
        }
    }
}

/// A same-turn boat choice can reveal the need for a partner after the
/// form was built without that field; re-enter the rebuilt form so the
/// partner is collected before confirmation.
fn fixup_partner(fctx: &FormCtx, state: &mut DialogState, step: FormStep) -> FormStep {
    if matches!(step, FormStep::Prompt(_))
        && state.phase == DialogPhase::Confirming
        && needs_partner(state)
        && state.value("partner").is_none()
    {
        return build_create_form(state).begin(fctx, state, &HashMap::new());
    }
    step
}

fn booking_request(fctx: &FormCtx, state: &DialogState) -> Option<NewReservation> {
    let resource_id = state.value("resource_id")?.parse().ok()?;
    let date = NaiveDate::parse_from_str(state.value("start_date")?, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(state.value("start_time")?, "%H:%M").ok()?;
    let duration_minutes = state.value("duration")?.parse().ok()?;
    let participant_id = state
        .value("partner_id")
        .and_then(|id| id.parse().ok())
        .filter(|_| state.value("partner") != Some(NO_PARTNER));
    let start: NaiveDateTime = date.and_time(time);
    Some(NewReservation {
        resource_id,
        owner_user_id: fctx.member.id,
        start,
        duration_minutes,
        participant_id,
    })
}
