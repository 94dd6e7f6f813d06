//! Field and form definitions, and the state machine that drives them.

use super::state::{DialogPhase, DialogState};
use super::{is_cancel, parse_yes_no};
use std::collections::HashMap;

/// Result of running a field validator over a raw reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// The reply was understood; store the normalized value
    Valid {
        value: String,
        /// Extra values the validator resolved along the way (entity
        /// identifiers and the like), stored next to the field value
        side_values: Vec<(String, String)>,
    },
    /// The reply was not usable; re-prompt with this feedback
    Invalid { feedback: String },
}

impl Validation {
    pub fn valid(value: impl Into<String>) -> Self {
        Self::Valid {
            value: value.into(),
            side_values: Vec::new(),
        }
    }

    pub fn valid_with(value: impl Into<String>, side_values: Vec<(String, String)>) -> Self {
        Self::Valid {
            value: value.into(),
            side_values,
        }
    }

    pub fn invalid(feedback: impl Into<String>) -> Self {
        Self::Invalid {
            feedback: feedback.into(),
        }
    }
}

type Validator<C> = Box<dyn Fn(&C, &DialogState, &str) -> Validation + Send + Sync>;
type SummaryFn<C> = Box<dyn Fn(&C, &DialogState) -> String + Send + Sync>;

/// One slot in a form: a name, the prompt shown when it is missing, and
/// the validator applied to replies.
pub struct FormField<C> {
    pub name: &'static str,
    pub prompt: String,
    validator: Validator<C>,
}

/// What the engine wants the caller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStep {
    /// Send this text to the member and wait for their reply
    Prompt(String),
    /// The member confirmed; run the terminal action on the collected
    /// values
    Completed,
    /// The dialog was abandoned
    Cancelled,
}

/// An ordered set of fields plus the confirmation summary.
///
/// Definitions are cheap to rebuild and are reconstructed on every turn;
/// all conversation state lives in [`DialogState`].
pub struct FormDefinition<C> {
    fields: Vec<FormField<C>>,
    summary: SummaryFn<C>,
}

/// Builder for [`FormDefinition`], an explicit ordered list of
/// `{name, prompt, validator}` tuples.
pub struct FormBuilder<C> {
    fields: Vec<FormField<C>>,
}

impl<C> FormBuilder<C> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field. Order of calls is the order of prompting.
    pub fn field(
        mut self,
        name: &'static str,
        prompt: impl Into<String>,
        validator: impl Fn(&C, &DialogState, &str) -> Validation + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FormField {
            name,
            prompt: prompt.into(),
            validator: Box::new(validator),
        });
        self
    }

    /// Finishes the form with the confirmation summary builder.
    pub fn summary(
        self,
        summary: impl Fn(&C, &DialogState) -> String + Send + Sync + 'static,
    ) -> FormDefinition<C> {
        FormDefinition {
            fields: self.fields,
            summary: Box::new(summary),
        }
    }
}

impl<C> Default for FormBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> FormDefinition<C> {
    /// Starts (or re-enters) the dialog.
    ///
    /// Pre-filled values from the initial entity extraction are validated
    /// once; an invalid pre-fill is dropped, and when its field comes up
    /// for prompting the validator's feedback rides along so the member
    /// learns why their original wording didn't take. Returns the first
    /// prompt, or goes straight to confirmation when every field is
    /// already filled.
    pub fn begin(
        &self,
        ctx: &C,
        state: &mut DialogState,
        prefilled: &HashMap<String, String>,
    ) -> FormStep {
        let mut rejected: HashMap<&'static str, String> = HashMap::new();
        for field in &self.fields {
            if state.value(field.name).is_some() {
                continue;
            }
            let Some(raw) = prefilled.get(field.name) else {
                continue;
            };
            match (field.validator)(ctx, state, raw) {
                Validation::Valid { value, side_values } => {
                    state.set_value(field.name, value);
                    for (name, value) in side_values {
                        state.set_value(name, value);
                    }
                }
                Validation::Invalid { feedback } => {
                    rejected.insert(field.name, feedback);
                }
            }
        }

        for (index, field) in self.fields.iter().enumerate() {
            if state.value(field.name).is_none() {
                state.phase = DialogPhase::Collecting(index);
                let prompt = match rejected.remove(field.name) {
                    Some(feedback) => format!("{}\n{}", feedback, field.prompt),
                    None => field.prompt.clone(),
                };
                return FormStep::Prompt(prompt);
            }
        }
        state.phase = DialogPhase::Confirming;
        FormStep::Prompt((self.summary)(ctx, state))
    }

    /// Feeds a member reply into the dialog and returns the next step.
    pub fn handle_reply(&self, ctx: &C, state: &mut DialogState, input: &str) -> FormStep {
        if is_cancel(input) && !state.phase.is_terminal() {
            state.phase = DialogPhase::Cancelled;
            return FormStep::Cancelled;
        }

        match state.phase.clone() {
            DialogPhase::Collecting(index) => {
                let Some(field) = self.fields.get(index) else {
                    // A rebuilt form shrank underneath the stored index
                    return self.advance(ctx, state);
                };
                match (field.validator)(ctx, state, input) {
                    Validation::Valid { value, side_values } => {
                        state.set_value(field.name, value);
                        for (name, value) in side_values {
                            state.set_value(name, value);
                        }
                        self.advance(ctx, state)
                    }
                    Validation::Invalid { feedback } => {
                        FormStep::Prompt(format!("{}\n{}", feedback, field.prompt))
                    }
                }
            }
            DialogPhase::Confirming => match parse_yes_no(input) {
                Some(true) => {
                    state.phase = DialogPhase::Completed;
                    FormStep::Completed
                }
                Some(false) => {
                    state.phase = DialogPhase::Cancelled;
                    FormStep::Cancelled
                }
                None => FormStep::Prompt(format!(
                    "Please answer yes or no.\n{}",
                    (self.summary)(ctx, state)
                )),
            },
            DialogPhase::Completed => FormStep::Completed,
            DialogPhase::Cancelled => FormStep::Cancelled,
        }
    }

    /// Moves to the first unfilled field, or to confirmation when none
    /// remain.
    fn advance(&self, ctx: &C, state: &mut DialogState) -> FormStep {
        for (index, field) in self.fields.iter().enumerate() {
            if state.value(field.name).is_none() {
                state.phase = DialogPhase::Collecting(index);
                return FormStep::Prompt(field.prompt.clone());
            }
        }
        state.phase = DialogPhase::Confirming;
        FormStep::Prompt((self.summary)(ctx, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_form() -> FormDefinition<()> {
        FormBuilder::new()
            .field("count", "How many seats?", |_, _, input| {
                match input.trim().parse::<u32>() {
                    Ok(n) if n > 0 => Validation::valid(n.to_string()),
                    _ => Validation::invalid("I need a positive number."),
                }
            })
            .field("color", "What color?", |_, _, input| {
                let color = input.trim().to_lowercase();
                if color.is_empty() {
                    Validation::invalid("I didn't catch a color.")
                } else {
                    Validation::valid(color)
                }
            })
            .summary(|_, state| {
                format!(
                    "{} seats, {}. Shall I go ahead? (yes/no)",
                    state.value("count").unwrap_or("?"),
                    state.value("color").unwrap_or("?")
                )
            })
    }

    #[test]
    fn test_prompts_in_field_order() {
        let form = number_form();
        let mut state = DialogState::new();

        let step = form.begin(&(), &mut state, &HashMap::new());
        assert_eq!(step, FormStep::Prompt("How many seats?".to_string()));

        let step = form.handle_reply(&(), &mut state, "2");
        assert_eq!(step, FormStep::Prompt("What color?".to_string()));
        assert_eq!(state.value("count"), Some("2"));
    }

    #[test]
    fn test_invalid_reply_reprompts_without_advancing() {
        let form = number_form();
        let mut state = DialogState::new();
        form.begin(&(), &mut state, &HashMap::new());

        let step = form.handle_reply(&(), &mut state, "a few");
        assert_eq!(
            step,
            FormStep::Prompt("I need a positive number.\nHow many seats?".to_string())
        );
        assert_eq!(state.phase, DialogPhase::Collecting(0));
        // No attempt limit for field entry
        let step = form.handle_reply(&(), &mut state, "several");
        assert!(matches!(step, FormStep::Prompt(_)));
        assert_eq!(state.phase, DialogPhase::Collecting(0));
    }

    #[test]
    fn test_valid_prefill_skips_prompt() {
        let form = number_form();
        let mut state = DialogState::new();
        let mut prefilled = HashMap::new();
        prefilled.insert("count".to_string(), "4".to_string());

        let step = form.begin(&(), &mut state, &prefilled);
        assert_eq!(step, FormStep::Prompt("What color?".to_string()));
        assert_eq!(state.value("count"), Some("4"));
    }

    #[test]
    fn test_invalid_prefill_is_dropped_with_feedback() {
        let form = number_form();
        let mut state = DialogState::new();
        let mut prefilled = HashMap::new();
        prefilled.insert("count".to_string(), "lots".to_string());

        let step = form.begin(&(), &mut state, &prefilled);
        assert_eq!(
            step,
            FormStep::Prompt("I need a positive number.\nHow many seats?".to_string())
        );
        assert_eq!(state.value("count"), None);
        assert_eq!(state.phase, DialogPhase::Collecting(0));
    }

    #[test]
    fn test_full_run_to_completion() {
        let form = number_form();
        let mut state = DialogState::new();
        form.begin(&(), &mut state, &HashMap::new());
        form.handle_reply(&(), &mut state, "2");
        let step = form.handle_reply(&(), &mut state, "green");
        assert_eq!(
            step,
            FormStep::Prompt("2 seats, green. Shall I go ahead? (yes/no)".to_string())
        );
        assert_eq!(state.phase, DialogPhase::Confirming);

        let step = form.handle_reply(&(), &mut state, "yes");
        assert_eq!(step, FormStep::Completed);
        assert_eq!(state.phase, DialogPhase::Completed);
    }

    #[test]
    fn test_decline_at_confirmation_cancels() {
        let form = number_form();
        let mut state = DialogState::new();
        form.begin(&(), &mut state, &HashMap::new());
        form.handle_reply(&(), &mut state, "2");
        form.handle_reply(&(), &mut state, "green");

        let step = form.handle_reply(&(), &mut state, "no");
        assert_eq!(step, FormStep::Cancelled);
        assert_eq!(state.phase, DialogPhase::Cancelled);
    }

    #[test]
    fn test_garbled_confirmation_reprompts() {
        let form = number_form();
        let mut state = DialogState::new();
        form.begin(&(), &mut state, &HashMap::new());
        form.handle_reply(&(), &mut state, "2");
        form.handle_reply(&(), &mut state, "green");

        let step = form.handle_reply(&(), &mut state, "maybe");
        assert!(matches!(step, FormStep::Prompt(ref p) if p.starts_with("Please answer yes or no.")));
        assert_eq!(state.phase, DialogPhase::Confirming);
    }

    #[test]
    fn test_cancel_token_from_any_collecting_state() {
        for answered_first in [false, true] {
            let form = number_form();
            let mut state = DialogState::new();
            form.begin(&(), &mut state, &HashMap::new());
            if answered_first {
                form.handle_reply(&(), &mut state, "2");
            }
            let step = form.handle_reply(&(), &mut state, "quit");
            assert_eq!(step, FormStep::Cancelled);
            assert_eq!(state.phase, DialogPhase::Cancelled);
        }
    }

    #[test]
    fn test_cancel_token_while_confirming() {
        let form = number_form();
        let mut state = DialogState::new();
        form.begin(&(), &mut state, &HashMap::new());
        form.handle_reply(&(), &mut state, "2");
        form.handle_reply(&(), &mut state, "green");

        let step = form.handle_reply(&(), &mut state, "QUIT");
        assert_eq!(step, FormStep::Cancelled);
        assert_eq!(state.phase, DialogPhase::Cancelled);
    }
}
