//! Bounded-attempt numeric selection prompt.
//!
//! Used to disambiguate among several candidates (for example, choosing
//! which of several same-day reservations to cancel). Unlike field
//! entry, malformed replies here are bounded: the third strike abandons
//! the dialog.

use super::is_cancel;
use super::state::{DialogPhase, DialogState};

/// Malformed replies tolerated before the dialog is abandoned.
pub const MAX_SELECTION_ATTEMPTS: u32 = 3;

/// A numbered list of options with a trailing "none of the above".
pub struct SelectionPrompt {
    intro: String,
    options: Vec<String>,
    none_label: String,
}

/// What a selection reply resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStep {
    /// A real option (zero-based index)
    Chosen(usize),
    /// The trailing opt-out entry
    NoneOfTheAbove,
    /// Malformed reply; send this text and wait again
    Retry(String),
    /// Third malformed reply; the dialog is abandoned
    TooManyAttempts,
    /// The member sent the cancel token
    Cancelled,
}

impl SelectionPrompt {
    pub fn new(intro: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            intro: intro.into(),
            options,
            none_label: "None of the above".to_string(),
        }
    }

    /// Number of real options (excluding "none of the above").
    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Renders the numbered list. The opt-out entry is always the last
    /// index, one past the real options.
    pub fn render(&self) -> String {
        let mut lines = vec![self.intro.clone()];
        for (index, option) in self.options.iter().enumerate() {
            lines.push(format!("  {}. {}", index + 1, option));
        }
        lines.push(format!("  {}. {}", self.options.len() + 1, self.none_label));
        lines.push("Please reply with a number.".to_string());
        lines.join("\n")
    }

    /// Feeds a member reply into the prompt.
    ///
    /// Valid replies are the numbers 1 through N+1. Anything else counts
    /// toward the attempt budget; the third strike returns
    /// [`SelectionStep::TooManyAttempts`] and cancels the dialog.
    pub fn handle_reply(&self, state: &mut DialogState, input: &str) -> SelectionStep {
        if is_cancel(input) {
            state.phase = DialogPhase::Cancelled;
            return SelectionStep::Cancelled;
        }

        if let Ok(choice) = input.trim().trim_end_matches('.').parse::<usize>() {
            if (1..=self.options.len()).contains(&choice) {
                return SelectionStep::Chosen(choice - 1);
            }
            if choice == self.options.len() + 1 {
                state.phase = DialogPhase::Cancelled;
                return SelectionStep::NoneOfTheAbove;
            }
        }

        state.attempt_count += 1;
        if state.attempt_count >= MAX_SELECTION_ATTEMPTS {
            state.phase = DialogPhase::Cancelled;
            return SelectionStep::TooManyAttempts;
        }
        SelectionStep::Retry(format!(
            "I didn't understand that.\n{}",
            self.render()
        ))
    }
}
