//! Slot-filling dialogue engine.
//!
//! A generic, field-ordered conversation state machine. A form is an
//! ordered list of named fields, each with a prompt and a validator; the
//! engine prompts for missing fields one at a time, validates answers,
//! asks for a final confirmation, and reports cancellation.
//!
//! Forms are rebuilt from code on every turn (validators are closures
//! over the current roster snapshot); only [`DialogState`] is carried
//! between turns, so it stays a plain serializable record.
//!
//! - `state`: The serializable per-conversation dialog state
//! - `form`: Field/form definitions and the driving state machine
//! - `selection`: The bounded-attempt numeric selection prompt

mod form;
mod selection;
mod state;

// Re-export public API
pub use form::{FormBuilder, FormDefinition, FormField, FormStep, Validation};
pub use selection::{SelectionPrompt, SelectionStep};
pub use state::{DialogPhase, DialogState};

/// Reserved input that abandons a dialog from any collecting or
/// confirming state.
pub const CANCEL_TOKEN: &str = "quit";

/// True when the input is the reserved cancel token.
pub fn is_cancel(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(CANCEL_TOKEN)
}

/// Loose yes/no reading for confirmation replies.
pub fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" | "yeah" | "yep" | "sure" | "ok" | "okay" => Some(true),
        "n" | "no" | "nope" | "nah" => Some(false),
        _ => None,
    }
}
