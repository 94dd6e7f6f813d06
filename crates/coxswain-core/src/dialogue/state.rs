//! Serializable per-conversation dialog state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a dialog currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogPhase {
    /// Waiting for an answer to the field at this index
    Collecting(usize),
    /// All fields collected; waiting for a yes/no on the summary
    Confirming,
    /// Confirmed; the terminal action may run
    Completed,
    /// Abandoned by the member or by the engine
    Cancelled,
}

impl DialogPhase {
    /// True for the two terminal phases.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// The state a dialog carries between conversation turns.
///
/// Owned exclusively by one in-flight conversation; mutated only by the
/// dialogue engine; discarded on completion or cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    /// Normalized values keyed by field name, plus any side values a
    /// validator recorded (entity identifiers and the like)
    pub values: HashMap<String, String>,
    pub phase: DialogPhase,
    /// Malformed replies so far in a bounded-attempt selection prompt
    pub attempt_count: u32,
    /// Labels of candidates offered by a selection prompt
    #[serde(default)]
    pub pending_candidates: Vec<String>,
}

impl DialogState {
    /// Fresh state positioned at the first field.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            phase: DialogPhase::Collecting(0),
            attempt_count: 0,
            pending_candidates: Vec::new(),
        }
    }

    /// The normalized value stored for a field, if any.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Stores a normalized value for a field.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

impl Default for DialogState {
    fn default() -> Self {
        Self::new()
    }
}
