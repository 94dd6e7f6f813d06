//! Conversation context carried between turns.

use coxswain_core::dialogue::DialogState;
use coxswain_core::session::UserSession;
use serde::{Deserialize, Serialize};

/// Which direction a pending check-in/check-out selection is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckDirection {
    In,
    Out,
}

/// A dialog waiting on the member's next message.
///
/// Serializable so the chat transport can persist conversations however
/// it likes; validators and prompts are rebuilt from code each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActiveDialog {
    /// Slot-filling reservation form
    Create(DialogState),
    /// Single-candidate cancel confirmation
    CancelConfirm {
        reference: String,
        description: String,
    },
    /// Multi-candidate cancel selection
    CancelSelect {
        state: DialogState,
        references: Vec<String>,
    },
    /// Multi-candidate check-in/check-out selection
    CheckSelect {
        state: DialogState,
        references: Vec<String>,
        direction: CheckDirection,
    },
}

/// Everything one conversation carries: who the member is, and whatever
/// dialog is waiting on their reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session: UserSession,
    #[serde(default)]
    pub dialog: Option<ActiveDialog>,
}

impl ConversationContext {
    pub fn new(session: UserSession) -> Self {
        Self {
            session,
            dialog: None,
        }
    }
}
