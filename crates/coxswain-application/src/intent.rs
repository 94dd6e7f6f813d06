//! The consumed recognizer interface.
//!
//! The natural-language recognizer lives outside this system; what
//! arrives here is its output: an intent name plus a list of typed
//! entity spans. These types are that contract.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Intents the reservation workflow handles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum Intent {
    CreateReservation,
    CheckBoatAvailability,
    CheckReservations,
    CancelReservation,
    Checkin,
    Checkout,
    Help,
    /// Recognizer produced nothing usable
    None,
}

/// Entity types the workflow consumes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum EntityKind {
    BoatName,
    UserName,
    StartDate,
    StartTime,
    Duration,
}

/// One recognized span: the raw text plus the recognizer's normalized
/// reading of it, when it produced one (ISO date, minute count, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub text: String,
    #[serde(default)]
    pub resolved: Option<String>,
}

impl Entity {
    pub fn new(kind: EntityKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            resolved: None,
        }
    }

    pub fn with_resolved(mut self, resolved: impl Into<String>) -> Self {
        self.resolved = Some(resolved.into());
        self
    }

    /// The normalized reading when present, otherwise the raw text.
    pub fn value(&self) -> &str {
        self.resolved.as_deref().unwrap_or(&self.text)
    }
}

/// One utterance's worth of recognizer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedIntent {
    pub intent: Intent,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl RecognizedIntent {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            entities: Vec::new(),
        }
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// First entity of the given kind, if any.
    pub fn entity(&self, kind: EntityKind) -> Option<&Entity> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    /// The words of the first entity of the given kind, lower-cased.
    pub fn entity_words(&self, kind: EntityKind) -> Vec<String> {
        self.entity(kind)
            .map(|e| {
                e.text
                    .split_whitespace()
                    .map(|w| w.to_lowercase())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_intent_round_trips_through_names() {
        assert_eq!(Intent::CreateReservation.to_string(), "CreateReservation");
        assert_eq!(
            Intent::from_str("CancelReservation").unwrap(),
            Intent::CancelReservation
        );
        assert!(Intent::from_str("MakeCoffee").is_err());
    }

    #[test]
    fn test_entity_value_prefers_resolved() {
        let entity = Entity::new(EntityKind::StartDate, "next tuesday").with_resolved("2026-08-11");
        assert_eq!(entity.value(), "2026-08-11");
        assert_eq!(Entity::new(EntityKind::BoatName, "pinta").value(), "pinta");
    }

    #[test]
    fn test_entity_words() {
        let recognized = RecognizedIntent::new(Intent::CreateReservation)
            .with_entity(Entity::new(EntityKind::BoatName, "Santa  Maria"));
        assert_eq!(
            recognized.entity_words(EntityKind::BoatName),
            vec!["santa", "maria"]
        );
        assert!(recognized.entity_words(EntityKind::UserName).is_empty());
    }
}
