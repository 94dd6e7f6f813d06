//! Reservable boat resources.

use serde::{Deserialize, Serialize};

/// Identifier assigned to a resource by the scheduling service.
pub type ResourceId = i64;

/// A reservable boat as known to the scheduling service.
///
/// Instances are immutable snapshots owned by the tenant cache and are
/// replaced wholesale on each roster refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Identifier assigned by the scheduling service
    pub resource_id: ResourceId,
    /// Canonical display name ("Santa Maria")
    pub name: String,
    /// Additional names members use for this boat ("Pinto" for "Pinta")
    #[serde(default)]
    pub alternate_names: Vec<String>,
    /// RFID tag identifiers attached to the hull
    #[serde(default)]
    pub tag_ids: Vec<String>,
    /// Privately owned boats are exempt from club duration limits
    #[serde(default)]
    pub is_private: bool,
    /// Seat count; anything above one allows a partner
    pub max_participants: u32,
}

impl Resource {
    /// True when the boat seats more than one rower.
    pub fn is_multi_seat(&self) -> bool {
        self.max_participants > 1
    }

    /// All names this boat answers to: the canonical name plus any
    /// configured alternates.
    pub fn candidate_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.alternate_names.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boat() -> Resource {
        Resource {
            resource_id: 7,
            name: "Santa Maria".to_string(),
            alternate_names: vec!["The Flagship".to_string()],
            tag_ids: vec![],
            is_private: false,
            max_participants: 2,
        }
    }

    #[test]
    fn test_candidate_names_include_alternates() {
        let boat = boat();
        let names: Vec<&str> = boat.candidate_names().collect();
        assert_eq!(names, vec!["Santa Maria", "The Flagship"]);
    }

    #[test]
    fn test_multi_seat() {
        assert!(boat().is_multi_seat());

        let single = Resource {
            max_participants: 1,
            ..boat()
        };
        assert!(!single.is_multi_seat());
    }
}
