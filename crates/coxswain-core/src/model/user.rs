//! Club members as known to the scheduling service.

use super::group::GroupId;
use super::resource::ResourceId;
use serde::{Deserialize, Serialize};

/// Identifier assigned to a user by the scheduling service.
pub type UserId = i64;

/// A club member record from the scheduling service.
///
/// Same ownership and lifecycle as [`super::Resource`]: an immutable
/// snapshot replaced wholesale on each roster refresh. The summary
/// records returned by the user list endpoint leave `permissions` and
/// `group_ids` empty; the per-user detail fetch fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedUser {
    /// Identifier assigned by the scheduling service
    pub id: UserId,
    /// Login name, also used to link chat identities to members
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    /// IANA timezone name, when the member has one configured
    #[serde(default)]
    pub timezone: Option<String>,
    /// Resources this member may book directly
    #[serde(default)]
    pub permissions: Vec<ResourceId>,
    /// Permission groups the member belongs to
    #[serde(default)]
    pub group_ids: Vec<GroupId>,
}

impl SchedUser {
    /// Display name: "First Last", falling back to the login name when
    /// both name parts are blank.
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim().to_string();
        if full.is_empty() {
            self.user_name.clone()
        } else {
            full
        }
    }

    /// True when this member may book the given resource directly.
    pub fn may_book(&self, resource_id: ResourceId) -> bool {
        self.permissions.contains(&resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_falls_back_to_user_name() {
        let user = SchedUser {
            id: 1,
            user_name: "crew7".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            timezone: None,
            permissions: vec![],
            group_ids: vec![],
        };
        assert_eq!(user.full_name(), "crew7");
    }

    #[test]
    fn test_full_name_joins_parts() {
        let user = SchedUser {
            id: 1,
            user_name: "crew7".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Shaw".to_string(),
            timezone: None,
            permissions: vec![],
            group_ids: vec![],
        };
        assert_eq!(user.full_name(), "Ada Shaw");
    }
}
