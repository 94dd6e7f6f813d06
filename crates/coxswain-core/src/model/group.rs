//! Permission groups.

use super::resource::ResourceId;
use serde::{Deserialize, Serialize};

/// Identifier assigned to a group by the scheduling service.
pub type GroupId = i64;

/// A permission group from the scheduling service.
///
/// Groups grant their members booking rights on a set of resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedGroup {
    /// Identifier assigned by the scheduling service
    pub id: GroupId,
    pub name: String,
    /// Resources bookable by members of this group
    #[serde(default)]
    pub permissions: Vec<ResourceId>,
}

impl SchedGroup {
    /// True when this group grants booking rights on the given resource.
    pub fn grants(&self, resource_id: ResourceId) -> bool {
        self.permissions.contains(&resource_id)
    }
}
