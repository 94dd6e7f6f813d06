//! Conversation-scoped member identity.

use crate::model::UserId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a session's roster link stays fresh before it is re-resolved.
const SESSION_FRESHNESS_DAYS: i64 = 2;

/// Identity and bookkeeping for one member's conversation.
///
/// Created on first contact, refreshed when stale, and kept for the
/// lifetime of the conversation. The chat transport owns persistence;
/// this model is what the workflow reads and updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    /// Which club this conversation belongs to
    pub tenant_id: String,
    /// The chat channel's identifier for this person
    pub external_user_id: String,
    /// The matching scheduling-service member, once resolved
    #[serde(default)]
    pub sched_user_id: Option<UserId>,
    /// IANA timezone name, copied from the member's roster record
    #[serde(default)]
    pub timezone: Option<String>,
    /// When the roster link was last confirmed
    pub last_refreshed: DateTime<Utc>,
    /// Whether the capability summary has been shown this conversation
    #[serde(default)]
    pub help_shown: bool,
}

impl UserSession {
    /// Creates a session for a first-contact member. The roster link is
    /// unresolved and marked stale so the first turn resolves it.
    pub fn new(tenant_id: impl Into<String>, external_user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            external_user_id: external_user_id.into(),
            sched_user_id: None,
            timezone: None,
            last_refreshed: DateTime::<Utc>::MIN_UTC,
            help_shown: false,
        }
    }

    /// True when the roster link should be re-resolved (older than two
    /// days, or never resolved at all).
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.sched_user_id.is_none()
            || now - self.last_refreshed > Duration::days(SESSION_FRESHNESS_DAYS)
    }

    /// Records a freshly resolved roster link.
    pub fn mark_refreshed(
        &mut self,
        sched_user_id: UserId,
        timezone: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.sched_user_id = Some(sched_user_id);
        self.timezone = timezone;
        self.last_refreshed = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_stale() {
        let session = UserSession::new("club-1", "skype:alice");
        assert!(session.is_stale(Utc::now()));
    }

    #[test]
    fn test_refreshed_session_is_fresh() {
        let now = Utc::now();
        let mut session = UserSession::new("club-1", "skype:alice");
        session.mark_refreshed(42, Some("America/Los_Angeles".to_string()), now);

        assert!(!session.is_stale(now));
        assert!(!session.is_stale(now + Duration::days(1)));
        assert!(session.is_stale(now + Duration::days(3)));
    }
}
