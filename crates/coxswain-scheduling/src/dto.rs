//! Wire types for the scheduling REST API.
//!
//! The service speaks JSON with camelCase keys and wraps entity lists in
//! an envelope keyed by the plural noun (`{"resources": [...]}`). These
//! records deserialize that shape once and convert into the typed domain
//! model; nothing downstream touches raw JSON.

use crate::error::SchedulingError;
use chrono::NaiveDateTime;
use coxswain_core::model::{Reservation, Resource, SchedGroup, SchedUser};
use serde::{Deserialize, Serialize};

// ============================================================================
// Authentication
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub is_authenticated: bool,
    #[serde(default)]
    pub session_token: Option<String>,
    /// ISO 8601 timestamp for token expiry
    #[serde(default)]
    pub session_expires: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Structured error payload the service attaches to non-success
/// responses when it has something to say.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

impl ErrorEnvelope {
    /// Folds the payload into one human-readable message, or `None` when
    /// the payload carried nothing useful.
    pub fn into_message(self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(message) = self.message {
            if !message.trim().is_empty() {
                parts.push(message);
            }
        }
        if let Some(errors) = self.errors {
            parts.extend(errors.into_iter().filter(|e| !e.trim().is_empty()));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

// ============================================================================
// Entity envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserDto>,
}

#[derive(Debug, Deserialize)]
pub struct ResourcesResponse {
    pub resources: Vec<ResourceDto>,
}

#[derive(Debug, Deserialize)]
pub struct GroupsResponse {
    pub groups: Vec<GroupDto>,
}

#[derive(Debug, Deserialize)]
pub struct ReservationsResponse {
    pub reservations: Vec<ReservationDto>,
}

// ============================================================================
// Entities
// ============================================================================

/// Free-form attribute the club attaches to a resource in the scheduling
/// service's admin UI. Boat metadata the service has no native field for
/// (alternate names, privacy, RFID tags) travels this way.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAttributeDto {
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDto {
    pub resource_id: i64,
    pub name: String,
    #[serde(default = "default_max_participants")]
    pub max_participants: u32,
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttributeDto>,
}

fn default_max_participants() -> u32 {
    1
}

impl ResourceDto {
    fn attribute(&self, label: &str) -> Option<&str> {
        self.custom_attributes
            .iter()
            .find(|attr| attr.label.eq_ignore_ascii_case(label))
            .and_then(|attr| attr.value.as_deref())
            .filter(|value| !value.trim().is_empty())
    }
}

impl From<ResourceDto> for Resource {
    fn from(dto: ResourceDto) -> Self {
        let alternate_names = dto
            .attribute("Alternate names")
            .map(split_list)
            .unwrap_or_default();
        let tag_ids = dto.attribute("Tag ids").map(split_list).unwrap_or_default();
        let is_private = dto
            .attribute("Private")
            .map(|value| matches!(value.trim().to_lowercase().as_str(), "true" | "yes" | "1"))
            .unwrap_or(false);
        Resource {
            resource_id: dto.resource_id,
            name: dto.name,
            alternate_names,
            tag_ids,
            is_private,
            max_participants: dto.max_participants,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';', '\n'])
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Only present on the per-user detail record
    #[serde(default)]
    pub permissions: Vec<i64>,
    #[serde(default)]
    pub group_ids: Vec<i64>,
}

impl From<UserDto> for SchedUser {
    fn from(dto: UserDto) -> Self {
        SchedUser {
            id: dto.id,
            user_name: dto.user_name,
            first_name: dto.first_name,
            last_name: dto.last_name,
            timezone: dto.timezone,
            permissions: dto.permissions,
            group_ids: dto.group_ids,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    pub id: i64,
    pub name: String,
    /// Only present on the per-group detail record
    #[serde(default)]
    pub permissions: Vec<i64>,
}

impl From<GroupDto> for SchedGroup {
    fn from(dto: GroupDto) -> Self {
        SchedGroup {
            id: dto.id,
            name: dto.name,
            permissions: dto.permissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDto {
    pub reference_number: String,
    pub resource_id: i64,
    pub owner_user_id: i64,
    #[serde(default)]
    pub participant_ids: Vec<i64>,
    pub start_date_time: String,
    pub end_date_time: String,
    #[serde(default)]
    pub check_in_date: Option<String>,
    #[serde(default)]
    pub check_out_date: Option<String>,
}

impl TryFrom<ReservationDto> for Reservation {
    type Error = SchedulingError;

    fn try_from(dto: ReservationDto) -> Result<Self, Self::Error> {
        Ok(Reservation {
            reference_number: dto.reference_number,
            resource_id: dto.resource_id,
            owner_user_id: dto.owner_user_id,
            participant_ids: dto.participant_ids,
            start: parse_wire_datetime(&dto.start_date_time)?,
            end: parse_wire_datetime(&dto.end_date_time)?,
            check_in_date: dto
                .check_in_date
                .as_deref()
                .map(parse_wire_datetime)
                .transpose()?,
            check_out_date: dto
                .check_out_date
                .as_deref()
                .map(parse_wire_datetime)
                .transpose()?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub resource_id: i64,
    pub user_id: i64,
    pub start_date_time: String,
    pub end_date_time: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationResponse {
    pub reference_number: String,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parses the service's ISO 8601 timestamps into club-local wall-clock
/// time. Offsets are accepted and dropped; the service reports times in
/// the club's configured timezone.
pub fn parse_wire_datetime(raw: &str) -> Result<NaiveDateTime, SchedulingError> {
    if let Ok(with_offset) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| SchedulingError::decode(format!("unparseable timestamp '{}'", raw)))
}

/// Formats a club-local wall-clock time for the wire.
pub fn format_wire_datetime(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_attributes_extracted() {
        let dto: ResourceDto = serde_json::from_str(
            r#"{
                "resourceId": 5,
                "name": "Pinta",
                "maxParticipants": 2,
                "customAttributes": [
                    {"label": "Alternate names", "value": "Pinto, The Pint"},
                    {"label": "Private", "value": "true"},
                    {"label": "Tag ids", "value": "a1;b2"}
                ]
            }"#,
        )
        .unwrap();
        let resource: Resource = dto.into();

        assert_eq!(resource.resource_id, 5);
        assert_eq!(resource.alternate_names, vec!["Pinto", "The Pint"]);
        assert_eq!(resource.tag_ids, vec!["a1", "b2"]);
        assert!(resource.is_private);
        assert_eq!(resource.max_participants, 2);
    }

    #[test]
    fn test_resource_defaults_without_attributes() {
        let dto: ResourceDto =
            serde_json::from_str(r#"{"resourceId": 9, "name": "Nina"}"#).unwrap();
        let resource: Resource = dto.into();

        assert!(resource.alternate_names.is_empty());
        assert!(!resource.is_private);
        assert_eq!(resource.max_participants, 1);
    }

    #[test]
    fn test_reservation_timestamps_parse_with_and_without_offset() {
        let dto: ReservationDto = serde_json::from_str(
            r#"{
                "referenceNumber": "ref-1",
                "resourceId": 5,
                "ownerUserId": 11,
                "startDateTime": "2026-08-10T07:00:00+00:00",
                "endDateTime": "2026-08-10T08:00:00"
            }"#,
        )
        .unwrap();
        let reservation: Reservation = dto.try_into().unwrap();

        assert_eq!(
            reservation.start,
            NaiveDateTime::parse_from_str("2026-08-10T07:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
        );
        assert_eq!(reservation.duration_minutes(), 60);
    }

    #[test]
    fn test_error_envelope_folds_messages() {
        let envelope: ErrorEnvelope = serde_json::from_str(
            r#"{"message": "Reservation conflicts", "errors": ["Pinta is already booked."]}"#,
        )
        .unwrap();
        assert_eq!(
            envelope.into_message().unwrap(),
            "Reservation conflicts Pinta is already booked."
        );

        let empty: ErrorEnvelope = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(empty.into_message(), None);
    }
}
