//! REST client for the external scheduling service.
//!
//! One client per tenant. Every call rides on a session token obtained
//! from the authentication endpoint; the client tracks token freshness
//! and signs in again shortly before the server-declared expiry.

use crate::dto::{
    AuthenticateRequest, AuthenticateResponse, CreateReservationRequest,
    CreateReservationResponse, ErrorEnvelope, GroupDto, GroupsResponse, ReservationDto,
    ReservationsResponse, ResourcesResponse, UsersResponse, format_wire_datetime,
};
use crate::error::{Result, SchedulingError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use coxswain_core::model::{
    GroupId, NewReservation, Reservation, ReservationFilter, Resource, SchedGroup, SchedUser,
    UserId,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

/// Tokens are treated as expired this long before the server says so, to
/// avoid racing the real expiry mid-request.
const SESSION_EXPIRY_MARGIN_MINUTES: i64 = 2;

const SESSION_TOKEN_HEADER: &str = "X-Booked-SessionToken";
const USER_ID_HEADER: &str = "X-Booked-UserId";

/// The operations the reservation engine needs from the scheduling
/// service. [`SchedulingClient`] is the production implementation; tests
/// substitute mocks.
#[async_trait]
pub trait SchedulingApi: Send + Sync {
    /// Discards any cached session and authenticates from scratch.
    async fn sign_in(&self) -> Result<()>;

    /// Lists all resources with their attributes.
    async fn list_resources(&self) -> Result<Vec<Resource>>;

    /// Lists all members. Summary records only; permissions and groups
    /// come from [`SchedulingApi::get_user`].
    async fn list_users(&self) -> Result<Vec<SchedUser>>;

    /// Fetches one member's full detail record.
    async fn get_user(&self, id: UserId) -> Result<SchedUser>;

    /// Lists all permission groups. Summary records only.
    async fn list_groups(&self) -> Result<Vec<SchedGroup>>;

    /// Fetches one group's full detail record.
    async fn get_group(&self, id: GroupId) -> Result<SchedGroup>;

    /// Lists reservations matching the filter.
    async fn get_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>>;

    /// Books a reservation. A refusal from the service surfaces as
    /// [`SchedulingError::Rejected`] carrying the server's message.
    async fn create_reservation(&self, request: &NewReservation) -> Result<Reservation>;

    /// Cancels a reservation by reference.
    async fn delete_reservation(&self, reference: &str) -> Result<()>;

    /// Marks a reservation's outing as started.
    async fn check_in(&self, reference: &str) -> Result<()>;

    /// Marks a reservation's outing as finished.
    async fn check_out(&self, reference: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct SessionState {
    token: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
}

impl SessionState {
    fn is_current(&self, now: DateTime<Utc>) -> bool {
        now + Duration::minutes(SESSION_EXPIRY_MARGIN_MINUTES) < self.expires_at
    }
}

/// Production [`SchedulingApi`] implementation over HTTPS.
pub struct SchedulingClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    session: Mutex<Option<SessionState>>,
}

impl SchedulingClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            session: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Returns a current session, signing in if none is held or the held
    /// one is within the expiry margin. Sign-ins are serialized by the
    /// session lock.
    async fn ensure_session(&self) -> Result<SessionState> {
        let mut guard = self.session.lock().await;
        if let Some(state) = guard.as_ref() {
            if state.is_current(Utc::now()) {
                return Ok(state.clone());
            }
        }

        let response = self
            .http
            .post(self.url("Authentication/Authenticate"))
            .json(&AuthenticateRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let auth: AuthenticateResponse = response
            .json()
            .await
            .map_err(|e| SchedulingError::decode(e.to_string()))?;

        if !auth.is_authenticated {
            let message = auth
                .message
                .unwrap_or_else(|| "credentials refused".to_string());
            return Err(SchedulingError::Auth(message));
        }
        let token = auth
            .session_token
            .ok_or_else(|| SchedulingError::decode("authenticated response without token"))?;
        let user_id = auth
            .user_id
            .ok_or_else(|| SchedulingError::decode("authenticated response without user id"))?;
        let expires_at = auth
            .session_expires
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let state = SessionState {
            token,
            user_id,
            expires_at,
        };
        tracing::debug!(
            "[SchedulingClient] Signed in as user {} (token expires {})",
            state.user_id,
            state.expires_at
        );
        *guard = Some(state.clone());
        Ok(state)
    }

    /// Maps a non-success response to a typed error, preferring the
    /// server's structured payload when one is present.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(ErrorEnvelope::into_message);

        match (status, message) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, msg) => Err(SchedulingError::Auth(
                msg.unwrap_or_else(|| status.to_string()),
            )),
            (StatusCode::NOT_FOUND, msg) => Err(SchedulingError::NotFound(
                msg.unwrap_or_else(|| status.to_string()),
            )),
            (_, Some(message)) => Err(SchedulingError::Api {
                status: status.as_u16(),
                message,
            }),
            (_, None) => Err(SchedulingError::transport(format!(
                "HTTP {} with no structured error payload",
                status
            ))),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let session = self.ensure_session().await?;
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .header(SESSION_TOKEN_HEADER, &session.token)
            .header(USER_ID_HEADER, session.user_id.to_string())
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| SchedulingError::decode(e.to_string()))
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let session = self.ensure_session().await?;
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .header(SESSION_TOKEN_HEADER, &session.token)
            .header(USER_ID_HEADER, session.user_id.to_string())
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| SchedulingError::decode(e.to_string()))
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        let session = self.ensure_session().await?;
        let response = self
            .http
            .post(self.url(path))
            .header(SESSION_TOKEN_HEADER, &session.token)
            .header(USER_ID_HEADER, session.user_id.to_string())
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl SchedulingApi for SchedulingClient {
    async fn sign_in(&self) -> Result<()> {
        {
            let mut guard = self.session.lock().await;
            *guard = None;
        }
        self.ensure_session().await?;
        Ok(())
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        let response: ResourcesResponse = self.get_json("Resources/", &[]).await?;
        Ok(response.resources.into_iter().map(Resource::from).collect())
    }

    async fn list_users(&self) -> Result<Vec<SchedUser>> {
        let response: UsersResponse = self.get_json("Users/", &[]).await?;
        Ok(response.users.into_iter().map(SchedUser::from).collect())
    }

    async fn get_user(&self, id: UserId) -> Result<SchedUser> {
        let dto: crate::dto::UserDto = self.get_json(&format!("Users/{}", id), &[]).await?;
        Ok(dto.into())
    }

    async fn list_groups(&self) -> Result<Vec<SchedGroup>> {
        let response: GroupsResponse = self.get_json("Groups/", &[]).await?;
        Ok(response.groups.into_iter().map(SchedGroup::from).collect())
    }

    async fn get_group(&self, id: GroupId) -> Result<SchedGroup> {
        let dto: GroupDto = self.get_json(&format!("Groups/{}", id), &[]).await?;
        Ok(dto.into())
    }

    async fn get_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(user_id) = filter.user_id {
            query.push(("userId", user_id.to_string()));
        }
        if let Some(resource_id) = filter.resource_id {
            query.push(("resourceId", resource_id.to_string()));
        }
        if let Some(start) = filter.start {
            query.push(("startDateTime", format_wire_datetime(start)));
        }
        if let Some(end) = filter.end {
            query.push(("endDateTime", format_wire_datetime(end)));
        }

        let response: ReservationsResponse = self.get_json("Reservations/", &query).await?;
        response
            .reservations
            .into_iter()
            .map(Reservation::try_from)
            .collect()
    }

    async fn create_reservation(&self, request: &NewReservation) -> Result<Reservation> {
        let body = CreateReservationRequest {
            resource_id: request.resource_id,
            user_id: request.owner_user_id,
            start_date_time: format_wire_datetime(request.start),
            end_date_time: format_wire_datetime(request.end()),
            participants: request.participant_id.into_iter().collect(),
        };
        let created: CreateReservationResponse = self
            .post_json("Reservations/", &body)
            .await
            .map_err(|err| match err {
                // A 4xx with a structured payload is the service refusing
                // the booking; the member sees the server's wording
                SchedulingError::Api { status, message } if status < 500 => {
                    SchedulingError::rejected(message)
                }
                other => other,
            })?;

        let dto = ReservationDto {
            reference_number: created.reference_number,
            resource_id: request.resource_id,
            owner_user_id: request.owner_user_id,
            participant_ids: request.participant_id.into_iter().collect(),
            start_date_time: format_wire_datetime(request.start),
            end_date_time: format_wire_datetime(request.end()),
            check_in_date: None,
            check_out_date: None,
        };
        dto.try_into()
    }

    async fn delete_reservation(&self, reference: &str) -> Result<()> {
        let session = self.ensure_session().await?;
        let response = self
            .http
            .delete(self.url(&format!("Reservations/{}", reference)))
            .header(SESSION_TOKEN_HEADER, &session.token)
            .header(USER_ID_HEADER, session.user_id.to_string())
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_in(&self, reference: &str) -> Result<()> {
        self.post_empty(&format!("Reservations/{}/CheckIn", reference))
            .await
    }

    async fn check_out(&self, reference: &str) -> Result<()> {
        self.post_empty(&format!("Reservations/{}/CheckOut", reference))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry_margin() {
        let now = Utc::now();
        let state = SessionState {
            token: "t".to_string(),
            user_id: 1,
            expires_at: now + Duration::minutes(5),
        };
        assert!(state.is_current(now));
        // Within the two-minute margin the token counts as expired
        assert!(!state.is_current(now + Duration::minutes(3) + Duration::seconds(1)));
        assert!(!state.is_current(now + Duration::minutes(10)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SchedulingClient::new("https://sched.example/api/", "bot", "pw");
        assert_eq!(
            client.url("Resources/"),
            "https://sched.example/api/Resources/"
        );
    }
}
