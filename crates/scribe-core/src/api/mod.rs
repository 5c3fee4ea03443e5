//! REST API client for the notes backend.
//!
//! [`AuthApi`] and [`NotesApi`] are the seams the session manager and note
//! store are written against; [`HttpApi`] is the reqwest implementation of
//! the backend contract. Error bodies are mined for a human message and,
//! on 422, a field-error map.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Note, NoteInput, User};
use crate::util::{compact_text, is_http_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Successful login/register response.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: User,
    pub access_token: String,
    /// Token lifetime in seconds, when the backend communicates one.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl std::fmt::Debug for AuthPayload {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthPayload")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    user: User,
}

/// Authentication endpoints.
pub trait AuthApi: Clone + Send + Sync + 'static {
    fn login(&self, request: &LoginRequest) -> impl Future<Output = Result<AuthPayload>> + Send;
    fn register(
        &self,
        payload: &RegisterPayload,
    ) -> impl Future<Output = Result<AuthPayload>> + Send;
    fn logout(&self, token: &str) -> impl Future<Output = Result<()>> + Send;
    fn verify(&self, token: &str) -> impl Future<Output = Result<User>> + Send;
}

/// Note CRUD endpoints. All calls carry the bearer token.
pub trait NotesApi: Clone + Send + Sync + 'static {
    fn list_notes(
        &self,
        token: &str,
        archived: bool,
    ) -> impl Future<Output = Result<Vec<Note>>> + Send;
    fn create_note(
        &self,
        token: &str,
        input: &NoteInput,
    ) -> impl Future<Output = Result<Note>> + Send;
    fn update_note(
        &self,
        token: &str,
        id: &str,
        input: &NoteInput,
    ) -> impl Future<Output = Result<Note>> + Send;
    fn delete_note(&self, token: &str, id: &str) -> impl Future<Output = Result<()>> + Send;
    fn set_archived(
        &self,
        token: &str,
        id: &str,
        archived: bool,
    ) -> impl Future<Output = Result<Note>> + Send;
    fn set_pinned(
        &self,
        token: &str,
        id: &str,
        pinned: bool,
    ) -> impl Future<Output = Result<Note>> + Send;
}

/// HTTP implementation of the backend contract.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.as_ref())?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { base_url, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn expect_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }
        Ok(response.json::<T>().await?)
    }

    async fn expect_ok(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }
        Ok(())
    }
}

impl AuthApi for HttpApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload> {
        self.expect_json(self.client.post(self.url("/auth/login")).json(request))
            .await
    }

    async fn register(&self, payload: &RegisterPayload) -> Result<AuthPayload> {
        self.expect_json(self.client.post(self.url("/auth/register")).json(payload))
            .await
    }

    async fn logout(&self, token: &str) -> Result<()> {
        self.expect_ok(self.client.post(self.url("/auth/logout")).bearer_auth(token))
            .await
    }

    async fn verify(&self, token: &str) -> Result<User> {
        let response: VerifyResponse = self
            .expect_json(self.client.get(self.url("/auth/verify")).bearer_auth(token))
            .await?;
        Ok(response.user)
    }
}

impl NotesApi for HttpApi {
    async fn list_notes(&self, token: &str, archived: bool) -> Result<Vec<Note>> {
        self.expect_json(
            self.client
                .get(self.url("/notes"))
                .query(&[("archived", archived)])
                .bearer_auth(token),
        )
        .await
    }

    async fn create_note(&self, token: &str, input: &NoteInput) -> Result<Note> {
        self.expect_json(self.client.post(self.url("/notes")).bearer_auth(token).json(input))
            .await
    }

    async fn update_note(&self, token: &str, id: &str, input: &NoteInput) -> Result<Note> {
        self.expect_json(
            self.client
                .put(self.url(&format!("/notes/{id}")))
                .bearer_auth(token)
                .json(input),
        )
        .await
    }

    async fn delete_note(&self, token: &str, id: &str) -> Result<()> {
        self.expect_ok(
            self.client
                .delete(self.url(&format!("/notes/{id}")))
                .bearer_auth(token),
        )
        .await
    }

    async fn set_archived(&self, token: &str, id: &str, archived: bool) -> Result<Note> {
        self.expect_json(
            self.client
                .patch(self.url(&format!("/notes/{id}/archive")))
                .bearer_auth(token)
                .json(&serde_json::json!({ "archived": archived })),
        )
        .await
    }

    async fn set_pinned(&self, token: &str, id: &str, pinned: bool) -> Result<Note> {
        self.expect_json(
            self.client
                .patch(self.url(&format!("/notes/{id}/pin")))
                .bearer_auth(token)
                .json(&serde_json::json!({ "pinned": pinned })),
        )
        .await
    }
}

/// Validate and normalize the API base URL (scheme required, no trailing `/`).
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::App("API base URL must not be empty".to_string()));
    }
    if !is_http_url(trimmed) {
        return Err(Error::App(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, String>>,
}

/// Map a non-success response onto the error taxonomy.
fn error_for_status(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let fields = parsed
        .as_ref()
        .and_then(|payload| payload.errors.clone())
        .unwrap_or_default();
    let message = parsed
        .and_then(|payload| payload.message.or(payload.msg).or(payload.error))
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let trimmed = compact_text(body);
            if trimmed.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                trimmed
            }
        });

    match status {
        StatusCode::UNAUTHORIZED => Error::Authentication(message),
        StatusCode::FORBIDDEN => Error::Authorization(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::UNPROCESSABLE_ENTITY => Error::Validation { message, fields },
        status if status.is_server_error() => Error::Server {
            status: status.as_u16(),
            message,
        },
        status => Error::App(format!("HTTP {}: {message}", status.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://api.example.com/ ").unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("   ").is_err());
        assert!(normalize_base_url("api.example.com").is_err());
    }

    #[test]
    fn status_codes_map_to_the_error_taxonomy() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, ""),
            Error::Authentication(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::FORBIDDEN, ""),
            Error::Authorization(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, ""),
            Error::NotFound(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, ""),
            Error::Server { status: 502, .. }
        ));
    }

    #[test]
    fn validation_errors_carry_the_field_map() {
        let body = r#"{"message":"Invalid note","errors":{"title":"Title is required"}}"#;
        let error = error_for_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        let Error::Validation { message, fields } = error else {
            panic!("expected validation error");
        };
        assert_eq!(message, "Invalid note");
        assert_eq!(
            fields.get("title").map(String::as_str),
            Some("Title is required")
        );
    }

    #[test]
    fn error_message_prefers_body_message_over_raw_text() {
        let error = error_for_status(StatusCode::UNAUTHORIZED, r#"{"error":"Token expired"}"#);
        assert_eq!(error.to_string(), "Authentication failed: Token expired");

        let fallback = error_for_status(StatusCode::UNAUTHORIZED, "");
        assert_eq!(fallback.to_string(), "Authentication failed: HTTP 401");
    }

    #[test]
    fn auth_payload_debug_redacts_token() {
        let payload = AuthPayload {
            user: User::default(),
            access_token: "secret-token".to_string(),
            expires_in: Some(3_600),
        };
        let rendered = format!("{payload:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
