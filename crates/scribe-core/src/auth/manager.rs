//! Session lifecycle manager.
//!
//! Orchestrates login/register/logout/verify flows over the [`AuthApi`],
//! decides whether a stored session may auto-restore on startup, and keeps
//! the persisted credential/session bookkeeping clean. A stored token is
//! never trusted without server confirmation.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use regex::Regex;
use uuid::Uuid;

use crate::api::{AuthApi, AuthPayload, LoginRequest, RegisterPayload};
use crate::auth::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::models::session::{prune_history, push_history};
use crate::models::{LoginMethod, Session, User};
use crate::storage::{keys, KeyValueStore, StorageResult};
use crate::util::unix_timestamp_ms;

/// Default period for the scheduled credential cleanup.
pub const CLEANUP_PERIOD: Duration = Duration::from_secs(60 * 60);

const PASSWORD_MIN_CHARS: usize = 6;

/// Lifecycle of the manager itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Uninitialized,
    Initializing,
    Authenticated,
    Anonymous,
    Terminated,
}

/// Registration form input, validated client-side before any network call.
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Outcome of a successful login/register/restore.
#[derive(Clone, PartialEq)]
pub struct AuthSuccess {
    pub user: User,
    pub token: String,
}

impl std::fmt::Debug for AuthSuccess {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthSuccess")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Session lifecycle manager over an auth backend and a persistence seam.
#[derive(Debug, Clone)]
pub struct AuthManager<A: AuthApi, S: KeyValueStore> {
    api: A,
    credentials: CredentialStore<S>,
    store: S,
    state: Arc<Mutex<AuthState>>,
}

impl<A: AuthApi, S: KeyValueStore> AuthManager<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Self {
            api,
            credentials: CredentialStore::new(store.clone()),
            store,
            state: Arc::new(Mutex::new(AuthState::Uninitialized)),
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore<S> {
        &self.credentials
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: AuthState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// One-time startup work: migrate legacy credentials, make sure a device
    /// fingerprint exists, and run an initial cleanup pass.
    pub fn initialize(&self) -> Result<()> {
        self.set_state(AuthState::Initializing);
        self.credentials.migrate_legacy_token()?;
        self.ensure_fingerprint()?;
        self.cleanup()?;
        Ok(())
    }

    /// Schedule [`Self::cleanup`] to run periodically until the handle is
    /// dropped or aborted.
    pub fn spawn_periodic_cleanup(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; initialize() already cleaned.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = manager.cleanup() {
                    tracing::warn!(%error, "periodic credential cleanup failed");
                }
            }
        })
    }

    /// Auto-login is offered only when remember-me is set and both a
    /// non-expired token and a user record exist. The token still has to be
    /// confirmed by the server before it is trusted.
    pub fn should_auto_login(&self) -> Result<bool> {
        if !self.credentials.remember_me()? {
            return Ok(false);
        }
        Ok(self.credentials.get_token()?.is_some() && self.credentials.get_user()?.is_some())
    }

    pub async fn login(&self, email: &str, password: &str, remember: bool) -> Result<AuthSuccess> {
        validate_login(email, password)?;

        let payload = self
            .api
            .login(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .await?;

        self.persist_credentials(&payload, remember)?;
        self.start_session(&payload.user.id, LoginMethod::Manual)?;
        self.set_state(AuthState::Authenticated);
        tracing::info!(user = %payload.user.id, "logged in");
        Ok(AuthSuccess {
            user: payload.user,
            token: payload.access_token,
        })
    }

    pub async fn register(&self, request: &RegisterRequest, remember: bool) -> Result<AuthSuccess> {
        validate_registration(request)?;

        let payload = self
            .api
            .register(&RegisterPayload {
                email: request.email.trim().to_string(),
                password: request.password.clone(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
            })
            .await?;

        self.persist_credentials(&payload, remember)?;
        self.start_session(&payload.user.id, LoginMethod::Manual)?;
        self.set_state(AuthState::Authenticated);
        tracing::info!(user = %payload.user.id, "registered");
        Ok(AuthSuccess {
            user: payload.user,
            token: payload.access_token,
        })
    }

    /// Best-effort server notification, then unconditional local teardown.
    pub async fn logout(&self) -> Result<()> {
        // End the session first: the buffered token read below may clear
        // storage on its own when the token is about to expire.
        self.end_current_session()?;
        if let Some(token) = self.credentials.get_token()? {
            if let Err(error) = self.api.logout(&token).await {
                tracing::warn!(%error, "logout notification failed; clearing local state anyway");
            }
        }
        self.credentials.clear_auth_data()?;
        self.set_state(AuthState::Anonymous);
        tracing::info!("logged out");
        Ok(())
    }

    /// Re-validate the stored token with the server. Any failure clears all
    /// local auth state before the error propagates: a token that failed
    /// verification is never left behind.
    pub async fn verify_token(&self) -> Result<User> {
        let Some(token) = self.credentials.get_token()? else {
            self.force_anonymous()?;
            return Err(Error::Authentication("no stored token".to_string()));
        };

        match self.api.verify(&token).await {
            Ok(user) => {
                self.credentials.set_user(&user)?;
                self.touch_session()?;
                self.set_state(AuthState::Authenticated);
                Ok(user)
            }
            Err(error) => {
                tracing::warn!(%error, "token verification failed, clearing auth state");
                self.force_anonymous()?;
                Err(error)
            }
        }
    }

    /// Startup restore: auto-login candidates are verified against the
    /// server; anything less falls back to anonymous.
    pub async fn restore_auth_state(&self) -> Result<Option<User>> {
        self.set_state(AuthState::Initializing);
        if !self.should_auto_login()? {
            self.set_state(AuthState::Anonymous);
            return Ok(None);
        }
        match self.verify_token().await {
            Ok(user) => {
                self.start_session(&user.id, LoginMethod::Auto)?;
                Ok(Some(user))
            }
            Err(error) => {
                tracing::info!(%error, "auto-login rejected, continuing anonymously");
                Ok(None)
            }
        }
    }

    /// Idempotent housekeeping: clear expired credentials, prune old session
    /// history, keep the current session's activity stamp fresh.
    pub fn cleanup(&self) -> Result<()> {
        if self.credentials.is_token_expired()? {
            self.end_current_session()?;
            self.credentials.clear_auth_data()?;
            if self.state() == AuthState::Authenticated {
                self.set_state(AuthState::Anonymous);
            }
        }

        let mut history = self.session_history()?;
        let before = history.len();
        prune_history(&mut history, unix_timestamp_ms());
        if history.len() != before {
            tracing::debug!(pruned = before - history.len(), "pruned session history");
        }
        self.store.write_json(keys::SESSION_HISTORY, &history)?;

        self.touch_session()?;
        Ok(())
    }

    /// Credential-clear path for a 401 observed outside the manager's own
    /// calls (e.g. a note request rejected mid-session).
    pub fn handle_unauthorized(&self) -> Result<()> {
        tracing::warn!("request rejected as unauthorized, clearing auth state");
        self.force_anonymous()
    }

    /// End any current session and mark the manager terminated.
    pub fn shutdown(&self) -> Result<()> {
        self.end_current_session()?;
        self.set_state(AuthState::Terminated);
        Ok(())
    }

    pub fn current_session(&self) -> StorageResult<Option<Session>> {
        self.store.read_json(keys::CURRENT_SESSION)
    }

    pub fn session_history(&self) -> StorageResult<Vec<Session>> {
        Ok(self
            .store
            .read_json(keys::SESSION_HISTORY)?
            .unwrap_or_default())
    }

    /// Stable per-install identifier, generated on first use.
    pub fn ensure_fingerprint(&self) -> StorageResult<String> {
        if let Some(fingerprint) = self.store.get(keys::DEVICE_FINGERPRINT)? {
            return Ok(fingerprint);
        }
        let fingerprint = format!("{}-{}", std::env::consts::OS, Uuid::new_v4());
        self.store.set(keys::DEVICE_FINGERPRINT, &fingerprint)?;
        tracing::info!("generated device fingerprint");
        Ok(fingerprint)
    }

    /// Persist token and user together; a half-written pair is rolled back
    /// so the stored state never holds one without the other.
    fn persist_credentials(&self, payload: &AuthPayload, remember: bool) -> Result<()> {
        if !self
            .credentials
            .set_token(&payload.access_token, payload.expires_in)
        {
            return Err(Error::Storage("failed to persist auth token".to_string()));
        }
        if let Err(error) = self.credentials.set_user(&payload.user) {
            let _ = self.store.remove(keys::TOKEN);
            return Err(error.into());
        }
        self.credentials.set_remember_me(remember)?;
        Ok(())
    }

    fn start_session(&self, user_id: &str, login_method: LoginMethod) -> Result<()> {
        self.end_current_session()?;
        let fingerprint = self.ensure_fingerprint()?;
        let session = Session::begin(user_id, login_method, &fingerprint);
        self.store.write_json(keys::CURRENT_SESSION, &session)?;
        Ok(())
    }

    fn end_current_session(&self) -> Result<()> {
        let Some(mut session) = self.current_session()? else {
            return Ok(());
        };
        session.end();
        let mut history = self.session_history()?;
        push_history(&mut history, session);
        self.store.write_json(keys::SESSION_HISTORY, &history)?;
        self.store.remove(keys::CURRENT_SESSION)?;
        Ok(())
    }

    fn touch_session(&self) -> Result<()> {
        if let Some(mut session) = self.current_session()? {
            session.touch();
            self.store.write_json(keys::CURRENT_SESSION, &session)?;
        }
        Ok(())
    }

    fn force_anonymous(&self) -> Result<()> {
        self.end_current_session()?;
        self.credentials.clear_auth_data()?;
        self.set_state(AuthState::Anonymous);
        Ok(())
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"))
}

fn validate_login(email: &str, password: &str) -> Result<()> {
    let mut fields = std::collections::BTreeMap::new();
    if email.trim().is_empty() {
        fields.insert("email".to_string(), "Email is required".to_string());
    }
    if password.is_empty() {
        fields.insert("password".to_string(), "Password is required".to_string());
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(Error::validation("Login fields are invalid", fields))
    }
}

fn validate_registration(request: &RegisterRequest) -> Result<()> {
    let mut fields = std::collections::BTreeMap::new();

    let email = request.email.trim();
    if email.is_empty() {
        fields.insert("email".to_string(), "Email is required".to_string());
    } else if !email_regex().is_match(email) {
        fields.insert("email".to_string(), "Email is invalid".to_string());
    }

    if request.password.is_empty() {
        fields.insert("password".to_string(), "Password is required".to_string());
    } else if request.password.chars().count() < PASSWORD_MIN_CHARS {
        fields.insert(
            "password".to_string(),
            format!("Password must be at least {PASSWORD_MIN_CHARS} characters"),
        );
    }
    if request.confirm_password != request.password {
        fields.insert(
            "confirmPassword".to_string(),
            "Passwords do not match".to_string(),
        );
    }

    if request.first_name.trim().is_empty() {
        fields.insert("firstName".to_string(), "First name is required".to_string());
    }
    if request.last_name.trim().is_empty() {
        fields.insert("lastName".to_string(), "Last name is required".to_string());
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(Error::validation("Registration fields are invalid", fields))
    }
}
