//! Session record and history bookkeeping

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::unix_timestamp_ms;

/// Maximum number of ended sessions kept in history.
pub const SESSION_HISTORY_MAX: usize = 10;
/// Ended sessions older than this are pruned during cleanup.
pub const SESSION_RETENTION_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// How an authenticated session was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Manual,
    Auto,
}

/// One continuous authenticated interaction period.
///
/// Distinct from the credential that authorizes it: a session is client-side
/// bookkeeping, created on login and moved to a bounded history on end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: i64,
    pub last_activity_at: i64,
    pub ended_at: Option<i64>,
    pub login_method: LoginMethod,
    pub device_fingerprint: String,
}

impl Session {
    /// Start a new session. Ids are UUIDv7, time-sortable by construction.
    #[must_use]
    pub fn begin(user_id: &str, login_method: LoginMethod, device_fingerprint: &str) -> Self {
        let now = unix_timestamp_ms();
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            last_activity_at: now,
            ended_at: None,
            login_method,
            device_fingerprint: device_fingerprint.to_string(),
        }
    }

    /// Record activity, keeping `last_activity_at` current.
    pub fn touch(&mut self) {
        self.last_activity_at = unix_timestamp_ms();
    }

    /// Mark the session ended now.
    pub fn end(&mut self) {
        let now = unix_timestamp_ms();
        self.last_activity_at = now;
        self.ended_at = Some(now);
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Append an ended session to history, enforcing the size cap (newest first).
pub fn push_history(history: &mut Vec<Session>, session: Session) {
    history.insert(0, session);
    history.truncate(SESSION_HISTORY_MAX);
}

/// Drop history entries that ended more than the retention window ago.
pub fn prune_history(history: &mut Vec<Session>, now_ms: i64) {
    history.retain(|session| {
        let reference = session.ended_at.unwrap_or(session.last_activity_at);
        now_ms.saturating_sub(reference) <= SESSION_RETENTION_MS
    });
}
