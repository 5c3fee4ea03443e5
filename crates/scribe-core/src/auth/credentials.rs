//! Persistent credential store.
//!
//! Wraps a [`KeyValueStore`] to hold the auth token record and user payload
//! with expiration metadata. Tokens are stored as a structured record with
//! an absolute expiry; a bare string left by older builds is honored as a
//! never-expiring legacy token until migration rewrites it.

use serde::{Deserialize, Serialize};

use crate::models::User;
use crate::storage::{keys, KeyValueStore, StorageResult};
use crate::util::unix_timestamp_ms;

/// Tokens within this window of their expiry are treated as already expired,
/// so a request never goes out with a token about to lapse mid-flight.
pub const TOKEN_EXPIRY_BUFFER_MS: i64 = 5 * 60 * 1000;

/// Stored token with issue/expiry metadata (absolute Unix ms).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    pub issued_at: i64,
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TokenRecord")
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Outcome of a non-mutating stored-data audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDataReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

enum ParsedToken {
    Record(TokenRecord),
    Legacy(String),
    Corrupted,
}

fn parse_token_value(raw: &str) -> ParsedToken {
    if let Ok(record) = serde_json::from_str::<TokenRecord>(raw) {
        return ParsedToken::Record(record);
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') {
        // Empty or a structured record that no longer parses.
        ParsedToken::Corrupted
    } else {
        ParsedToken::Legacy(trimmed.to_string())
    }
}

/// Credential persistence over a swappable key-value backend.
#[derive(Debug, Clone)]
pub struct CredentialStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Store a token, computing the absolute expiry from a lifetime in
    /// seconds. Returns whether the write succeeded.
    pub fn set_token(&self, token: &str, expires_in_secs: Option<i64>) -> bool {
        let now = unix_timestamp_ms();
        let record = TokenRecord {
            token: token.to_string(),
            issued_at: now,
            expires_at: expires_in_secs.map(|secs| now + secs * 1000),
        };
        match self.store.write_json(keys::TOKEN, &record) {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(%error, "failed to persist auth token");
                false
            }
        }
    }

    /// The stored token, unless it is missing or inside the pre-expiry
    /// buffer — in which case auth data is cleared and `None` returned.
    pub fn get_token(&self) -> StorageResult<Option<String>> {
        let Some(record) = self.read_token_record()? else {
            return Ok(None);
        };
        if let Some(expires_at) = record.expires_at {
            if unix_timestamp_ms() >= expires_at - TOKEN_EXPIRY_BUFFER_MS {
                tracing::info!("stored token is expired or about to expire, clearing auth data");
                self.clear_auth_data()?;
                return Ok(None);
            }
        }
        Ok(Some(record.token))
    }

    /// Strict expiry check against the absolute expiry, with no buffer.
    /// Diagnostic counterpart of [`Self::get_token`]; never mutates storage.
    pub fn is_token_expired(&self) -> StorageResult<bool> {
        let Some(record) = self.peek_token_record()? else {
            return Ok(true);
        };
        Ok(record
            .expires_at
            .map_or(false, |expires_at| unix_timestamp_ms() >= expires_at))
    }

    pub fn set_user(&self, user: &User) -> StorageResult<()> {
        self.store.write_json(keys::USER, user)
    }

    /// The stored user record; malformed JSON reads as absent and the
    /// corrupted key is silently repaired.
    pub fn get_user(&self) -> StorageResult<Option<User>> {
        self.store.read_json(keys::USER)
    }

    pub fn set_remember_me(&self, remember: bool) -> StorageResult<()> {
        self.store.write_json(keys::REMEMBER_ME, &remember)
    }

    pub fn remember_me(&self) -> StorageResult<bool> {
        Ok(self.store.read_json(keys::REMEMBER_ME)?.unwrap_or(false))
    }

    /// Remove token, user, and current-session state. Every removal is
    /// attempted even if an earlier one fails; the first failure is
    /// reported afterwards. The remember-me preference is left in place.
    pub fn clear_auth_data(&self) -> StorageResult<()> {
        let attempts = [
            self.store.remove(keys::TOKEN),
            self.store.remove(keys::USER),
            self.store.remove(keys::CURRENT_SESSION),
        ];
        attempts.into_iter().collect()
    }

    /// Audit stored credentials without mutating anything.
    pub fn validate_stored_data(&self) -> StorageResult<StoredDataReport> {
        let mut issues = Vec::new();

        let token = match self.store.get(keys::TOKEN)? {
            None => None,
            Some(raw) => match parse_token_value(&raw) {
                ParsedToken::Record(record) => Some(record),
                ParsedToken::Legacy(token) => Some(TokenRecord {
                    token,
                    issued_at: 0,
                    expires_at: None,
                }),
                ParsedToken::Corrupted => {
                    issues.push("token record is corrupted".to_string());
                    None
                }
            },
        };
        let user_present = match self.store.get(keys::USER)? {
            None => false,
            Some(raw) => {
                if serde_json::from_str::<User>(&raw).is_ok() {
                    true
                } else {
                    issues.push("user record is corrupted".to_string());
                    false
                }
            }
        };

        match (&token, user_present) {
            (Some(_), false) => issues.push("token present without user data".to_string()),
            (None, true) => issues.push("user data present without token".to_string()),
            _ => {}
        }
        if let Some(record) = &token {
            if record
                .expires_at
                .map_or(false, |expires_at| unix_timestamp_ms() >= expires_at)
            {
                issues.push("token is expired".to_string());
            }
        }

        Ok(StoredDataReport {
            is_valid: issues.is_empty(),
            issues,
        })
    }

    /// Rewrite a legacy bare-string token into the structured record.
    /// Returns whether a migration happened.
    pub fn migrate_legacy_token(&self) -> StorageResult<bool> {
        let Some(raw) = self.store.get(keys::TOKEN)? else {
            return Ok(false);
        };
        match parse_token_value(&raw) {
            ParsedToken::Legacy(token) => {
                let record = TokenRecord {
                    token,
                    issued_at: unix_timestamp_ms(),
                    expires_at: None,
                };
                self.store.write_json(keys::TOKEN, &record)?;
                tracing::info!("migrated legacy token to structured record");
                Ok(true)
            }
            ParsedToken::Record(_) | ParsedToken::Corrupted => Ok(false),
        }
    }

    fn read_token_record(&self) -> StorageResult<Option<TokenRecord>> {
        let Some(raw) = self.store.get(keys::TOKEN)? else {
            return Ok(None);
        };
        match parse_token_value(&raw) {
            ParsedToken::Record(record) => Ok(Some(record)),
            ParsedToken::Legacy(token) => Ok(Some(TokenRecord {
                token,
                issued_at: 0,
                expires_at: None,
            })),
            ParsedToken::Corrupted => {
                tracing::warn!("removing corrupted token record");
                self.store.remove(keys::TOKEN)?;
                Ok(None)
            }
        }
    }

    fn peek_token_record(&self) -> StorageResult<Option<TokenRecord>> {
        let Some(raw) = self.store.get(keys::TOKEN)? else {
            return Ok(None);
        };
        match parse_token_value(&raw) {
            ParsedToken::Record(record) => Ok(Some(record)),
            ParsedToken::Legacy(token) => Ok(Some(TokenRecord {
                token,
                issued_at: 0,
                expires_at: None,
            })),
            ParsedToken::Corrupted => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::storage::MemoryStore;

    use super::*;

    fn credentials() -> (CredentialStore<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (CredentialStore::new(store.clone()), store)
    }

    fn write_record(store: &MemoryStore, token: &str, expires_at: Option<i64>) {
        let record = TokenRecord {
            token: token.to_string(),
            issued_at: unix_timestamp_ms(),
            expires_at,
        };
        store.write_json(keys::TOKEN, &record).unwrap();
    }

    #[test]
    fn get_token_returns_token_outside_the_buffer() {
        let (credentials, store) = credentials();
        write_record(&store, "tok", Some(unix_timestamp_ms() + TOKEN_EXPIRY_BUFFER_MS * 2));
        assert_eq!(credentials.get_token().unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn get_token_clears_within_the_expiry_buffer() {
        let (credentials, store) = credentials();
        store.write_json(keys::USER, &User::default()).unwrap();
        write_record(&store, "tok", Some(unix_timestamp_ms() + 60 * 1000));

        assert_eq!(credentials.get_token().unwrap(), None);
        // The buffered miss clears auth data as a side effect.
        assert_eq!(store.get(keys::TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::USER).unwrap(), None);
    }

    #[test]
    fn strict_expiry_check_ignores_the_buffer() {
        let (credentials, store) = credentials();
        write_record(&store, "tok", Some(unix_timestamp_ms() + 60 * 1000));
        assert!(!credentials.is_token_expired().unwrap());

        write_record(&store, "tok", Some(unix_timestamp_ms() - 1));
        assert!(credentials.is_token_expired().unwrap());
    }

    #[test]
    fn set_token_computes_absolute_expiry() {
        let (credentials, store) = credentials();
        let before = unix_timestamp_ms();
        assert!(credentials.set_token("tok", Some(3_600)));

        let raw = store.get(keys::TOKEN).unwrap().unwrap();
        let record: TokenRecord = serde_json::from_str(&raw).unwrap();
        let expires_at = record.expires_at.unwrap();
        assert!(expires_at >= before + 3_600 * 1000);
        assert!(expires_at <= unix_timestamp_ms() + 3_600 * 1000);
    }

    #[test]
    fn legacy_plain_string_token_is_honored_and_migrated() {
        let (credentials, store) = credentials();
        store.set(keys::TOKEN, "legacy-token").unwrap();

        assert_eq!(credentials.get_token().unwrap().as_deref(), Some("legacy-token"));
        assert!(!credentials.is_token_expired().unwrap());

        assert!(credentials.migrate_legacy_token().unwrap());
        let raw = store.get(keys::TOKEN).unwrap().unwrap();
        let record: TokenRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.token, "legacy-token");
        assert_eq!(record.expires_at, None);

        // Second pass is a no-op.
        assert!(!credentials.migrate_legacy_token().unwrap());
    }

    #[test]
    fn corrupted_user_record_reads_as_absent_and_self_repairs() {
        let (credentials, store) = credentials();
        store.set(keys::USER, "{broken").unwrap();
        assert_eq!(credentials.get_user().unwrap(), None);
        assert_eq!(store.get(keys::USER).unwrap(), None);
    }

    #[test]
    fn validate_reports_token_user_mismatch_both_ways() {
        let (credentials, store) = credentials();
        write_record(&store, "tok", None);
        let report = credentials.validate_stored_data().unwrap();
        assert!(!report.is_valid);
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.contains("without user data")));

        store.remove(keys::TOKEN).unwrap();
        store.write_json(keys::USER, &User::default()).unwrap();
        let report = credentials.validate_stored_data().unwrap();
        assert!(!report.is_valid);
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.contains("without token")));
    }

    #[test]
    fn validate_accepts_complete_credentials_and_flags_expiry() {
        let (credentials, store) = credentials();
        store.write_json(keys::USER, &User::default()).unwrap();
        write_record(&store, "tok", Some(unix_timestamp_ms() + 60 * 60 * 1000));
        assert!(credentials.validate_stored_data().unwrap().is_valid);

        write_record(&store, "tok", Some(unix_timestamp_ms() - 1));
        let report = credentials.validate_stored_data().unwrap();
        assert!(!report.is_valid);
        assert!(report.issues.iter().any(|issue| issue.contains("expired")));
        // Validation never mutates.
        assert!(store.get(keys::TOKEN).unwrap().is_some());
    }

    #[test]
    fn clear_auth_data_removes_credentials_but_keeps_remember_me() {
        let (credentials, store) = credentials();
        write_record(&store, "tok", None);
        store.write_json(keys::USER, &User::default()).unwrap();
        credentials.set_remember_me(true).unwrap();

        credentials.clear_auth_data().unwrap();
        assert_eq!(store.get(keys::TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::USER).unwrap(), None);
        assert!(credentials.remember_me().unwrap());
    }

    #[test]
    fn token_record_debug_redacts_token() {
        let record = TokenRecord {
            token: "secret".to_string(),
            issued_at: 0,
            expires_at: None,
        };
        let rendered = format!("{record:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
