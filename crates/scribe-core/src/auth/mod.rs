//! Authentication: credential persistence and session lifecycle.

pub mod credentials;
pub mod manager;

pub use credentials::{CredentialStore, StoredDataReport, TokenRecord, TOKEN_EXPIRY_BUFFER_MS};
pub use manager::{AuthManager, AuthState, AuthSuccess, RegisterRequest, CLEANUP_PERIOD};
