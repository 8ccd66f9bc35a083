//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `CredentialStore`: OS-keychain persistence for the refresh token
//!   and device id, over a swappable `SecretStore` backend
//! - `AccessTokenCache`: the in-memory access token (never persisted)
//! - `RefreshCoordinator`: single-flight refresh-token exchange
//! - `SessionManager`: login, registration, logout and session restore

pub mod refresh;
pub mod session;
pub mod store;
pub mod tokens;

pub use refresh::RefreshCoordinator;
pub use session::SessionManager;
pub use store::{CredentialStore, KeyringStore, SecretStore, StoreError};
pub use tokens::AccessTokenCache;
