//! Core library for Pennybook - session management, API client, models.
//!
//! This crate owns the authenticated session state for the Pennybook
//! mobile client: OS-keychain storage for the refresh token and device
//! id, an in-memory access token, single-flight token refresh, and an
//! HTTP client that recovers from expired access tokens automatically.
//!
//! The UI layers talk to [`SessionManager`] for login, registration,
//! logout and session restore, and issue their API calls through the
//! [`ApiClient`] it exposes.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AccessTokenCache, CredentialStore, SecretStore, SessionManager};
pub use config::Config;
pub use models::{AuthPayload, TokenPair, User};
