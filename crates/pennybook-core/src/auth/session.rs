//! Session lifecycle management.
//!
//! `SessionManager` is the surface the rest of the app calls for full
//! session transitions: login, registration (auto-login), logout,
//! startup session restoration and profile refresh. It owns the last
//! known profile snapshot; the snapshot may be stale until
//! [`SessionManager::refresh_user`] is called.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::client::REQUEST_TIMEOUT_SECS;
use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::models::{AuthPayload, User};

use super::{AccessTokenCache, CredentialStore, KeyringStore, RefreshCoordinator, SecretStore};

/// Client identifier sent on login/register so the backend can label
/// the device's session.
const USER_AGENT: &str = concat!("pennybook-core/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    device_id: String,
    user_agent: &'static str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    device_id: String,
    user_agent: &'static str,
}

#[derive(Serialize)]
struct LogoutRequest {
    refresh_token: String,
    all_devices: bool,
}

/// Orchestrates full session transitions over the credential store,
/// the token cache and the refresh coordinator.
pub struct SessionManager {
    api: ApiClient,
    credentials: CredentialStore,
    tokens: AccessTokenCache,
    refresher: RefreshCoordinator,
    /// Last known profile snapshot; refreshed explicitly, not kept in
    /// sync with the server.
    user: Mutex<Option<User>>,
}

impl SessionManager {
    /// Create a session manager backed by the OS keychain.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Self::with_store(config, Box::new(KeyringStore::new()))
    }

    /// Create a session manager with an explicit storage backend.
    pub fn with_store(config: &Config, store: Box<dyn SecretStore>) -> Result<Self, ApiError> {
        let base_url = config.api_base_url();
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(ApiError::from)?;

        let credentials = CredentialStore::new(store);
        let tokens = AccessTokenCache::new();
        let refresher = RefreshCoordinator::new(
            http.clone(),
            base_url.clone(),
            credentials.clone(),
            tokens.clone(),
        );
        let api = ApiClient::new(
            http,
            base_url,
            credentials.device_id(),
            tokens.clone(),
            refresher.clone(),
        );

        Ok(Self {
            api,
            credentials,
            tokens,
            refresher,
            user: Mutex::new(None),
        })
    }

    /// The authenticated request pipeline. The rest of the app issues
    /// its API calls through this client so every request shares the
    /// same token state and refresh recovery.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Whether an access token is currently held in memory.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_present()
    }

    /// The last known profile snapshot, if any.
    pub fn current_user(&self) -> Option<User> {
        self.user.lock().unwrap().clone()
    }

    /// Authenticate with email and password.
    ///
    /// On success the refresh token is persisted, the access token is
    /// installed in memory and the returned profile recorded. Failures
    /// propagate for UI display - a failed login must be visible to the
    /// user.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        debug!(email, "logging in");
        let body = LoginRequest {
            email,
            password,
            device_id: self.credentials.device_id(),
            user_agent: USER_AGENT,
        };

        let payload: AuthPayload = self
            .api
            .post_public("/auth/login", &body)
            .await
            .map_err(Self::map_credential_error)?;

        self.install_session(payload)
    }

    /// Create an account, then establish a session with the returned
    /// tokens (auto-login).
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        debug!(email, "registering account");
        let body = RegisterRequest {
            name,
            email,
            password,
            device_id: self.credentials.device_id(),
            user_agent: USER_AGENT,
        };

        let payload: AuthPayload = self
            .api
            .post_public("/auth/register", &body)
            .await
            .map_err(Self::map_credential_error)?;

        self.install_session(payload)
    }

    /// End the session on this device, or on all devices when
    /// `all_devices` is set.
    ///
    /// The backend call is best-effort; local state is cleared
    /// unconditionally so the device always ends up logged out even if
    /// the network is unreachable.
    pub async fn logout(&self, all_devices: bool) {
        if let Some(refresh_token) = self.credentials.refresh_token() {
            let body = LogoutRequest {
                refresh_token,
                all_devices,
            };
            if let Err(error) = self.api.post_public_no_content("/auth/logout", &body).await {
                warn!(%error, "logout call failed, clearing local session anyway");
            }
        }

        self.clear_local_session();
        info!("logged out");
    }

    /// Restore an authenticated state at startup using the persisted
    /// refresh token, without user interaction.
    ///
    /// Returns the restored profile, or `None` on any failure - a
    /// `None` result means "show the login screen", never an error
    /// bubbling to the UI root. With no stored refresh token, returns
    /// immediately without touching the network.
    pub async fn restore_session(&self) -> Option<User> {
        if !self.credentials.has_refresh_token() {
            debug!("no stored refresh token, skipping session restore");
            return None;
        }

        info!("restoring session from stored refresh token");
        if let Err(error) = self.refresher.refresh_access_token().await {
            // The coordinator already cleared session state
            warn!(%error, "session restore failed");
            return None;
        }

        match self.api.get::<User>("/auth/me").await {
            Ok(user) => {
                *self.user.lock().unwrap() = Some(user.clone());
                info!(user_id = user.id, "session restored");
                Some(user)
            }
            Err(error) => {
                warn!(%error, "profile fetch after restore failed");
                self.clear_local_session();
                None
            }
        }
    }

    /// Re-fetch the profile snapshot from the backend.
    ///
    /// Returns `Ok(None)` with a warning when no session is active -
    /// calling this while logged out is a caller mistake, not a system
    /// fault.
    pub async fn refresh_user(&self) -> Result<Option<User>, ApiError> {
        if !self.tokens.is_present() {
            warn!("refresh_user called without an active session");
            return Ok(None);
        }

        let user: User = self.api.get("/auth/me").await?;
        *self.user.lock().unwrap() = Some(user.clone());
        debug!(user_id = user.id, "profile snapshot refreshed");
        Ok(Some(user))
    }

    /// Record the credentials and profile from a login/register
    /// payload. The refresh token is persisted first: if it cannot be
    /// stored durably, the session is not usable and the attempt fails.
    fn install_session(&self, payload: AuthPayload) -> Result<User, ApiError> {
        self.credentials
            .store_refresh_token(&payload.tokens.refresh_token)?;
        self.tokens.set(payload.tokens.access_token.clone());
        *self.user.lock().unwrap() = Some(payload.user.clone());

        info!(user_id = payload.user.id, "session established");
        Ok(payload.user)
    }

    fn clear_local_session(&self) {
        self.tokens.clear();
        self.credentials.remove_refresh_token();
        *self.user.lock().unwrap() = None;
    }

    /// Login/register rejections surface as `InvalidCredentials` with
    /// the server-provided message; everything else passes through.
    fn map_credential_error(error: ApiError) -> ApiError {
        match error {
            ApiError::Unauthorized(message) | ApiError::BadRequest(message) => {
                let message = if message.is_empty() {
                    "Invalid email or password".to_string()
                } else {
                    message
                };
                ApiError::InvalidCredentials(message)
            }
            other => other,
        }
    }
}
