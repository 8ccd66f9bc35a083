//! Single-flight refresh-token exchange.
//!
//! At most one exchange is on the wire at a time. The first caller
//! becomes the leader and performs the HTTP call; callers arriving
//! while it is in flight subscribe to a broadcast channel and receive
//! the same outcome. Concurrent refreshes would race on token rotation
//! and invalidate each other's new refresh token.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::client::{AUTH_TIMEOUT_SECS, DEVICE_ID_HEADER};
use crate::api::{envelope, ApiError};
use crate::models::TokenPair;

use super::{AccessTokenCache, CredentialStore};

type RefreshOutcome = Result<String, ApiError>;

#[derive(Serialize)]
struct RefreshRequest {
    refresh_token: String,
    device_id: String,
}

struct CoordinatorInner {
    http: Client,
    base_url: String,
    credentials: CredentialStore,
    tokens: AccessTokenCache,
    /// `None` while idle; holds the fan-out channel while an exchange
    /// is in flight.
    in_flight: Mutex<Option<broadcast::Sender<RefreshOutcome>>>,
}

/// Serializes refresh-token exchanges and fans the result out to every
/// caller that needed a fresh access token at the same moment.
///
/// Clone shares the coordinator state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

enum Role {
    Leader(broadcast::Sender<RefreshOutcome>),
    Waiter(broadcast::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new(
        http: Client,
        base_url: String,
        credentials: CredentialStore,
        tokens: AccessTokenCache,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                http,
                base_url,
                credentials,
                tokens,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// If an exchange is already in flight, waits for its outcome
    /// instead of issuing a second network call. On success the rotated
    /// refresh token is persisted and the access token cache updated
    /// before any caller observes the result. On failure all session
    /// state is cleared (forced logout) and every waiting caller
    /// receives the same error.
    pub async fn refresh_access_token(&self) -> RefreshOutcome {
        let role = {
            let mut in_flight = self.inner.in_flight.lock().unwrap();
            match in_flight.as_ref() {
                Some(sender) => Role::Waiter(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    *in_flight = Some(sender.clone());
                    Role::Leader(sender)
                }
            }
        };

        match role {
            Role::Waiter(mut receiver) => {
                debug!("refresh already in flight, waiting for its outcome");
                match receiver.recv().await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ApiError::InvalidResponse(
                        "refresh completed without an outcome".to_string(),
                    )),
                }
            }
            Role::Leader(sender) => {
                let outcome = self.exchange().await;
                if let Err(ref error) = outcome {
                    warn!(%error, "refresh failed, clearing session");
                    self.inner.tokens.clear();
                    self.inner.credentials.remove_refresh_token();
                }
                // Release the slot before broadcasting so a caller
                // arriving after completion starts a fresh exchange.
                self.inner.in_flight.lock().unwrap().take();
                let _ = sender.send(outcome.clone());
                outcome
            }
        }
    }

    /// Perform one refresh-token exchange on the wire.
    async fn exchange(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.inner.credentials.refresh_token() else {
            return Err(ApiError::TokenExpired);
        };
        let device_id = self.inner.credentials.device_id();

        debug!("exchanging refresh token");
        let url = format!("{}/auth/refresh", self.inner.base_url);
        let response = self
            .inner
            .http
            .post(&url)
            .header(DEVICE_ID_HEADER, device_id.as_str())
            .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
            .json(&RefreshRequest {
                refresh_token,
                device_id,
            })
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::from)?;

        // A 401 from the refresh endpoint itself means the refresh
        // token is invalid or revoked. Terminal - never retried.
        if status == StatusCode::UNAUTHORIZED {
            warn!("refresh token rejected by server");
            return Err(ApiError::TokenExpired);
        }
        if !status.is_success() {
            return Err(ApiError::from_response(status, &body));
        }

        let pair: TokenPair = envelope::parse_payload(&body)?;

        // Strict rotation: the server invalidated the previous refresh
        // token, so a failed write here is fatal to the exchange.
        self.inner
            .credentials
            .store_refresh_token(&pair.refresh_token)?;
        self.inner.tokens.set(pair.access_token.clone());

        info!("access token refreshed");
        Ok(pair.access_token)
    }
}
