//! HTTP client for the Pennybook backend.
//!
//! Every request carries the device id in the `X-Device-ID` header.
//! Authenticated requests additionally carry the in-memory access token
//! as a bearer credential; when the backend rejects it with 401, the
//! request triggers a single-flight token refresh and is re-issued
//! exactly once with the new token. Unauthenticated auth endpoints
//! (login, register, logout) go through [`ApiClient::post_public`] and
//! never receive an `Authorization` header or a refresh retry.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{AccessTokenCache, RefreshCoordinator};

use super::{envelope, ApiError};

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the device id on every request.
/// Device binding applies at the HTTP layer, authenticated or not.
pub(crate) const DEVICE_ID_HEADER: &str = "X-Device-ID";

/// Default HTTP request timeout in seconds.
/// 30s allows for slow analysis endpoints while failing fast enough for good UX.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for auth-critical endpoints (login, register, refresh, logout).
/// Stricter than the default: a hung auth call blocks the whole session.
pub(crate) const AUTH_TIMEOUT_SECS: u64 = 15;

/// API client for the Pennybook backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    device_id: String,
    tokens: AccessTokenCache,
    refresher: RefreshCoordinator,
}

impl ApiClient {
    pub fn new(
        http: Client,
        base_url: String,
        device_id: String,
        tokens: AccessTokenCache,
        refresher: RefreshCoordinator,
    ) -> Self {
        Self {
            http,
            base_url,
            device_id,
            tokens,
            refresher,
        }
    }

    /// The device id sent with every request.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Issue an authenticated GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_authed(Method::GET, path, None::<&()>).await
    }

    /// Issue an authenticated POST request with a JSON body.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_authed(Method::POST, path, Some(body)).await
    }

    /// Issue an unauthenticated POST to an auth endpoint.
    ///
    /// Carries `X-Device-ID` but never `Authorization` - sending a
    /// stale or absent access token to login/register/logout is
    /// meaningless and risks refresh loops. Uses the stricter auth
    /// timeout and is never retried.
    pub async fn post_public<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .post(self.url(path))
            .header(DEVICE_ID_HEADER, self.device_id.as_str())
            .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;

        Self::read_json(response).await
    }

    /// Like [`ApiClient::post_public`] but discards the response body.
    /// Used for endpoints that return 2xx with no required payload.
    pub async fn post_public_no_content<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(path))
            .header(DEVICE_ID_HEADER, self.device_id.as_str())
            .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status, &body));
        }
        Ok(())
    }

    /// Send an authenticated request, recovering from an expired access
    /// token at most once.
    ///
    /// On a 401 the refresh coordinator is invoked; if it succeeds the
    /// request is re-issued with the token it installed. A second 401,
    /// or a refresh failure, propagates to the caller.
    async fn send_authed<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut retried = false;
        let mut token = self.tokens.get();

        loop {
            let mut request = self
                .http
                .request(method.clone(), url.as_str())
                .header(DEVICE_ID_HEADER, self.device_id.as_str());
            if let Some(token) = token.as_deref() {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(ApiError::from)?;

            if response.status() == StatusCode::UNAUTHORIZED && !retried {
                retried = true;
                debug!(path, "access token rejected, refreshing");
                token = Some(self.refresher.refresh_access_token().await?);
                continue;
            }

            return Self::read_json(response).await;
        }
    }

    /// Check the status and parse the body, unwrapping the response
    /// envelope if one is present.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            warn!(status = %status, "request failed");
            return Err(ApiError::from_response(status, &body));
        }

        envelope::parse_payload(&body)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
