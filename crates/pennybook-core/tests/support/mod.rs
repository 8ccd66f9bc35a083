//! Test support: an in-memory secret store and a local HTTP backend
//! implementing the auth endpoints with instrumentation counters.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use pennybook_core::auth::{SecretStore, StoreError};
use pennybook_core::{Config, SessionManager};

/// In-memory secret store; clones share the same backing map so a
/// second manager can simulate an app restart over the same "keychain".
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.lock().unwrap().keys().cloned().collect()
    }
}

impl SecretStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

/// State of the fake backend. Tokens are minted as `AT<n>`/`RT<n>`;
/// only the most recently issued refresh token is accepted (strict
/// rotation), and access tokens can be invalidated to simulate expiry.
#[derive(Default)]
pub struct BackendState {
    counter: AtomicUsize,
    refresh_calls: AtomicUsize,
    me_calls: AtomicUsize,
    current_refresh_token: Mutex<Option<String>>,
    current_email: Mutex<Option<String>>,
    valid_access_tokens: Mutex<HashSet<String>>,
    refresh_delay_ms: AtomicUsize,
    reject_refresh: AtomicBool,
    fail_logout: AtomicBool,
    always_reject_me: AtomicBool,
    last_login_had_authorization: AtomicBool,
    last_login_device_id: Mutex<Option<String>>,
    last_logout_body: Mutex<Option<Value>>,
}

impl BackendState {
    fn mint_tokens(&self) -> (String, String) {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("AT{n}");
        let refresh = format!("RT{n}");
        self.valid_access_tokens
            .lock()
            .unwrap()
            .insert(access.clone());
        *self.current_refresh_token.lock().unwrap() = Some(refresh.clone());
        (access, refresh)
    }

    fn user_json(&self) -> Value {
        let email = self
            .current_email
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "ada@example.com".to_string());
        json!({
            "id": 1,
            "email": email,
            "name": "Ada",
            "createdAt": "2025-11-02T09:30:00Z",
            "updatedAt": "2026-01-15T18:00:00Z"
        })
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub fn current_refresh_token(&self) -> Option<String> {
        self.current_refresh_token.lock().unwrap().clone()
    }

    /// Seed a refresh token as if a session had been issued earlier.
    pub fn seed_refresh_token(&self, token: &str) {
        *self.current_refresh_token.lock().unwrap() = Some(token.to_string());
    }

    /// Simulate access-token expiry: the backend stops accepting every
    /// token issued so far.
    pub fn invalidate_access_tokens(&self) {
        self.valid_access_tokens.lock().unwrap().clear();
    }

    pub fn set_refresh_delay(&self, ms: usize) {
        self.refresh_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn set_reject_refresh(&self, reject: bool) {
        self.reject_refresh.store(reject, Ordering::SeqCst);
    }

    pub fn set_fail_logout(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    pub fn set_always_reject_me(&self, reject: bool) {
        self.always_reject_me.store(reject, Ordering::SeqCst);
    }

    pub fn last_login_had_authorization(&self) -> bool {
        self.last_login_had_authorization.load(Ordering::SeqCst)
    }

    pub fn last_login_device_id(&self) -> Option<String> {
        self.last_login_device_id.lock().unwrap().clone()
    }

    pub fn last_logout_body(&self) -> Option<Value> {
        self.last_logout_body.lock().unwrap().clone()
    }
}

pub struct Backend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

impl Backend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "status": "error",
            "message": message,
            "errors": [{"message": message}]
        })),
    )
}

async fn login(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state
        .last_login_had_authorization
        .store(headers.contains_key("authorization"), Ordering::SeqCst);
    *state.last_login_device_id.lock().unwrap() = headers
        .get("x-device-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if body["password"].as_str() != Some("pw") {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }

    let email = body["email"].as_str().unwrap_or_default().to_string();
    *state.current_email.lock().unwrap() = Some(email);
    let (access, refresh) = state.mint_tokens();
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": null,
            "data": {
                "user": state.user_json(),
                "tokens": {
                    "access_token": access,
                    "refresh_token": refresh,
                    "token_type": "Bearer",
                    "expires_in": 900
                }
            }
        })),
    )
}

async fn register(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if body["email"].as_str() == Some("taken@example.com") {
        return error_response(StatusCode::CONFLICT, "Email is already registered");
    }

    let email = body["email"].as_str().unwrap_or_default().to_string();
    *state.current_email.lock().unwrap() = Some(email);
    let (access, refresh) = state.mint_tokens();
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": null,
            "data": {
                "user": state.user_json(),
                "tokens": {
                    "access_token": access,
                    "refresh_token": refresh,
                    "token_type": "Bearer",
                    "expires_in": 900
                }
            }
        })),
    )
}

async fn refresh(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }

    if state.reject_refresh.load(Ordering::SeqCst) {
        return error_response(StatusCode::UNAUTHORIZED, "Refresh token revoked");
    }
    if body["device_id"].as_str().unwrap_or_default().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing device id");
    }

    let presented = body["refresh_token"].as_str().unwrap_or_default().to_string();
    let current = state.current_refresh_token.lock().unwrap().clone();
    if current.as_deref() != Some(presented.as_str()) {
        return error_response(StatusCode::UNAUTHORIZED, "Unknown refresh token");
    }

    // Bare (non-enveloped) payload, as the refresh endpoint responds
    let (access, refresh) = state.mint_tokens();
    (
        StatusCode::OK,
        Json(json!({
            "access_token": access,
            "refresh_token": refresh,
            "token_type": "Bearer",
            "expires_in": 900
        })),
    )
}

async fn logout(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *state.last_logout_body.lock().unwrap() = Some(body);

    if state.fail_logout.load(Ordering::SeqCst) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Logout failed");
    }
    (StatusCode::OK, Json(json!({"status": "success"})))
}

async fn me(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.me_calls.fetch_add(1, Ordering::SeqCst);

    if state.always_reject_me.load(Ordering::SeqCst) {
        return error_response(StatusCode::UNAUTHORIZED, "Access token expired");
    }

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    let valid = state
        .valid_access_tokens
        .lock()
        .unwrap()
        .contains(bearer);
    if !valid {
        return error_response(StatusCode::UNAUTHORIZED, "Access token expired");
    }

    (StatusCode::OK, Json(state.user_json()))
}

/// Start the fake backend on an ephemeral port.
pub async fn start_backend() -> Backend {
    let state = Arc::new(BackendState::default());
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    Backend { addr, state }
}

/// Build a session manager pointed at the fake backend.
pub fn manager_for(backend: &Backend, store: MemoryStore) -> SessionManager {
    let config = Config {
        api_base_url: Some(backend.base_url()),
        last_email: None,
    };
    SessionManager::with_store(&config, Box::new(store)).expect("Failed to build manager")
}

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
