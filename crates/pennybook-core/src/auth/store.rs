//! Durable credential storage.
//!
//! Exactly two secrets are persisted, under fixed key names: the
//! refresh token and the device id. Production uses the OS keychain
//! via the `keyring` crate; tests substitute an in-memory backend
//! through the `SecretStore` trait.

use std::sync::{Arc, OnceLock};

use keyring::Entry;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const SERVICE_NAME: &str = "pennybook";

/// Storage key for the refresh token
const KEY_REFRESH_TOKEN: &str = "refresh_token";

/// Storage key for the device id
const KEY_DEVICE_ID: &str = "device_id";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Secure storage error: {0}")]
    Platform(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Backend for OS-protected secret persistence.
pub trait SecretStore: Send + Sync {
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// OS keychain implementation of [`SecretStore`].
#[derive(Default)]
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(key: &str) -> StoreResult<Entry> {
        Entry::new(SERVICE_NAME, key).map_err(|e| StoreError::Platform(e.to_string()))
    }
}

impl SecretStore for KeyringStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        Self::entry(key)?
            .set_password(value)
            .map_err(|e| StoreError::Platform(e.to_string()))
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match Self::entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Platform(e.to_string())),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Platform(e.to_string())),
        }
    }
}

struct StoreInner {
    store: Box<dyn SecretStore>,
    /// Process-local device id used when the backing store cannot
    /// persist one. Device binding degrades for this process instead of
    /// blocking app usage.
    fallback_device_id: OnceLock<String>,
}

/// Credential store for the refresh token and device id.
///
/// Clone shares the underlying backend.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

impl CredentialStore {
    pub fn new(store: Box<dyn SecretStore>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                store,
                fallback_device_id: OnceLock::new(),
            }),
        }
    }

    /// Persist the refresh token, overwriting any prior value.
    ///
    /// Failures propagate: a token that cannot be persisted cannot be
    /// trusted to survive a restart, so the login or refresh that
    /// produced it must fail.
    pub fn store_refresh_token(&self, token: &str) -> StoreResult<()> {
        self.inner.store.set(KEY_REFRESH_TOKEN, token)
    }

    /// The stored refresh token, or `None` if absent.
    ///
    /// Read failures are treated as "no token": a storage glitch should
    /// force a re-login, not crash session restoration.
    pub fn refresh_token(&self) -> Option<String> {
        match self.inner.store.get(KEY_REFRESH_TOKEN) {
            Ok(token) => token,
            Err(error) => {
                warn!(%error, "refresh token read failed, treating as logged out");
                None
            }
        }
    }

    /// Delete the refresh token. Failures are logged and swallowed -
    /// logout must always succeed locally.
    pub fn remove_refresh_token(&self) {
        if let Err(error) = self.inner.store.delete(KEY_REFRESH_TOKEN) {
            warn!(%error, "failed to remove refresh token from secure storage");
        }
    }

    /// Whether a refresh token is stored. Used at startup to decide
    /// whether session restoration is worth attempting.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token().is_some()
    }

    /// The persisted device id, generating and persisting one on first
    /// run.
    ///
    /// When the store cannot persist a new id, a process-local one is
    /// generated once and reused for the rest of the process.
    pub fn device_id(&self) -> String {
        // Once degraded, stay on the process-local id for consistency
        if let Some(id) = self.inner.fallback_device_id.get() {
            return id.clone();
        }

        match self.inner.store.get(KEY_DEVICE_ID) {
            Ok(Some(id)) => id,
            Ok(None) => {
                let id = Uuid::new_v4().to_string();
                match self.inner.store.set(KEY_DEVICE_ID, &id) {
                    Ok(()) => {
                        info!("generated new device id");
                        id
                    }
                    Err(error) => {
                        warn!(%error, "could not persist device id, using a process-local one");
                        self.inner.fallback_device_id.get_or_init(|| id).clone()
                    }
                }
            }
            Err(error) => {
                warn!(%error, "device id read failed, using a process-local one");
                self.inner
                    .fallback_device_id
                    .get_or_init(|| Uuid::new_v4().to_string())
                    .clone()
            }
        }
    }
}
