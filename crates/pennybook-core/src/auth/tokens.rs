use std::sync::{Arc, Mutex};

/// In-memory holder for the current access token.
///
/// The token lives for the life of the process or until replaced or
/// cleared; it is never written to disk. Clone shares the underlying
/// slot, so the request pipeline and the refresh coordinator observe
/// the same value.
#[derive(Clone, Default)]
pub struct AccessTokenCache {
    inner: Arc<Mutex<Option<String>>>,
}

impl AccessTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current token.
    pub fn set(&self, token: String) {
        *self.inner.lock().unwrap() = Some(token);
    }

    /// The current token, if any.
    pub fn get(&self) -> Option<String> {
        self.inner.lock().unwrap().clone()
    }

    /// Drop the current token.
    pub fn clear(&self) {
        *self.inner.lock().unwrap() = None;
    }

    pub fn is_present(&self) -> bool {
        self.inner.lock().unwrap().is_some()
    }
}
