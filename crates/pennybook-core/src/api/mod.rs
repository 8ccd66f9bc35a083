//! REST client module for the Pennybook backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend: bearer-token authorization, device binding via the
//! `X-Device-ID` header, and automatic one-shot recovery from expired
//! access tokens.

pub mod client;
pub mod envelope;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
