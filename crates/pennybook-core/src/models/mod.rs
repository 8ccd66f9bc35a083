//! Data models for Pennybook entities.
//!
//! This module contains the data structures shared with the backend:
//!
//! - `User`: the account profile snapshot
//! - `TokenPair`, `AuthPayload`: credentials issued by the auth endpoints
//!
//! With the `ts` feature enabled, the types export TypeScript
//! definitions for the mobile app.

pub mod auth;
pub mod user;

pub use auth::{AuthPayload, TokenPair};
pub use user::User;
