use serde::{Deserialize, Serialize};

use super::User;

/// Access/refresh token pair issued by `/auth/login`, `/auth/register`
/// and `/auth/refresh`.
///
/// The access token lives only in memory for the life of the process;
/// the refresh token is handed straight to the credential store and is
/// replaced by the server on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Combined response shape of the login and register endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthPayload {
    pub user: User,
    pub tokens: TokenPair,
}
