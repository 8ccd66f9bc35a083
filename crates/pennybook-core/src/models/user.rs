use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account profile as returned by the login/register payloads and
/// `/auth/me`. Timestamps are optional: some backend responses omit
/// them, and the profile may be a partial snapshot until explicitly
/// refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}
