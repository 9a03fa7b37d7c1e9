//! Bearer token model
//!
//! Tokens are opaque: the client holds `"{id}|{secret}"` while only the
//! sha256 digest of the secret is ever persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub token_hash: String,
    pub abilities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// New token creation payload
#[derive(Debug, Clone)]
pub struct NewToken {
    pub user_id: i64,
    pub name: String,
    pub token_hash: String,
    pub abilities: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
