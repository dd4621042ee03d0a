use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role tag assigned to every account created through self-registration.
pub const ROLE_CLIENT: &str = "client";

/// An activated user identity, keyed by unique email.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserCredential {
    pub email: String,
    /// Argon2id PHC hash. Never serialized outward.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
}

impl UserCredential {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            email,
            password_hash,
            role: ROLE_CLIENT.to_string(),
        }
    }
}

/// A persisted refresh token. Single-use: consumed by rotation, logout or
/// the expiry sweep.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub device_info: Option<String>,
}

impl RefreshTokenRecord {
    pub fn new(token: String, email: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            email,
            expires_at,
            last_used: Utc::now(),
            device_info: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// An unconfirmed registration awaiting its email code. Held in memory
/// only; at most one live record per email.
#[derive(Debug, Clone)]
pub struct PendingVerification {
    pub email: String,
    pub password_hash: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingVerification {
    pub fn new(email: String, password_hash: String, code: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            email,
            password_hash,
            code,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
