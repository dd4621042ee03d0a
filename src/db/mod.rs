//! Persistence layer for credentials and refresh tokens.
//!
//! The stores are capability traits so the Postgres-backed and in-memory
//! implementations interchange freely; callers never reach into the
//! underlying tables or maps directly.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::error::DatabaseError;
pub use models::{PendingVerification, RefreshTokenRecord, UserCredential, ROLE_CLIENT};
pub use memory::{MemoryCredentialStore, MemoryRefreshTokenStore};
pub use postgres::{PgCredentialStore, PgRefreshTokenStore};

/// Store of activated user identities, keyed by unique email.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_by_email(&self, email: &str) -> Result<Option<UserCredential>, DatabaseError>;

    /// Inserts a new credential. Fails with `Duplicate` when the email is
    /// already taken.
    async fn create(&self, user: &UserCredential) -> Result<(), DatabaseError>;

    async fn update_password(&self, email: &str, password_hash: &str)
        -> Result<(), DatabaseError>;
}

/// Store of issued refresh tokens with last-used tracking.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Inserts a new record. Fails with `Duplicate` if the token value
    /// already exists (cryptographically implausible, still handled).
    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError>;

    /// Looks up a record and touches `last_used` as a side effect of a
    /// successful lookup.
    async fn get_by_token(&self, token: &str)
        -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Atomically removes and returns the record. At most one concurrent
    /// caller presenting the same token gets `Some`; this is what makes
    /// rotate-on-refresh single-use.
    async fn take(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Idempotent delete.
    async fn delete(&self, token: &str) -> Result<(), DatabaseError>;

    /// Hard revoke of every session owned by the email.
    async fn delete_all_by_email(&self, email: &str) -> Result<(), DatabaseError>;

    /// Sweep body: deletes every record past its expiry, returning the
    /// number removed. Scheduled periodically, callable directly in tests.
    async fn delete_expired(&self) -> Result<u64, DatabaseError>;
}
