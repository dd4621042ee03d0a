use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::{RefreshTokenRecord, UserCredential};
use crate::db::{CredentialStore, RefreshTokenStore};
use crate::error::DatabaseError;

/// Postgres-backed credential store over the `users` table.
pub struct PgCredentialStore {
    pool: Arc<PgPool>,
}

impl PgCredentialStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<UserCredential>, DatabaseError> {
        let user = sqlx::query_as::<_, UserCredential>(
            "SELECT email, password_hash, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn create(&self, user: &UserCredential) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3)")
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(email)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}

/// Postgres-backed refresh token store over the `refresh_tokens` table.
///
/// Every operation is a single statement, so lookup+touch and
/// find-and-delete are atomic with respect to concurrent callers.
pub struct PgRefreshTokenStore {
    pool: Arc<PgPool>,
}

impl PgRefreshTokenStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, email, expires_at, last_used, device_info)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.token)
        .bind(&record.email)
        .bind(record.expires_at)
        .bind(record.last_used)
        .bind(&record.device_info)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn get_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            UPDATE refresh_tokens
            SET last_used = NOW()
            WHERE token = $1
            RETURNING token, email, expires_at, last_used, device_info
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn take(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token = $1
            RETURNING token, email, expires_at, last_used, device_info
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn delete(&self, token: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn delete_all_by_email(&self, email: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE email = $1")
            .bind(email)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < NOW()")
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }
}
