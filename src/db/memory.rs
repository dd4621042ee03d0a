//! In-memory store implementations, interchangeable with the Postgres ones
//! for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::db::models::{RefreshTokenRecord, UserCredential};
use crate::db::{CredentialStore, RefreshTokenStore};
use crate::error::DatabaseError;

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, UserCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<UserCredential>, DatabaseError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn create(&self, user: &UserCredential) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(DatabaseError::Duplicate);
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        if let Some(user) = self.users.write().await.get_mut(email) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&record.token) {
            return Err(DatabaseError::Duplicate);
        }
        tokens.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn get_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let mut tokens = self.tokens.write().await;
        Ok(tokens.get_mut(token).map(|record| {
            record.last_used = Utc::now();
            record.clone()
        }))
    }

    async fn take(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        // Single remove under the write lock: only one concurrent caller
        // can win the record
        Ok(self.tokens.write().await.remove(token))
    }

    async fn delete(&self, token: &str) -> Result<(), DatabaseError> {
        self.tokens.write().await.remove(token);
        Ok(())
    }

    async fn delete_all_by_email(&self, email: &str) -> Result<(), DatabaseError> {
        self.tokens
            .write()
            .await
            .retain(|_, record| record.email != email);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, DatabaseError> {
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| record.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}
