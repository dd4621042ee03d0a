pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod sweep;

use std::sync::Arc;

use actix_web::HttpResponse;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use auth::{AuthManager, TokenIssuer, VerificationStore};
use db::{CredentialStore, PgCredentialStore, PgRefreshTokenStore, RefreshTokenStore};
use email::{EmailSender, SmtpMailer};

pub use config::Settings;
pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;

/// Health check endpoint handler
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all request workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub db_pool: Option<Arc<PgPool>>,
    pub manager: Arc<AuthManager>,
    pub verification: Arc<VerificationStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl AppState {
    /// Production wiring: Postgres-backed stores over a connection pool.
    pub async fn new(config: Settings) -> Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
            .map_err(|e| {
                AppError::DatabaseError(error::DatabaseError::ConnectionError(e.to_string()))
            })?;
        let db_pool = Arc::new(db_pool);

        let users = Arc::new(PgCredentialStore::new(db_pool.clone()));
        let refresh_tokens = Arc::new(PgRefreshTokenStore::new(db_pool.clone()));
        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

        let mut state = Self::with_stores(config, users, refresh_tokens, mailer);
        state.db_pool = Some(db_pool);
        Ok(state)
    }

    /// Wiring over caller-supplied stores; the in-memory implementations
    /// drop in here for tests and local development.
    pub fn with_stores(
        config: Settings,
        users: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        let verification = Arc::new(VerificationStore::new());

        let issuer = TokenIssuer::new(
            config.auth.jwt_secret.clone(),
            Duration::seconds(config.auth.access_ttl_secs),
            Duration::seconds(config.auth.refresh_ttl_secs),
            refresh_tokens.clone(),
        );

        let manager = Arc::new(AuthManager::new(
            users,
            refresh_tokens.clone(),
            verification.clone(),
            issuer,
            mailer,
            Duration::seconds(config.auth.verification_ttl_secs),
        ));

        Self {
            config: Arc::new(config),
            db_pool: None,
            manager,
            verification,
            refresh_tokens,
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::{MemoryCredentialStore, MemoryRefreshTokenStore};

    struct NullMailer;

    #[async_trait::async_trait]
    impl EmailSender for NullMailer {
        async fn send_verification_code(
            &self,
            _to: &str,
            _code: &str,
        ) -> std::result::Result<(), error::EmailError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_state_with_memory_stores() {
        let config = Settings::new_for_test().expect("Failed to load test config");
        let state = AppState::with_stores(
            config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(NullMailer),
        );

        assert!(state.db_pool.is_none());
        state.manager.register("a@x.com", "Abcd1234!").await.unwrap();
        state.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_state_clone_shares_stores() {
        let config = Settings::new_for_test().expect("Failed to load test config");
        let state = AppState::with_stores(
            config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(NullMailer),
        );
        let cloned = state.clone();

        assert!(Arc::ptr_eq(&state.config, &cloned.config));
        assert!(Arc::ptr_eq(&state.manager, &cloned.manager));
        assert!(Arc::ptr_eq(&state.verification, &cloned.verification));
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.status(), actix_web::http::StatusCode::OK);
    }
}
