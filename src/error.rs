use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Email error: {0}")]
    EmailError(#[from] EmailError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl AppError {
    /// Message safe to return to the caller. Credential and refresh-token
    /// failures are collapsed so responses cannot be used to enumerate
    /// accounts or distinguish an expired token from a forged one.
    fn public_message(&self) -> String {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::InvalidRefreshToken | AuthError::RefreshTokenExpired => {
                    "Invalid or expired refresh token".to_string()
                }
                AuthError::HashingFailure(_)
                | AuthError::CorruptHash(_)
                | AuthError::SigningFailure(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
            AppError::ValidationError(msg) => msg.clone(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": self.public_message()
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidCode | AuthError::CodeExpired => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::InvalidToken
                | AuthError::InvalidRefreshToken
                | AuthError::RefreshTokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                AuthError::HashingFailure(_)
                | AuthError::CorruptHash(_)
                | AuthError::SigningFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(DatabaseError::NotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired")]
    CodeExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Too many registration attempts")]
    TooManyAttempts,

    #[error("Password hashing failed: {0}")]
    HashingFailure(String),

    #[error("Stored password hash is malformed: {0}")]
    CorruptHash(String),

    #[error("Token signing failed: {0}")]
    SigningFailure(String),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            // 23505 is the Postgres unique_violation class
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                DatabaseError::Duplicate
            }
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    BuildFailed(String),

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("Send timed out")]
    Timeout,
}
