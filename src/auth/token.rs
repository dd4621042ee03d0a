use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::db::{RefreshTokenRecord, RefreshTokenStore};
use crate::error::{AppError, AuthError};

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    /// Role tag, carried by access tokens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub token_type: String,
    /// Random per-token id. Tokens minted for the same identity in the
    /// same second would otherwise be byte-identical under HS256.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signed token pair returned to the caller. Transient: only the refresh
/// component is persisted, as a `RefreshTokenRecord`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Mints signed access/refresh token pairs and persists the refresh half.
pub struct TokenIssuer {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl TokenIssuer {
    pub fn new(
        secret: String,
        access_ttl: Duration,
        refresh_ttl: Duration,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        Self {
            secret,
            access_ttl,
            refresh_ttl,
            refresh_tokens,
        }
    }

    /// Issue a signed pair for the identity and persist the refresh record.
    ///
    /// The pair is only returned once the refresh record is stored; a
    /// persistence failure yields an error and no tokens (partial issuance
    /// is not permitted).
    pub async fn issue_pair(&self, email: &str, role: &str) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let refresh_expires_at = now + self.refresh_ttl;

        let access_claims = Claims {
            email: email.to_string(),
            role: Some(role.to_string()),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            jti: new_token_id(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        let access_token = self.sign(&access_claims)?;

        let refresh_claims = Claims {
            email: email.to_string(),
            role: None,
            token_type: TOKEN_TYPE_REFRESH.to_string(),
            jti: new_token_id(),
            iat: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        };
        let refresh_token = self.sign(&refresh_claims)?;

        let record = RefreshTokenRecord::new(
            refresh_token.clone(),
            email.to_string(),
            refresh_expires_at,
        );
        self.refresh_tokens.save(&record).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Decode and validate a signed token, checking signature and expiry.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(data.claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::SigningFailure(e.to_string()))
    }
}

fn new_token_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
