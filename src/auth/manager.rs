use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::auth::password;
use crate::auth::token::{TokenIssuer, TokenPair};
use crate::auth::verification::VerificationStore;
use crate::db::{CredentialStore, PendingVerification, RefreshTokenStore, UserCredential};
use crate::email::EmailSender;
use crate::error::{AppError, AuthError, DatabaseError};

/// Orchestrates the Register → Verify → Login → Refresh → Logout flow.
///
/// Owns no state of its own; each store is the sole mutator of its
/// records.
pub struct AuthManager {
    users: Arc<dyn CredentialStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    verification: Arc<VerificationStore>,
    issuer: TokenIssuer,
    mailer: Arc<dyn EmailSender>,
    verification_ttl: Duration,
}

impl AuthManager {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        verification: Arc<VerificationStore>,
        issuer: TokenIssuer,
        mailer: Arc<dyn EmailSender>,
        verification_ttl: Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            verification,
            issuer,
            mailer,
            verification_ttl,
        }
    }

    /// Start a registration: hash the password, store a pending record and
    /// send the one-time code. A failed delivery rolls the pending record
    /// back, so no dangling state survives.
    pub async fn register(&self, email: &str, plaintext: &str) -> Result<(), AppError> {
        if self.users.get_by_email(email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists.into());
        }

        if !self.verification.can_register(email).await {
            warn!(email, "registration rate limit hit");
            return Err(AuthError::TooManyAttempts.into());
        }

        let password_hash = password::hash(plaintext)?;
        let code = generate_verification_code();

        let pending = PendingVerification::new(
            email.to_string(),
            password_hash,
            code.clone(),
            Utc::now() + self.verification_ttl,
        );
        self.verification.save(pending).await;

        if let Err(e) = self.mailer.send_verification_code(email, &code).await {
            self.verification.delete(email).await;
            warn!(email, error = %e, "verification code delivery failed, pending record rolled back");
            return Err(e.into());
        }

        info!(email, "verification code sent");
        Ok(())
    }

    /// Confirm a registration code and activate the credential.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<(), AppError> {
        let pending = match self.verification.get_by_email(email).await {
            Some(pending) => pending,
            None => {
                // A stale record reads as absent; report it as expired
                // rather than invalid
                if self.verification.purge_expired(email).await {
                    return Err(AuthError::CodeExpired.into());
                }
                return Err(AuthError::InvalidCode.into());
            }
        };

        // The record can cross its expiry between lookup and here
        if pending.is_expired() {
            self.verification.delete(email).await;
            return Err(AuthError::CodeExpired.into());
        }

        // Exact, case-sensitive comparison
        if pending.code != code {
            return Err(AuthError::InvalidCode.into());
        }

        let user = UserCredential::new(pending.email, pending.password_hash);
        match self.users.create(&user).await {
            Ok(()) => {}
            Err(DatabaseError::Duplicate) => {
                self.verification.delete(email).await;
                return Err(AuthError::UserAlreadyExists.into());
            }
            Err(e) => return Err(e.into()),
        }

        self.verification.delete(email).await;
        info!(email, "user registered");
        Ok(())
    }

    /// Verify credentials and issue a token pair. Unknown users and wrong
    /// passwords are indistinguishable to the caller.
    pub async fn login(&self, email: &str, plaintext: &str) -> Result<TokenPair, AppError> {
        let user = match self.users.get_by_email(email).await? {
            Some(user) => user,
            None => {
                debug!(email, "login for unknown user");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !password::verify(&user.password_hash, plaintext)? {
            debug!(email, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let pair = self.issuer.issue_pair(&user.email, &user.role).await?;
        info!(email, "login succeeded");
        Ok(pair)
    }

    /// Rotate a refresh token: the presented record is consumed atomically
    /// before a new pair is issued, so it can never be redeemed twice —
    /// under concurrent presentation of the same token, at most one caller
    /// succeeds.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let record = match self.refresh_tokens.take(refresh_token).await? {
            Some(record) => record,
            None => return Err(AuthError::InvalidRefreshToken.into()),
        };

        if record.is_expired() {
            return Err(AuthError::RefreshTokenExpired.into());
        }

        let user = match self.users.get_by_email(&record.email).await? {
            Some(user) => user,
            None => {
                warn!(email = %record.email, "refresh token for missing user");
                return Err(AuthError::InvalidRefreshToken.into());
            }
        };

        let pair = self.issuer.issue_pair(&user.email, &user.role).await?;
        debug!(email = %user.email, "refresh token rotated");
        Ok(pair)
    }

    /// Drop a single session. Idempotent: an unknown token is a success.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        self.refresh_tokens.delete(refresh_token).await?;
        Ok(())
    }

    /// Hard revoke of every session the email owns.
    pub async fn revoke_all(&self, email: &str) -> Result<(), AppError> {
        self.refresh_tokens.delete_all_by_email(email).await?;
        info!(email, "all sessions revoked");
        Ok(())
    }
}

/// 6-character one-time code: 3 bytes from the OS entropy source,
/// hex-encoded.
fn generate_verification_code() -> String {
    let mut bytes = [0u8; 3];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_code_shape() {
        let code = generate_verification_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verification_codes_vary() {
        let codes: std::collections::HashSet<_> =
            (0..16).map(|_| generate_verification_code()).collect();
        assert!(codes.len() > 1);
    }
}
