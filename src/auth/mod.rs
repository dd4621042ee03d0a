//! Credential and token lifecycle for the Pioneer booking platform.
//!
//! Registration with email-verified activation, Argon2id password
//! hashing, signed short-lived access tokens and rotating single-use
//! refresh tokens.

pub mod handlers;
mod manager;
pub mod password;
mod token;
mod verification;

pub use manager::AuthManager;
pub use token::{Claims, TokenIssuer, TokenPair, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};
pub use verification::VerificationStore;
