//! Outbound email transport for verification codes.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use crate::config::SmtpConfig;
use crate::error::EmailError;

/// Delivery collaborator for one-time codes. Failure must be
/// distinguishable from success so registration can roll back.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), EmailError>;
}

/// SMTP mailer over lettre's async transport. Every send is bounded by a
/// timeout; an unconfigured host puts the mailer into no-op mode, which
/// logs instead of sending.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    send_timeout: Duration,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| EmailError::InvalidAddress(e.to_string()))?;

        let transport = if config.host.trim().is_empty() {
            warn!("SMTP host not configured; mailer running in no-op mode");
            None
        } else {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| EmailError::SendFailed(e.to_string()))?
                .port(config.port);

            if !config.username.is_empty() {
                builder = builder.credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ));
            }

            Some(builder.build())
        };

        Ok(Self {
            transport,
            from,
            send_timeout: Duration::from_secs(config.send_timeout_secs),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), EmailError> {
        let Some(transport) = &self.transport else {
            info!(to, code, "no-op mailer: skipping verification code send");
            return Ok(());
        };

        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| EmailError::InvalidAddress(e.to_string()))?;

        let body = format!(
            "Your registration verification code is: {code}\n\n\
            The code is valid for 10 minutes.\n\
            If you did not register, just ignore this email.",
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject("Your registration verification code")
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::BuildFailed(e.to_string()))?;

        // A stalled SMTP conversation must not stall registration
        match tokio::time::timeout(self.send_timeout, transport.send(message)).await {
            Ok(Ok(_)) => {
                info!(to, "verification code sent");
                Ok(())
            }
            Ok(Err(e)) => Err(EmailError::SendFailed(e.to_string())),
            Err(_) => Err(EmailError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_config() -> SmtpConfig {
        SmtpConfig {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "no-reply@pioneer.dev".to_string(),
            send_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_noop_mode_without_host() {
        let mailer = SmtpMailer::new(&noop_config()).unwrap();
        assert!(!mailer.is_enabled());
        mailer
            .send_verification_code("a@x.com", "abc123")
            .await
            .unwrap();
    }

    #[test]
    fn test_invalid_from_address_rejected() {
        let mut config = noop_config();
        config.from = "not an address".to_string();
        assert!(matches!(
            SmtpMailer::new(&config),
            Err(EmailError::InvalidAddress(_))
        ));
    }
}
