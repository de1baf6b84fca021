//! Email channel — plain-text mail to self over SMTP (async lettre).
//!
//! Port 465 uses implicit TLS; any other port upgrades with STARTTLS.

use std::time::Duration;

use async_trait::async_trait;
use dormwatch_core::config::EmailChannelConfig;
use dormwatch_core::error::{Error, Result};
use dormwatch_core::traits::NotificationChannel;
use dormwatch_core::types::{ChannelKind, Notice};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub struct EmailChannel {
    config: EmailChannelConfig,
    timeout: Duration,
}

impl EmailChannel {
    pub fn new(config: EmailChannelConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Build the outgoing message: from and to the configured address.
    pub fn build_message(&self, notice: &Notice) -> Result<Message> {
        let mailbox: Mailbox = self
            .config
            .address
            .parse()
            .map_err(|e| Error::config(format!("Invalid EMAIL address: {e}")))?;

        Message::builder()
            .from(mailbox.clone())
            .to(mailbox)
            .subject(notice.title.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body.clone())
            .map_err(|e| Error::config(format!("Build email: {e}")))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if self.config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
        }
        .map_err(|e| Error::config(format!("SMTP relay {}: {e}", self.config.smtp_server)))?;

        let creds = Credentials::new(self.config.address.clone(), self.config.smtp_code.clone());
        Ok(builder
            .port(self.config.smtp_port)
            .credentials(creds)
            .timeout(Some(self.timeout))
            .build())
    }
}

fn map_smtp_error(e: lettre::transport::smtp::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("SMTP send: {e}"))
    } else if e.is_permanent() {
        // 5xx: bad credentials, rejected recipient; retrying will not help
        Error::channel(format!("SMTP send: {e}"))
    } else {
        Error::transport(format!("SMTP send: {e}"))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, notice: &Notice) -> Result<()> {
        let email = self.build_message(notice)?;
        let mailer = self.transport()?;
        mailer.send(email).await.map_err(map_smtp_error)?;

        tracing::info!("📤 Email sent to: {}", self.config.address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str) -> EmailChannelConfig {
        EmailChannelConfig {
            address: address.into(),
            smtp_code: "code".into(),
            smtp_server: "smtp.example.com".into(),
            smtp_port: 465,
        }
    }

    fn notice() -> Notice {
        Notice {
            title: "Dorm power warning".into(),
            body: "Lighting: 3.2 kWh\nBalance low, please top up soon!".into(),
        }
    }

    #[test]
    fn test_build_message_to_self() {
        let ch = EmailChannel::new(config("me@example.com"), Duration::from_secs(5));
        let msg = ch.build_message(&notice()).unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("From: me@example.com"));
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("Subject: Dorm power warning"));
        assert!(raw.contains("please top up soon!"));
    }

    #[test]
    fn test_invalid_address_is_config_error() {
        let ch = EmailChannel::new(config("not-an-address"), Duration::from_secs(5));
        let err = ch.build_message(&notice()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_transport_builds_for_both_tls_modes() {
        let implicit = EmailChannel::new(config("me@example.com"), Duration::from_secs(5));
        assert!(implicit.transport().is_ok());

        let mut cfg = config("me@example.com");
        cfg.smtp_port = 587;
        let starttls = EmailChannel::new(cfg, Duration::from_secs(5));
        assert!(starttls.transport().is_ok());
    }
}
