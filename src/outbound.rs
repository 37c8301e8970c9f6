//! Email sink — SMTP delivery of composed replies.
//!
//! Delivery is an optional, explicitly-enabled step; the default mode logs
//! replies without sending anything. Delivery failures are transport
//! errors, distinct from composition failures, and never undo a log write.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;
use crate::error::TransportError;

/// Delivers a reply to a recipient.
#[async_trait]
pub trait EmailSink: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError>;
}

/// SMTP-backed sink.
pub struct SmtpSink {
    config: SmtpConfig,
}

impl SmtpSink {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn send_blocking(
        config: &SmtpConfig,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        let creds = Credentials::new(config.address.clone(), config.password.clone());

        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| TransportError::SendFailed {
                recipient: recipient.to_string(),
                reason: format!("SMTP relay error: {e}"),
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        let email = Message::builder()
            .from(config.address.parse().map_err(|e| TransportError::SendFailed {
                recipient: recipient.to_string(),
                reason: format!("Invalid from address: {e}"),
            })?)
            .to(recipient.parse().map_err(|e| TransportError::SendFailed {
                recipient: recipient.to_string(),
                reason: format!("Invalid recipient address: {e}"),
            })?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| TransportError::SendFailed {
                recipient: recipient.to_string(),
                reason: format!("Failed to build email: {e}"),
            })?;

        transport.send(&email).map_err(|e| TransportError::SendFailed {
            recipient: recipient.to_string(),
            reason: format!("SMTP send failed: {e}"),
        })?;

        tracing::info!(recipient, "Reply delivered");
        Ok(())
    }
}

#[async_trait]
impl EmailSink for SmtpSink {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        let config = self.config.clone();
        let recipient = recipient.to_string();
        let subject = subject.to_string();
        let body = body.to_string();
        tokio::task::spawn_blocking(move || {
            Self::send_blocking(&config, &recipient, &subject, &body)
        })
        .await
        .map_err(|e| TransportError::Protocol(format!("SMTP send task failed: {e}")))?
    }
}

/// Reply subject line for an inquiry subject.
pub fn reply_subject(original: Option<&str>) -> String {
    match original {
        Some(s) if !s.trim().is_empty() => {
            let s = s.trim();
            if s.to_lowercase().starts_with("re:") {
                s.to_string()
            } else {
                format!("Re: {s}")
            }
        }
        _ => "Re: your inquiry".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_subject_prefixes_re() {
        assert_eq!(reply_subject(Some("Piano lessons")), "Re: Piano lessons");
    }

    #[test]
    fn reply_subject_keeps_existing_re() {
        assert_eq!(reply_subject(Some("Re: Piano lessons")), "Re: Piano lessons");
        assert_eq!(reply_subject(Some("RE: rates")), "RE: rates");
    }

    #[test]
    fn reply_subject_handles_missing_subject() {
        assert_eq!(reply_subject(None), "Re: your inquiry");
        assert_eq!(reply_subject(Some("   ")), "Re: your inquiry");
    }
}
