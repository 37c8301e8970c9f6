//! Configuration, built once at startup from environment variables.
//!
//! Credentials come from the process environment (a `.env` file is loaded
//! in `main` via dotenvy). The resulting structs are passed explicitly to
//! every collaborator — nothing reads the environment after startup.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default mailbox label polled for inquiries.
const DEFAULT_MAILBOX: &str = "PianoInquiries";

/// Default path of the interaction log.
const DEFAULT_LOG_PATH: &str = "email_responses_log.csv";

/// Default completion model.
const DEFAULT_MODEL: &str = "gpt-4o";

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mailbox: MailboxConfig,
    pub smtp: SmtpConfig,
    pub completion: CompletionConfig,
    /// Path of the append-only interaction log.
    pub log_path: String,
    /// Whether composed replies are actually delivered. Off by default:
    /// the dominant mode is "log the reply, send nothing".
    pub send_replies: bool,
}

/// IMAP polling configuration.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    pub host: String,
    pub port: u16,
    /// Account address; also used to skip self-sent mail.
    pub address: String,
    pub password: String,
    /// Mailbox (Gmail label) selected before searching for unread mail.
    pub mailbox: String,
}

/// SMTP delivery configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub address: String,
    pub password: String,
}

/// Completion backend configuration.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

impl AppConfig {
    /// Build the full configuration from environment variables.
    ///
    /// Required: `EMAIL_ADDRESS`, `EMAIL_PASSWORD`, `IMAP_SERVER`,
    /// `SMTP_SERVER`, `OPENAI_API_KEY`. Everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let address = require("EMAIL_ADDRESS")?;
        let password = require("EMAIL_PASSWORD")?;
        let imap_host = require("IMAP_SERVER")?;
        let smtp_host = require("SMTP_SERVER")?;
        let api_key = require("OPENAI_API_KEY")?;

        let imap_port = parse_port("IMAP_PORT", 993)?;
        let smtp_port = parse_port("SMTP_PORT", 465)?;

        let mailbox = std::env::var("IMAP_MAILBOX").unwrap_or_else(|_| DEFAULT_MAILBOX.to_string());
        let log_path =
            std::env::var("REPLY_LOG_PATH").unwrap_or_else(|_| DEFAULT_LOG_PATH.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());

        let send_replies = std::env::var("SEND_REPLIES")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            mailbox: MailboxConfig {
                host: imap_host,
                port: imap_port,
                address: address.clone(),
                password: password.clone(),
                mailbox,
            },
            smtp: SmtpConfig {
                host: smtp_host,
                port: smtp_port,
                address,
                password,
            },
            completion: CompletionConfig {
                api_key: SecretString::from(api_key),
                model,
                base_url,
            },
            log_path,
            send_replies,
        })
    }
}

fn require(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn parse_port(key: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("not a valid port: {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_var_is_reported_by_name() {
        // SAFETY: no other test reads EMAIL_ADDRESS concurrently.
        unsafe { std::env::remove_var("EMAIL_ADDRESS") };
        let err = AppConfig::from_env().unwrap_err();
        match err {
            ConfigError::MissingEnvVar(name) => assert_eq!(name, "EMAIL_ADDRESS"),
            other => panic!("expected MissingEnvVar, got {other:?}"),
        }
    }

    #[test]
    fn port_parsing_rejects_garbage() {
        let err = {
            // SAFETY: variable is unique to this test.
            unsafe { std::env::set_var("INQUIRY_TEST_PORT", "not-a-port") };
            parse_port("INQUIRY_TEST_PORT", 993).unwrap_err()
        };
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn port_defaults_when_unset() {
        // SAFETY: variable is unique to this test.
        unsafe { std::env::remove_var("INQUIRY_TEST_PORT_UNSET") };
        assert_eq!(parse_port("INQUIRY_TEST_PORT_UNSET", 993).unwrap(), 993);
    }
}
