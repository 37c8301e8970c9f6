//! Error types for inquiry-assist.

/// Top-level error type for the responder.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Log error: {0}")]
    Log(#[from] LogError),
}

/// Configuration-related errors. Fatal at startup — nothing is processed
/// until the full configuration is present.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mailbox (IMAP) and delivery (SMTP) errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    #[error("TLS setup failed for {host}: {reason}")]
    Tls { host: String, reason: String },

    #[error("Authentication failed for {account}")]
    AuthFailed { account: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Failed to send reply to {recipient}: {reason}")]
    SendFailed { recipient: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Completion backend and reply-verification errors.
///
/// An inquiry whose composition fails with any of these is skipped —
/// never logged, never replied to.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Completion request failed: {0}")]
    Request(String),

    #[error("Completion backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid completion response: {0}")]
    Parse(String),

    #[error("Completion backend returned no content")]
    EmptyCompletion,

    #[error("Generated reply violates policy: {0}")]
    ConstraintViolation(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

/// Interaction log errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Failed to write log record: {0}")]
    Write(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the responder.
pub type Result<T> = std::result::Result<T, Error>;
