//! Mailbox source — fetches unread inquiries over IMAP.
//!
//! Raw IMAP over rustls TLS: LOGIN, SELECT the configured label, SEARCH
//! UNSEEN, FETCH each message, mark it \Seen. Marking \Seen is what keeps
//! repeated runs from redelivering the same inquiry. Messages are parsed
//! with mail-parser; plain text is preferred, HTML is stripped as a
//! fallback.

use std::io::Write as IoWrite;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use uuid::Uuid;

use crate::config::MailboxConfig;
use crate::error::TransportError;

/// One inbound message requesting information. Produced by the mailbox,
/// consumed once by the batch runner.
#[derive(Debug, Clone)]
pub struct Inquiry {
    /// Message-ID header, or a generated id when absent.
    pub message_id: String,
    /// Sender address.
    pub sender: String,
    /// Sender display name, when the From header carries one.
    pub sender_name: Option<String>,
    pub subject: Option<String>,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl Inquiry {
    /// Empty-body inquiries are skipped upstream, never composed.
    pub fn has_body(&self) -> bool {
        !self.body.trim().is_empty()
    }
}

/// Yields the batch of currently-unread inquiries, in stable retrieval
/// order, consuming them so repeated calls do not redeliver.
#[async_trait]
pub trait MailboxSource: Send + Sync {
    async fn fetch_unread(&self) -> Result<Vec<Inquiry>, TransportError>;
}

/// IMAP-backed mailbox.
pub struct ImapMailbox {
    config: MailboxConfig,
}

impl ImapMailbox {
    pub fn new(config: MailboxConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailboxSource for ImapMailbox {
    async fn fetch_unread(&self) -> Result<Vec<Inquiry>, TransportError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || fetch_unread_blocking(&config))
            .await
            .map_err(|e| TransportError::Protocol(format!("IMAP fetch task failed: {e}")))?
    }
}

// ── IMAP session ────────────────────────────────────────────────────

/// A logged-in IMAP session over TLS. Blocking — run via spawn_blocking.
struct ImapSession {
    stream: rustls::StreamOwned<rustls::ClientConnection, TcpStream>,
    host: String,
    tag: u32,
}

impl ImapSession {
    fn connect(config: &MailboxConfig) -> Result<Self, TransportError> {
        let tcp = TcpStream::connect((&*config.host, config.port)).map_err(|e| {
            TransportError::Connect {
                host: config.host.clone(),
                reason: e.to_string(),
            }
        })?;
        tcp.set_read_timeout(Some(Duration::from_secs(30)))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name: rustls::pki_types::ServerName<'_> =
            rustls::pki_types::ServerName::try_from(config.host.clone()).map_err(|e| {
                TransportError::Tls {
                    host: config.host.clone(),
                    reason: e.to_string(),
                }
            })?;
        let conn =
            rustls::ClientConnection::new(tls_config, server_name).map_err(|e| TransportError::Tls {
                host: config.host.clone(),
                reason: e.to_string(),
            })?;

        let mut session = Self {
            stream: rustls::StreamOwned::new(conn, tcp),
            host: config.host.clone(),
            tag: 0,
        };
        // Server greeting.
        session.read_line()?;
        Ok(session)
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match std::io::Read::read(&mut self.stream, &mut byte) {
                Ok(0) => {
                    return Err(TransportError::Protocol(format!(
                        "IMAP connection to {} closed",
                        self.host
                    )));
                }
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send one tagged command and read until its tagged completion line.
    fn command(&mut self, cmd: &str) -> Result<Vec<String>, TransportError> {
        self.tag += 1;
        let tag = format!("A{}", self.tag);
        let full = format!("{tag} {cmd}\r\n");
        IoWrite::write_all(&mut self.stream, full.as_bytes())?;
        IoWrite::flush(&mut self.stream)?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(&tag);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    fn login(&mut self, user: &str, password: &str) -> Result<(), TransportError> {
        let response = self.command(&format!("LOGIN \"{user}\" \"{password}\""))?;
        if completed_ok(&response) {
            Ok(())
        } else {
            Err(TransportError::AuthFailed {
                account: user.to_string(),
            })
        }
    }

    fn select(&mut self, mailbox: &str) -> Result<(), TransportError> {
        let response = self.command(&format!("SELECT \"{mailbox}\""))?;
        if completed_ok(&response) {
            Ok(())
        } else {
            Err(TransportError::Protocol(format!(
                "SELECT {mailbox:?} failed"
            )))
        }
    }

    /// Sequence numbers of unseen messages, in mailbox order.
    fn search_unseen(&mut self) -> Result<Vec<String>, TransportError> {
        let response = self.command("SEARCH UNSEEN")?;
        let mut ids = Vec::new();
        for line in &response {
            if line.starts_with("* SEARCH") {
                ids.extend(
                    line.split_whitespace()
                        .skip(2)
                        .map(|s| s.trim().to_string()),
                );
            }
        }
        Ok(ids)
    }

    /// Fetch one message's raw RFC822 text.
    fn fetch_raw(&mut self, id: &str) -> Result<String, TransportError> {
        let response = self.command(&format!("FETCH {id} RFC822"))?;
        // First line is the untagged FETCH envelope, the last two are the
        // closing paren and tagged completion.
        Ok(response
            .iter()
            .skip(1)
            .take(response.len().saturating_sub(2))
            .cloned()
            .collect())
    }

    fn mark_seen(&mut self, id: &str) {
        let _ = self.command(&format!("STORE {id} +FLAGS (\\Seen)"));
    }

    fn logout(mut self) {
        let _ = self.command("LOGOUT");
    }
}

fn completed_ok(response: &[String]) -> bool {
    response
        .last()
        .is_some_and(|line| line.split_whitespace().nth(1) == Some("OK"))
}

// ── Fetch ───────────────────────────────────────────────────────────

fn fetch_unread_blocking(config: &MailboxConfig) -> Result<Vec<Inquiry>, TransportError> {
    let mut session = ImapSession::connect(config)?;
    session.login(&config.address, &config.password)?;
    session.select(&config.mailbox)?;

    let ids = session.search_unseen()?;
    tracing::info!(count = ids.len(), mailbox = %config.mailbox, "Unread inquiries");

    let mut inquiries = Vec::new();
    for id in &ids {
        let raw = session.fetch_raw(id)?;
        match parse_inquiry(raw.as_bytes()) {
            Some(inquiry) => {
                if inquiry.sender.eq_ignore_ascii_case(&config.address) {
                    tracing::debug!(message_id = %inquiry.message_id, "Skipping self-sent message");
                } else {
                    inquiries.push(inquiry);
                }
            }
            None => {
                tracing::warn!(id = %id, "Unparseable message, marking seen and skipping");
            }
        }
        session.mark_seen(id);
    }

    session.logout();
    Ok(inquiries)
}

/// Parse one raw RFC822 message into an [`Inquiry`].
///
/// Returns `None` when the message cannot be parsed at all.
pub(crate) fn parse_inquiry(raw: &[u8]) -> Option<Inquiry> {
    let parsed = MessageParser::default().parse(raw)?;

    let (sender, sender_name) = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .map(|addr| {
            (
                addr.address().map(|s| s.to_string()),
                addr.name().map(|s| s.to_string()),
            )
        })
        .unwrap_or((None, None));
    let sender = sender.unwrap_or_else(|| "unknown".to_string());

    let subject = parsed.subject().map(|s| s.to_string());
    let body = extract_text(&parsed);

    let message_id = parsed
        .message_id()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("gen-{}", Uuid::new_v4()));

    let received_at = parsed
        .date()
        .and_then(|d| {
            chrono::NaiveDate::from_ymd_opt(
                i32::from(d.year),
                u32::from(d.month),
                u32::from(d.day),
            )
            .and_then(|date| {
                date.and_hms_opt(u32::from(d.hour), u32::from(d.minute), u32::from(d.second))
            })
            .map(|naive| naive.and_utc())
        })
        .unwrap_or_else(Utc::now);

    Some(Inquiry {
        message_id,
        sender,
        sender_name,
        subject,
        body,
        received_at,
    })
}

/// Readable text from a parsed message: plain text part, else stripped HTML.
fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    String::new()
}

/// Strip HTML tags from content (basic).
pub(crate) fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
