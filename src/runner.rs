//! Batch runner — one sequential pass over the currently-unread inquiries.
//!
//! Each inquiry is processed to completion before the next begins:
//! compose, append the log record, then (only when enabled) deliver. The
//! log write always precedes the delivery attempt. A generation failure
//! skips that inquiry — no log row, no reply — and the batch continues;
//! a mailbox failure is fatal for the whole batch.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::composer::ReplyComposer;
use crate::logbook::{InteractionLog, LogRecord};
use crate::mailbox::MailboxSource;
use crate::outbound::{EmailSink, reply_subject};

/// What one batch run did, for end-of-run diagnostics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub fetched: usize,
    pub skipped_empty: usize,
    pub composed: usize,
    pub generation_failures: usize,
    pub log_failures: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
}

/// Wires the collaborators together for one batch per invocation.
pub struct BatchRunner {
    mailbox: Arc<dyn MailboxSource>,
    composer: ReplyComposer,
    log: InteractionLog,
    sink: Arc<dyn EmailSink>,
    send_replies: bool,
}

impl BatchRunner {
    pub fn new(
        mailbox: Arc<dyn MailboxSource>,
        composer: ReplyComposer,
        log: InteractionLog,
        sink: Arc<dyn EmailSink>,
        send_replies: bool,
    ) -> Self {
        Self {
            mailbox,
            composer,
            log,
            sink,
            send_replies,
        }
    }

    /// Process the batch of currently-unread inquiries, in retrieval order.
    pub async fn run_once(&self) -> crate::error::Result<BatchSummary> {
        let inquiries = self.mailbox.fetch_unread().await?;
        let mut summary = BatchSummary {
            fetched: inquiries.len(),
            ..Default::default()
        };

        if inquiries.is_empty() {
            info!("No new messages");
            return Ok(summary);
        }

        for inquiry in &inquiries {
            if !inquiry.has_body() {
                warn!(sender = %inquiry.sender, "Skipping inquiry with empty body");
                summary.skipped_empty += 1;
                continue;
            }

            info!(
                sender = %inquiry.sender,
                subject = inquiry.subject.as_deref().unwrap_or("(no subject)"),
                "Replying to inquiry"
            );

            let reply = match self.composer.compose(inquiry).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(sender = %inquiry.sender, error = %e, "Composition failed, skipping");
                    summary.generation_failures += 1;
                    continue;
                }
            };
            summary.composed += 1;

            // The log record precedes any delivery attempt; a failed append
            // also suppresses delivery for this inquiry.
            let record = LogRecord {
                timestamp: Utc::now(),
                sender: inquiry.sender.clone(),
                question: inquiry.body.clone(),
                reply: reply.text.clone(),
            };
            if let Err(e) = self.log.append(&record) {
                error!(sender = %inquiry.sender, error = %e, "Failed to log interaction");
                summary.log_failures += 1;
                continue;
            }

            if !self.send_replies {
                continue;
            }
            let subject = reply_subject(inquiry.subject.as_deref());
            match self.sink.send(&inquiry.sender, &subject, &reply.text).await {
                Ok(()) => summary.delivered += 1,
                Err(e) => {
                    error!(sender = %inquiry.sender, error = %e, "Delivery failed");
                    summary.delivery_failures += 1;
                }
            }
        }

        info!(
            fetched = summary.fetched,
            composed = summary.composed,
            skipped_empty = summary.skipped_empty,
            generation_failures = summary.generation_failures,
            delivered = summary.delivered,
            "Batch complete"
        );
        Ok(summary)
    }
}
