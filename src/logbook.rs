//! Interaction log — append-only CSV record of every composed reply.
//!
//! One row per successfully composed reply, written before any delivery
//! attempt. Rows are never mutated or deleted. The `Rating` and
//! `Rating Reason` columns are reserved for manual annotation and always
//! written empty.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::LogError;

const HEADERS: [&str; 6] = [
    "Timestamp",
    "Sender",
    "Question",
    "Reply",
    "Rating",
    "Rating Reason",
];

/// One interaction: who asked what, and what was composed.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub question: String,
    pub reply: String,
}

/// Append-only CSV interaction log.
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, writing the header row first if the file does not
    /// exist yet. Every field is quoted.
    pub fn append(&self, record: &LogRecord) -> Result<(), LogError> {
        let write_header = !self.path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(HEADERS)?;
        }
        writer.write_record([
            record.timestamp.to_rfc3339().as_str(),
            record.sender.as_str(),
            record.question.trim(),
            record.reply.trim(),
            "",
            "",
        ])?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sender: &str, question: &str, reply: &str) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            sender: sender.into(),
            question: question.into(),
            reply: reply.into(),
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn header_written_once_then_rows_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(dir.path().join("log.csv"));

        log.append(&record("a@x.com", "Q1?", "R1")).unwrap();
        log.append(&record("b@y.com", "Q2?", "R2")).unwrap();

        let rows = read_rows(log.path());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], HEADERS.map(String::from).to_vec());
        assert_eq!(rows[1][1], "a@x.com");
        assert_eq!(rows[2][1], "b@y.com");
    }

    #[test]
    fn rating_columns_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(dir.path().join("log.csv"));
        log.append(&record("a@x.com", "Q?", "R")).unwrap();

        let rows = read_rows(log.path());
        assert_eq!(rows[1][4], "");
        assert_eq!(rows[1][5], "");
    }

    #[test]
    fn question_and_reply_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(dir.path().join("log.csv"));
        log.append(&record("a@x.com", "  padded?  ", "\nreply\n"))
            .unwrap();

        let rows = read_rows(log.path());
        assert_eq!(rows[1][2], "padded?");
        assert_eq!(rows[1][3], "reply");
    }

    #[test]
    fn multiline_reply_survives_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(dir.path().join("log.csv"));
        let reply = "Dear Ms. Lee,\n\nWelcome.\n\nBest Regards,\nMerit Academy of Music";
        log.append(&record("a@x.com", "Q?", reply)).unwrap();

        let rows = read_rows(log.path());
        assert_eq!(rows[1][3], reply);
    }
}
