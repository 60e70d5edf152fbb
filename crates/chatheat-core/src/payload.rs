//! Parsing of retrieved chat log payloads
//!
//! Logs are JSON Lines: a header line followed by one message per line.
//! Some store endpoints return the same records as a single JSON array
//! instead. A web server that cannot find a file may also answer with an
//! HTML page and a success status, so "it came back" is not the same as
//! "it is a log".

use thiserror::Error;
use tracing::trace;

use crate::types::{RawChatRecord, RawMessage};

/// Openings of error pages served in place of a file
const HTML_PREFIXES: &[&str] = &["<!doctype", "<html", "<head", "<body", "<?xml"];

/// Why a payload was not accepted as a chat log
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("empty payload")]
    Empty,
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("payload looks like an HTML page")]
    Html,
    #[error("no line of the payload is a chat record")]
    NoRecords,
}

/// Parse a retrieved file into message records
///
/// Lines that are not chat messages or headers are skipped; the payload is
/// rejected only when nothing usable remains.
pub fn parse_payload(bytes: &[u8]) -> Result<Vec<RawMessage>, PayloadError> {
    let text = std::str::from_utf8(bytes).map_err(|_| PayloadError::NotUtf8)?;
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Err(PayloadError::Empty);
    }
    if looks_like_html(text) {
        return Err(PayloadError::Html);
    }

    if text.starts_with('[')
        && let Ok(records) = serde_json::from_str::<Vec<serde_json::Value>>(text)
    {
        let messages: Vec<RawMessage> = records
            .into_iter()
            .filter(|value| value.is_object())
            .filter_map(|value| serde_json::from_value::<RawChatRecord>(value).ok())
            .filter(RawChatRecord::is_chat_record)
            .map(RawMessage::from_record)
            .collect();
        return if messages.is_empty() {
            Err(PayloadError::NoRecords)
        } else {
            Ok(messages)
        };
    }

    let mut messages = Vec::new();
    let mut skipped = 0usize;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('{') {
            skipped += 1;
            continue;
        }
        match serde_json::from_str::<RawChatRecord>(line) {
            Ok(record) if record.is_chat_record() => {
                messages.push(RawMessage::from_record(record))
            }
            Ok(_) => skipped += 1,
            Err(e) => {
                skipped += 1;
                trace!("Skipping malformed chat line: {}", e);
            }
        }
    }

    if skipped > 0 {
        trace!("Skipped {} unreadable lines", skipped);
    }

    if messages.is_empty() {
        Err(PayloadError::NoRecords)
    } else {
        Ok(messages)
    }
}

fn looks_like_html(text: &str) -> bool {
    let head = text.chars().take(16).collect::<String>().to_ascii_lowercase();
    HTML_PREFIXES.iter().any(|prefix| head.starts_with(prefix))
}
