//! Core domain types for chatheat
//!
//! Characters, log file listings, storage paths, and the raw message
//! records read out of chat logs. The store changed its encodings across
//! versions; raw records are validated only as far as serde needs to read
//! a line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path_candidates::{encode_component, escape_url_delimiters};

/// Strongly-typed character identifier
///
/// The host application identifies characters by position in its character
/// list, so the id is only stable for the lifetime of one listing.
///
/// # Examples
/// ```
/// use chatheat_core::types::CharacterId;
///
/// let id = CharacterId::new("7");
/// assert_eq!(id.as_str(), "7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(String);

impl CharacterId {
    /// Create a new CharacterId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A character known to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInfo {
    /// Identifier assigned by the store
    pub id: CharacterId,
    /// Human-readable name
    pub display_name: String,
    /// Avatar file name, e.g. `Seraphina.png`
    pub avatar: Option<String>,
}

impl CharacterInfo {
    /// Whether the character carries a usable avatar reference
    pub fn has_avatar(&self) -> bool {
        self.avatar.as_deref().is_some_and(|a| !a.trim().is_empty())
    }

    /// Match a user-supplied name against display name or avatar file name
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.display_name.eq_ignore_ascii_case(query)
            || self.avatar.as_deref().is_some_and(|avatar| {
                avatar.eq_ignore_ascii_case(query)
                    || avatar_stem(avatar).eq_ignore_ascii_case(query)
            })
    }
}

/// Strip the last extension off an avatar file name
pub fn avatar_stem(avatar: &str) -> &str {
    match avatar.rfind('.') {
        Some(pos) if pos > 0 => &avatar[..pos],
        _ => avatar,
    }
}

/// Metadata for one chat log, without its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileInfo {
    /// File name including extension, e.g. `Seraphina - 2024-01-05@23h30m15s.jsonl`
    pub file_name: String,
    /// Size in bytes, when the store reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Date of the last message as reported by the store (free-form)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

impl LogFileInfo {
    /// Create a listing entry with only a file name
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes: None,
            last_message: None,
        }
    }
}

/// A guessed location of one log file in the store
///
/// `encode` selects whether the folder and file segments are
/// percent-encoded before they reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath {
    pub folder: String,
    pub file_name: String,
    pub encode: bool,
}

impl StoragePath {
    /// Folder segment as the store should see it
    pub fn folder_segment(&self) -> String {
        if self.encode {
            encode_component(&self.folder)
        } else {
            self.folder.clone()
        }
    }

    /// File segment as the store should see it
    pub fn file_segment(&self) -> String {
        if self.encode {
            encode_component(&self.file_name)
        } else {
            self.file_name.clone()
        }
    }

    /// Path relative to the store root, `chats/<folder>/<file>`
    pub fn relative(&self) -> String {
        format!("chats/{}/{}", self.folder_segment(), self.file_segment())
    }

    /// Path relative to a server root, safe to append to a URL
    ///
    /// Raw segments keep their spelling apart from `#`, `?` and `%`, which
    /// would otherwise end the path or start an escape.
    pub fn url_path(&self) -> String {
        if self.encode {
            return self.relative();
        }
        format!(
            "chats/{}/{}",
            escape_url_delimiters(&self.folder),
            escape_url_delimiters(&self.file_name)
        )
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative())
    }
}

/// A timestamp exactly as the store wrote it
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Epoch milliseconds
    Millis(f64),
    /// One of several textual encodings
    Text(String),
}

impl RawTimestamp {
    /// Build from an arbitrary JSON value; anything that is neither a
    /// nonzero number nor a non-blank string carries no date.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .filter(|millis| *millis != 0.0)
                .map(RawTimestamp::Millis),
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                Some(RawTimestamp::Text(s.clone()))
            }
            _ => None,
        }
    }
}

/// Wire shape of one chat log line
///
/// Lines that are not messages (the chat header, for instance) still
/// deserialize; they simply have no `send_date`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChatRecord {
    #[serde(default)]
    pub send_date: Option<serde_json::Value>,
    #[serde(default)]
    pub mes: Option<String>,
    #[serde(default)]
    pub swipes: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub user_name: Option<serde_json::Value>,
    #[serde(default)]
    pub character_name: Option<serde_json::Value>,
    #[serde(default)]
    pub chat_metadata: Option<serde_json::Value>,
}

impl RawChatRecord {
    /// Whether the line is a message or a chat header rather than some
    /// other JSON object, such as an error reply
    pub fn is_chat_record(&self) -> bool {
        self.send_date.is_some()
            || self.mes.is_some()
            || self.user_name.is_some()
            || self.character_name.is_some()
            || self.chat_metadata.is_some()
    }
}

/// A message record as produced by the store, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// Send date in whatever encoding the store used
    pub send_date: Option<RawTimestamp>,
    /// Message body, possibly empty
    pub text: String,
    /// Number of stored alternatives for this turn, at least 1
    pub variant_count: u32,
}

impl RawMessage {
    /// Create a message with a single variant
    pub fn new(send_date: Option<RawTimestamp>, text: impl Into<String>) -> Self {
        Self {
            send_date,
            text: text.into(),
            variant_count: 1,
        }
    }

    /// Set the number of stored variants (clamped to at least 1)
    pub fn with_variants(mut self, variant_count: u32) -> Self {
        self.variant_count = variant_count.max(1);
        self
    }

    /// Convert a wire record into a message
    pub fn from_record(record: RawChatRecord) -> Self {
        let variant_count = record
            .swipes
            .as_ref()
            .map(|swipes| u32::try_from(swipes.len()).unwrap_or(u32::MAX))
            .unwrap_or(1)
            .max(1);

        Self {
            send_date: record.send_date.as_ref().and_then(RawTimestamp::from_json),
            text: record.mes.unwrap_or_default(),
            variant_count,
        }
    }
}

/// A message whose send date resolved to an instant
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub variant_count: u32,
}
