//! Common test utilities for chatheat integration tests
//!
//! [`MockStore`] is an in-memory chat archive that records every retrieval
//! attempt and how many retrievals were in flight at once.

#![allow(dead_code)]

use async_trait::async_trait;
use chatheat::error::{HeatmapError, Result};
use chatheat::provider::HistoryStore;
use chatheat::types::{CharacterId, CharacterInfo, LogFileInfo, RawMessage, StoragePath};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory store with retrieval bookkeeping
#[derive(Default)]
pub struct MockStore {
    characters: Vec<CharacterInfo>,
    logs: HashMap<String, Vec<LogFileInfo>>,
    files: HashMap<String, Vec<u8>>,
    current: HashMap<String, Vec<RawMessage>>,
    broken_listings: HashSet<String>,
    delay: Option<Duration>,
    attempts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a character whose avatar is `<name>.png`
    pub fn with_character(mut self, name: &str) -> Self {
        self.characters.push(CharacterInfo {
            id: CharacterId::new(self.characters.len().to_string()),
            display_name: name.to_string(),
            avatar: Some(format!("{name}.png")),
        });
        self
    }

    /// Add a character the store lists without an avatar
    pub fn with_bare_character(mut self, name: &str) -> Self {
        self.characters.push(CharacterInfo {
            id: CharacterId::new(self.characters.len().to_string()),
            display_name: name.to_string(),
            avatar: None,
        });
        self
    }

    /// List `file_name` for `name` and store `body` under `stored_at`
    pub fn with_log(mut self, name: &str, file_name: &str, stored_at: &StoragePath, body: &str) -> Self {
        self.logs
            .entry(name.to_string())
            .or_default()
            .push(LogFileInfo::new(file_name));
        self.files.insert(stored_at.relative(), body.as_bytes().to_vec());
        self
    }

    /// List `file_name` for `name` in the raw folder named after the character
    pub fn with_plain_log(self, name: &str, file_name: &str, body: &str) -> Self {
        let path = StoragePath {
            folder: name.to_string(),
            file_name: file_name.to_string(),
            encode: false,
        };
        self.with_log(name, file_name, &path, body)
    }

    /// List a file for `name` that exists nowhere
    pub fn with_missing_log(mut self, name: &str, file_name: &str) -> Self {
        self.logs
            .entry(name.to_string())
            .or_default()
            .push(LogFileInfo::new(file_name));
        self
    }

    pub fn with_current(mut self, name: &str, messages: Vec<RawMessage>) -> Self {
        self.current.insert(name.to_string(), messages);
        self
    }

    pub fn with_broken_listing(mut self, name: &str) -> Self {
        self.broken_listings.insert(name.to_string());
        self
    }

    /// Hold every retrieval for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Relative paths requested so far, in request order
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Most retrievals ever in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryStore for MockStore {
    async fn list_characters(&self) -> Result<Vec<CharacterInfo>> {
        Ok(self.characters.clone())
    }

    async fn list_log_files(&self, character: &CharacterInfo) -> Result<Vec<LogFileInfo>> {
        if self.broken_listings.contains(&character.display_name) {
            return Err(HeatmapError::Store("listing failed".to_string()));
        }
        Ok(self
            .logs
            .get(&character.display_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn retrieve_file(&self, path: &StoragePath) -> Result<Option<Vec<u8>>> {
        let key = path.relative();
        self.attempts.lock().unwrap().push(key.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(self.files.get(&key).cloned())
    }

    async fn current_conversation(
        &self,
        character: &CharacterInfo,
    ) -> Result<Option<Vec<RawMessage>>> {
        Ok(self.current.get(&character.display_name).cloned())
    }
}

/// A JSONL chat: a header line, then one message per send date
pub fn chat_log(send_dates: &[&str]) -> String {
    let mut log = String::from("{\"user_name\":\"User\",\"character_name\":\"Test\"}\n");
    for date in send_dates {
        log.push_str(&format!("{{\"send_date\":\"{date}\",\"mes\":\"hello\"}}\n"));
    }
    log
}
