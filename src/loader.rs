//! History loading
//!
//! Listings come from the store; individual log files are located by trying
//! guessed storage paths in order. Two pools bound the work: characters run
//! a few at a time, and each character runs a few files at a time, so the
//! number of retrievals in flight stays near the product of the two limits.
//!
//! Failures below the character listing are absorbed: a file that cannot be
//! found under any guess contributes nothing, and a character whose listing
//! fails contributes nothing. Only a failed character listing reaches the
//! caller.

use crate::error::{HeatmapError, Result};
use crate::path_candidates::{PathCandidate, path_candidates};
use crate::payload::parse_payload;
use crate::pool::{first_success, run_bounded};
use crate::provider::HistoryStore;
use crate::types::{CharacterInfo, LogFileInfo, RawMessage};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of characters loaded at once
pub const DEFAULT_CHARACTER_CONCURRENCY: usize = 3;
/// Default number of files retrieved at once per character
pub const DEFAULT_FILE_CONCURRENCY: usize = 5;

/// Concurrency limits for the two loading tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub character_concurrency: usize,
    pub file_concurrency: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            character_concurrency: DEFAULT_CHARACTER_CONCURRENCY,
            file_concurrency: DEFAULT_FILE_CONCURRENCY,
        }
    }
}

/// Finds and reads one log file by trying storage path guesses in order
pub struct LogFileResolver<'a> {
    store: &'a dyn HistoryStore,
}

impl<'a> LogFileResolver<'a> {
    pub fn new(store: &'a dyn HistoryStore) -> Self {
        Self { store }
    }

    /// Messages of `log`, or an empty list when no guess yields a usable file
    ///
    /// Guesses are tried one at a time and the first usable payload wins, so
    /// later guesses are never requested.
    pub async fn resolve(&self, character: &CharacterInfo, log: &LogFileInfo) -> Vec<RawMessage> {
        let candidates = path_candidates(
            &character.id,
            character.avatar.as_deref().unwrap_or_default(),
            &log.file_name,
        );

        let outcome = first_success(candidates, |candidate| self.attempt(candidate, log)).await;
        match outcome {
            Ok(messages) => messages,
            Err(misses) => {
                for miss in &misses {
                    debug!("{}", miss);
                }
                debug!(
                    "No usable copy of {} for {} after {} guesses",
                    log.file_name,
                    character.display_name,
                    misses.len()
                );
                Vec::new()
            }
        }
    }

    async fn attempt(
        &self,
        candidate: PathCandidate,
        log: &LogFileInfo,
    ) -> std::result::Result<Vec<RawMessage>, String> {
        let path = candidate.storage_path(&log.file_name);
        match self.store.retrieve_file(&path).await {
            Ok(Some(bytes)) => parse_payload(&bytes).map_err(|e| format!("{path}: {e}")),
            Ok(None) => Err(format!("{path}: not found")),
            Err(e) => Err(format!("{path}: {e}")),
        }
    }
}

/// Loads message records for one character, everyone, or the open session
pub struct HistoryLoader {
    store: Arc<dyn HistoryStore>,
    config: LoaderConfig,
}

impl HistoryLoader {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            config: LoaderConfig::default(),
        }
    }

    /// Override the concurrency limits
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> LoaderConfig {
        self.config
    }

    /// All characters the store knows about
    pub async fn characters(&self) -> Result<Vec<CharacterInfo>> {
        self.store.list_characters().await
    }

    /// Look a character up by id, display name, or avatar file name
    pub async fn find_character(&self, query: &str) -> Result<CharacterInfo> {
        let characters = self.store.list_characters().await?;
        characters
            .into_iter()
            .find(|c| c.id.as_str() == query.trim() || c.matches(query))
            .ok_or_else(|| HeatmapError::CharacterNotFound(query.to_string()))
    }

    /// Every message of every log file of `character`, in listing order
    pub async fn load_character(&self, character: &CharacterInfo) -> Vec<RawMessage> {
        let logs = match self.store.list_log_files(character).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!("Could not list chats for {}: {}", character.display_name, e);
                return Vec::new();
            }
        };
        debug!("{} has {} chat files", character.display_name, logs.len());

        let resolver = LogFileResolver::new(self.store.as_ref());
        run_bounded(
            self.config.file_concurrency,
            logs.iter(),
            |log| resolver.resolve(character, log),
            |_, _| {},
        )
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    /// Every message of every character with an avatar
    ///
    /// `on_progress(done, total)` counts finished characters.
    pub async fn load_global<P>(&self, on_progress: P) -> Result<Vec<RawMessage>>
    where
        P: FnMut(usize, usize),
    {
        let characters = self.store.list_characters().await?;
        let listed = characters.len();
        let characters: Vec<CharacterInfo> =
            characters.into_iter().filter(|c| c.has_avatar()).collect();
        if characters.len() < listed {
            debug!("Skipping {} characters without an avatar", listed - characters.len());
        }
        info!("Loading chats for {} characters", characters.len());

        let per_character = run_bounded(
            self.config.character_concurrency,
            characters.iter(),
            |character| self.load_character(character),
            on_progress,
        )
        .await;

        Ok(per_character.into_iter().flatten().collect())
    }

    /// Messages of the character's most recent session
    ///
    /// Uses the store's direct view of the open conversation when it has
    /// one, and falls back to the character's full history otherwise.
    pub async fn load_current(&self, character: &CharacterInfo) -> Result<Vec<RawMessage>> {
        match self.store.current_conversation(character).await? {
            Some(messages) => Ok(messages),
            None => {
                info!(
                    "No current conversation for {}, using full history",
                    character.display_name
                );
                Ok(self.load_character(character).await)
            }
        }
    }
}
