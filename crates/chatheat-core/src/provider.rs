//! Store trait for chat archives
//!
//! The host application owns the chat archive. This trait is the boundary
//! the loaders read through; every store crate implements it so that the
//! binary can dispatch to any of them with generic code.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CharacterInfo, LogFileInfo, RawMessage, StoragePath};

/// Read-only access to a chat archive
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Snapshot of the characters the store knows about
    async fn list_characters(&self) -> Result<Vec<CharacterInfo>>;

    /// Log files recorded for one character, metadata only
    async fn list_log_files(&self, character: &CharacterInfo) -> Result<Vec<LogFileInfo>>;

    /// Raw bytes at `path`, or `None` when nothing is stored there
    async fn retrieve_file(&self, path: &StoragePath) -> Result<Option<Vec<u8>>>;

    /// Messages of the character's most recent session, when the store can
    /// hand them over without going through file retrieval
    async fn current_conversation(
        &self,
        _character: &CharacterInfo,
    ) -> Result<Option<Vec<RawMessage>>> {
        Ok(None)
    }
}
