//! Filesystem store over a SillyTavern user data directory
//!
//! Layout (current and pre-1.12 releases alike):
//!
//! ```text
//! <root>/characters/Seraphina.png
//! <root>/chats/Seraphina/Seraphina - 2024-01-05@23h30m15s.jsonl
//! ```
//!
//! The root is found automatically in the usual install locations. You can
//! override it with the `SILLYTAVERN_DATA_PATH` environment variable.

use async_trait::async_trait;
use chatheat_core::error::{HeatmapError, Result};
use chatheat_core::payload::parse_payload;
use chatheat_core::provider::HistoryStore;
use chatheat_core::types::{
    CharacterId, CharacterInfo, LogFileInfo, RawMessage, StoragePath, avatar_stem,
};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Environment variable naming the data directory
pub const DATA_PATH_ENV: &str = "SILLYTAVERN_DATA_PATH";

const LOG_EXTENSION: &str = "jsonl";
const AVATAR_EXTENSION: &str = "png";

/// One log file found on disk
#[derive(Debug, Clone)]
struct LogEntry {
    path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
}

/// Chat archive read straight from disk
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Use an explicit data directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find a data directory in the usual places
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::NoDataDirectory`] when no candidate holds a
    /// `chats` or `characters` folder.
    pub fn discover() -> Result<Self> {
        let root = Self::discover_data_paths()
            .into_iter()
            .find(|path| is_data_root(path))
            .ok_or(HeatmapError::NoDataDirectory)?;

        info!("Using SillyTavern data directory {}", root.display());
        Ok(Self::new(root))
    }

    /// Candidate data directories, most specific first
    fn discover_data_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(custom_path) = std::env::var(DATA_PATH_ENV) {
            paths.push(PathBuf::from(custom_path));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("SillyTavern/data/default-user"));
            // Releases before 1.12 kept user data under public/
            paths.push(home.join("SillyTavern/public"));
        }

        if let Some(data_dir) = dirs::data_dir() {
            paths.push(data_dir.join("SillyTavern/data/default-user"));
        }

        if let Some(documents) = dirs::document_dir() {
            paths.push(documents.join("SillyTavern/data/default-user"));
        }

        paths
    }

    /// The data directory this store reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn characters_dir(&self) -> PathBuf {
        self.root.join("characters")
    }

    fn chats_dir(&self) -> PathBuf {
        self.root.join("chats")
    }

    /// The folder the host itself would use for this character
    fn log_dir_for(&self, character: &CharacterInfo) -> PathBuf {
        let folder = character
            .avatar
            .as_deref()
            .map(avatar_stem)
            .unwrap_or(&character.display_name);
        self.chats_dir().join(folder)
    }

    /// List log files directly inside `dir`, sorted by file name
    async fn scan_logs(dir: PathBuf) -> Result<Vec<LogEntry>> {
        if !dir.is_dir() {
            debug!("No chat folder at {}", dir.display());
            return Ok(Vec::new());
        }

        tokio::task::spawn_blocking(move || {
            let mut entries: Vec<LogEntry> = WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && has_extension(e.path(), LOG_EXTENSION))
                .map(|e| {
                    let metadata = e.metadata().ok();
                    LogEntry {
                        path: e.path().to_path_buf(),
                        size: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
                        modified: metadata.and_then(|m| m.modified().ok()),
                    }
                })
                .collect();
            entries.shrink_to_fit();
            entries
        })
        .await
        .map_err(|e| HeatmapError::Io(std::io::Error::other(e.to_string())))
    }

    /// Avatar files, or chat folders when there is no characters folder
    async fn scan_characters(&self) -> Result<Vec<CharacterInfo>> {
        let characters_dir = self.characters_dir();
        let chats_dir = self.chats_dir();

        tokio::task::spawn_blocking(move || {
            let from_avatars = characters_dir.is_dir();
            let (dir, want_dirs) = if from_avatars {
                (characters_dir, false)
            } else {
                (chats_dir, true)
            };

            WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| {
                    if want_dirs {
                        e.file_type().is_dir()
                    } else {
                        e.file_type().is_file() && has_extension(e.path(), AVATAR_EXTENSION)
                    }
                })
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .enumerate()
                .map(|(index, name)| {
                    let avatar = if want_dirs {
                        format!("{name}.{AVATAR_EXTENSION}")
                    } else {
                        name
                    };
                    CharacterInfo {
                        id: CharacterId::new(index.to_string()),
                        display_name: avatar_stem(&avatar).to_string(),
                        avatar: Some(avatar),
                    }
                })
                .collect::<Vec<CharacterInfo>>()
        })
        .await
        .map_err(|e| HeatmapError::Io(std::io::Error::other(e.to_string())))
    }
}

#[async_trait]
impl HistoryStore for FsStore {
    async fn list_characters(&self) -> Result<Vec<CharacterInfo>> {
        if !is_data_root(&self.root) {
            return Err(HeatmapError::NoDataDirectory);
        }
        let characters = self.scan_characters().await?;
        debug!("Found {} characters", characters.len());
        Ok(characters)
    }

    async fn list_log_files(&self, character: &CharacterInfo) -> Result<Vec<LogFileInfo>> {
        let entries = Self::scan_logs(self.log_dir_for(character)).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let file_name = entry.path.file_name()?.to_str()?.to_string();
                Some(LogFileInfo {
                    file_name,
                    size_bytes: Some(entry.size),
                    last_message: None,
                })
            })
            .collect())
    }

    async fn retrieve_file(&self, path: &StoragePath) -> Result<Option<Vec<u8>>> {
        let folder = path.folder_segment();
        let file = path.file_segment();
        if !is_plain_segment(&folder) || !is_plain_segment(&file) {
            debug!("Refusing non-plain storage path {}", path);
            return Ok(None);
        }

        let full_path = self.chats_dir().join(folder).join(file);
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HeatmapError::Io(e)),
        }
    }

    async fn current_conversation(
        &self,
        character: &CharacterInfo,
    ) -> Result<Option<Vec<RawMessage>>> {
        let entries = Self::scan_logs(self.log_dir_for(character)).await?;
        let Some(latest) = entries.into_iter().max_by_key(|entry| entry.modified) else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(&latest.path).await?;
        match parse_payload(&bytes) {
            Ok(messages) => {
                debug!(
                    "Current conversation for {} is {}",
                    character.display_name,
                    latest.path.display()
                );
                Ok(Some(messages))
            }
            Err(e) => {
                warn!("Latest chat {} is unreadable: {}", latest.path.display(), e);
                Ok(None)
            }
        }
    }
}

fn is_data_root(path: &Path) -> bool {
    path.join("chats").is_dir() || path.join("characters").is_dir()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// A single path component that cannot climb out of the chats folder
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ENV_MUTEX, EnvVarGuard};
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    const LOG: &str = "{\"user_name\":\"User\",\"character_name\":\"Seraphina\"}\n\
                       {\"send_date\":\"2024-01-05@23h30m15s\",\"mes\":\"hi\"}\n";

    fn character(index: usize, avatar: &str) -> CharacterInfo {
        CharacterInfo {
            id: CharacterId::new(index.to_string()),
            display_name: avatar_stem(avatar).to_string(),
            avatar: Some(avatar.to_string()),
        }
    }

    fn data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("characters")).unwrap();
        fs::write(root.join("characters/Seraphina.png"), b"png").unwrap();
        fs::write(root.join("characters/Aqua.png"), b"png").unwrap();
        fs::write(root.join("characters/notes.txt"), b"ignored").unwrap();

        let chats = root.join("chats/Seraphina");
        fs::create_dir_all(&chats).unwrap();
        fs::write(chats.join("Seraphina - 2024-01-05@23h30m15s.jsonl"), LOG).unwrap();
        fs::write(chats.join("Seraphina - 2024-02-01@08h00m00s.jsonl"), LOG).unwrap();
        fs::write(chats.join("backup.bak"), b"ignored").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_characters_sorted_with_positions() {
        let dir = data_dir();
        let store = FsStore::new(dir.path());
        let characters = store.list_characters().await.unwrap();

        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0], character(0, "Aqua.png"));
        assert_eq!(characters[1], character(1, "Seraphina.png"));
    }

    #[tokio::test]
    async fn test_characters_from_chat_folders() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("chats/Aqua")).unwrap();
        let store = FsStore::new(dir.path());

        let characters = store.list_characters().await.unwrap();
        assert_eq!(characters, vec![character(0, "Aqua.png")]);
    }

    #[tokio::test]
    async fn test_list_log_files() {
        let dir = data_dir();
        let store = FsStore::new(dir.path());

        let logs = store
            .list_log_files(&character(1, "Seraphina.png"))
            .await
            .unwrap();
        let names: Vec<_> = logs.iter().map(|l| l.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Seraphina - 2024-01-05@23h30m15s.jsonl",
                "Seraphina - 2024-02-01@08h00m00s.jsonl"
            ]
        );
        assert_eq!(logs[0].size_bytes, Some(LOG.len() as u64));

        let none = store.list_log_files(&character(0, "Aqua.png")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_file_raw_and_encoded() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("chats/Alice Smith");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("Alice Smith - 1.jsonl"), LOG).unwrap();
        let store = FsStore::new(dir.path());

        let raw = StoragePath {
            folder: "Alice Smith".to_string(),
            file_name: "Alice Smith - 1.jsonl".to_string(),
            encode: false,
        };
        assert_eq!(
            store.retrieve_file(&raw).await.unwrap(),
            Some(LOG.as_bytes().to_vec())
        );

        let encoded = StoragePath {
            encode: true,
            ..raw
        };
        assert_eq!(store.retrieve_file(&encoded).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_retrieve_refuses_traversal() {
        let dir = data_dir();
        let store = FsStore::new(dir.path().join("chats"));
        let sneaky = StoragePath {
            folder: "..".to_string(),
            file_name: "characters/Aqua.png".to_string(),
            encode: false,
        };
        assert_eq!(store.retrieve_file(&sneaky).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_current_conversation_picks_latest_mtime() {
        let dir = data_dir();
        let chats = dir.path().join("chats/Seraphina");
        let older = chats.join("Seraphina - 2024-02-01@08h00m00s.jsonl");
        let newer = chats.join("Seraphina - 2024-01-05@23h30m15s.jsonl");
        fs::write(&newer, "{\"send_date\":1704497400000,\"mes\":\"latest\"}\n").unwrap();
        filetime::set_file_mtime(&older, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
        filetime::set_file_mtime(&newer, FileTime::from_unix_time(1_710_000_000, 0)).unwrap();

        let store = FsStore::new(dir.path());
        let messages = store
            .current_conversation(&character(1, "Seraphina.png"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "latest");

        let nothing = store
            .current_conversation(&character(0, "Aqua.png"))
            .await
            .unwrap();
        assert!(nothing.is_none());
    }

    #[tokio::test]
    async fn test_discover_from_env() {
        let _lock = ENV_MUTEX.lock().await;
        let dir = data_dir();
        let mut guard = EnvVarGuard::new();
        guard.set(DATA_PATH_ENV, dir.path().to_str().unwrap());

        let store = FsStore::discover().unwrap();
        assert_eq!(store.root(), dir.path());
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let store = FsStore::new("/tmp/nonexistent-sillytavern-root");
        assert!(matches!(
            store.list_characters().await,
            Err(HeatmapError::NoDataDirectory)
        ));
    }
}
