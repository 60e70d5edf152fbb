//! HTTP store talking to a running SillyTavern server
//!
//! Listings go through the server's JSON API. Log files are fetched as
//! static files under `/chats/`, which is where path guessing comes in: the
//! server may or may not expect the folder name percent-encoded.

use async_trait::async_trait;
use chatheat_core::error::{HeatmapError, Result};
use chatheat_core::provider::HistoryStore;
use chatheat_core::types::{CharacterId, CharacterInfo, LogFileInfo, StoragePath};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming the server URL
pub const URL_ENV: &str = "SILLYTAVERN_URL";

const CSRF_HEADER: &str = "X-CSRF-Token";
const LOG_SUFFIX: &str = ".jsonl";

#[derive(Debug, Deserialize)]
struct CsrfResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiCharacter {
    name: String,
    #[serde(default)]
    avatar: Option<String>,
}

/// Chat archive served by a SillyTavern instance
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
    client: reqwest::Client,
    csrf_token: Option<String>,
}

impl HttpStore {
    /// Build a client for `base_url` and pick up a CSRF token if the server
    /// hands one out
    ///
    /// # Errors
    ///
    /// Fails only when the HTTP client itself cannot be built. A server that
    /// runs with CSRF protection disabled is not an error.
    pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        let mut store = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            csrf_token: None,
        };
        store.csrf_token = store.fetch_csrf_token().await;
        info!("Connected to SillyTavern at {}", store.base_url);
        Ok(store)
    }

    /// The server root without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn fetch_csrf_token(&self) -> Option<String> {
        let response = match self.client.get(self.url("csrf-token")).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("No CSRF token offered ({})", response.status());
                return None;
            }
            Err(e) => {
                debug!("CSRF token request failed: {}", e);
                return None;
            }
        };
        response
            .json::<CsrfResponse>()
            .await
            .ok()
            .map(|csrf| csrf.token)
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value> {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HeatmapError::Store(format!("POST {path} returned {status}")));
        }
        Ok(response.json().await?)
    }
}

/// Characters in server order, with the position as id
fn parse_character_listing(value: Value) -> Result<Vec<CharacterInfo>> {
    let characters: Vec<ApiCharacter> = serde_json::from_value(value)?;
    Ok(characters
        .into_iter()
        .enumerate()
        .map(|(index, character)| CharacterInfo {
            id: CharacterId::new(index.to_string()),
            display_name: character.name,
            avatar: character.avatar.filter(|a| !a.trim().is_empty()),
        })
        .collect())
}

/// Chat listing entries; the server answers with a non-array when a
/// character has no chats
fn parse_chat_listing(value: Value) -> Vec<LogFileInfo> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let file_name = entry.get("file_name")?.as_str()?.trim();
            if file_name.is_empty() {
                return None;
            }
            let file_name = if file_name.ends_with(LOG_SUFFIX) {
                file_name.to_string()
            } else {
                format!("{file_name}{LOG_SUFFIX}")
            };
            let last_message = entry.get("last_mes").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            Some(LogFileInfo {
                file_name,
                size_bytes: None,
                last_message,
            })
        })
        .collect()
}

#[async_trait]
impl HistoryStore for HttpStore {
    async fn list_characters(&self) -> Result<Vec<CharacterInfo>> {
        let listing = self.post_json("api/characters/all", json!({})).await?;
        let characters = parse_character_listing(listing)?;
        debug!("Server lists {} characters", characters.len());
        Ok(characters)
    }

    async fn list_log_files(&self, character: &CharacterInfo) -> Result<Vec<LogFileInfo>> {
        let Some(avatar) = &character.avatar else {
            return Ok(Vec::new());
        };
        let listing = self
            .post_json("api/characters/chats", json!({ "avatar_url": avatar }))
            .await?;
        Ok(parse_chat_listing(listing))
    }

    async fn retrieve_file(&self, path: &StoragePath) -> Result<Option<Vec<u8>>> {
        let response = self.client.get(self.url(&path.url_path())).send().await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(HeatmapError::Store(format!("GET {path} returned {status}"))),
        }
    }
}
