//! Storage folder guessing for chat logs
//!
//! The store does not tell us which folder a character's logs live in, and
//! the folder naming has drifted between versions of the host application.
//! Several independent signals are turned into an ordered candidate list
//! that the resolver walks until one of them produces a readable file.

use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::HashSet;

use crate::types::{CharacterId, StoragePath, avatar_stem};

/// Characters left untouched by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Bytes a raw segment cannot carry verbatim in a URL path
const URL_DELIMITERS: &AsciiSet = &CONTROLS.add(b'#').add(b'?').add(b'%');

/// Separator between character name and date in log file names
const LOG_NAME_SEPARATOR: &str = " - ";

/// Percent-encode one path segment the way the host's web client does
pub fn encode_component(segment: &str) -> String {
    utf8_percent_encode(segment, URI_COMPONENT).to_string()
}

/// Escape only the URL delimiters of an otherwise raw segment
pub fn escape_url_delimiters(segment: &str) -> String {
    utf8_percent_encode(segment, URL_DELIMITERS).to_string()
}

/// One guessed storage folder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathCandidate {
    pub folder: String,
    pub encode: bool,
}

impl PathCandidate {
    fn new(folder: &str, encode: bool) -> Self {
        Self {
            folder: folder.to_string(),
            encode,
        }
    }

    /// The full storage path for a log file under this folder
    pub fn storage_path(&self, file_name: &str) -> StoragePath {
        StoragePath {
            folder: self.folder.clone(),
            file_name: file_name.to_string(),
            encode: self.encode,
        }
    }
}

/// Build the ordered, deduplicated folder guesses for one log file
///
/// Priority:
/// 1. avatar file name without extension (encoded, then raw)
/// 2. avatar file name as stored (encoded, then raw)
/// 3. log file name up to the first `" - "` (encoded, then raw), when it
///    differs from the first guess
/// 4. the character id, raw
///
/// # Examples
/// ```
/// use chatheat_core::path_candidates::path_candidates;
/// use chatheat_core::types::CharacterId;
///
/// let candidates = path_candidates(
///     &CharacterId::new("3"),
///     "Seraphina.png",
///     "Seraphina - 2024-01-05@23h30m15s.jsonl",
/// );
/// assert_eq!(candidates[0].folder, "Seraphina");
/// assert!(candidates[0].encode);
/// assert_eq!(candidates.last().unwrap().folder, "3");
/// ```
pub fn path_candidates(
    character_id: &CharacterId,
    avatar: &str,
    log_file_name: &str,
) -> Vec<PathCandidate> {
    let mut ordered = Vec::with_capacity(7);
    let stem = avatar_stem(avatar);

    push_both(&mut ordered, stem);
    push_both(&mut ordered, avatar);

    if let Some((prefix, _)) = log_file_name.split_once(LOG_NAME_SEPARATOR)
        && prefix != stem
    {
        push_both(&mut ordered, prefix);
    }

    ordered.push(PathCandidate::new(character_id.as_str(), false));

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|c| !c.folder.trim().is_empty())
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

fn push_both(out: &mut Vec<PathCandidate>, folder: &str) {
    out.push(PathCandidate::new(folder, true));
    out.push(PathCandidate::new(folder, false));
}
