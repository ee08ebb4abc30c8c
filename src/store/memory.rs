//! Preferences and usage statistics (`memory.json`).
//!
//! Held separately from the main document with its own lock, so bumping the
//! usage counter never contends with reminder scans.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{OrionError, Result};

/// The closed set of preference keys the assistant remembers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreferenceKey {
    FavPlaylist,
    HomeCity,
    Pronouns,
    WakeTime,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 4] = [
        PreferenceKey::FavPlaylist,
        PreferenceKey::HomeCity,
        PreferenceKey::Pronouns,
        PreferenceKey::WakeTime,
    ];

    /// Key as stored on disk.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FavPlaylist => "fav_playlist",
            Self::HomeCity => "home_city",
            Self::Pronouns => "pronouns",
            Self::WakeTime => "wake_time",
        }
    }

    /// Human wording used in replies.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FavPlaylist => "favourite playlist",
            Self::HomeCity => "home city",
            Self::Pronouns => "pronouns",
            Self::WakeTime => "usual wake-up time",
        }
    }

    /// Resolve a key or a spoken alias ("favorite playlist", "home town").
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let norm: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let norm = norm
            .split('_')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        match norm.as_str() {
            "fav_playlist" | "favorite_playlist" | "favourite_playlist" | "playlist"
            | "my_playlist" => Some(Self::FavPlaylist),
            "home_city" | "city" | "home_town" | "hometown" | "home" | "location" => {
                Some(Self::HomeCity)
            }
            "pronouns" | "pronoun" | "my_pronouns" => Some(Self::Pronouns),
            "wake_time" | "wake_up_time" | "wakeup_time" | "alarm_time" => Some(Self::WakeTime),
            _ => None,
        }
    }
}

impl std::fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub commands_seen: u64,
}

/// On-disk shape: `{preferences: {...}, stats: {commands_seen: n}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    #[serde(default)]
    pub preferences: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub stats: UsageStats,
}

/// Lock-guarded owner of the preferences document.
#[derive(Debug)]
pub struct MemoryStore {
    path: Option<PathBuf>,
    doc: Mutex<MemoryDocument>,
}

impl MemoryStore {
    /// Open the memory document at `path`.
    ///
    /// Missing or unreadable files start from a fresh default; this never
    /// fails.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = load_memory(&path);
        Self {
            path: Some(path),
            doc: Mutex::new(doc),
        }
    }

    /// A store that never touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: Mutex::new(MemoryDocument::default()),
        }
    }

    /// Current value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Memory`] if the lock is poisoned.
    pub fn get_pref(&self, key: PreferenceKey) -> Result<Option<String>> {
        let guard = self.lock()?;
        Ok(guard.preferences.get(key.as_str()).map(value_text))
    }

    /// Replace the value for `key`. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Memory`] if the lock is poisoned or the
    /// document cannot be persisted.
    pub fn set_pref(&self, key: PreferenceKey, value: &str) -> Result<()> {
        self.update(|doc| {
            doc.preferences.insert(
                key.as_str().to_owned(),
                serde_json::Value::String(value.to_owned()),
            );
        })
    }

    /// All preferences rendered as text, keyed by their stored name.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Memory`] if the lock is poisoned.
    pub fn preferences(&self) -> Result<BTreeMap<String, String>> {
        let guard = self.lock()?;
        Ok(guard
            .preferences
            .iter()
            .map(|(k, v)| (k.clone(), value_text(v)))
            .collect())
    }

    /// Number of commands dispatched so far.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Memory`] if the lock is poisoned.
    pub fn commands_seen(&self) -> Result<u64> {
        Ok(self.lock()?.stats.commands_seen)
    }

    /// Increment the usage counter and return the new value.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Memory`] if the lock is poisoned or the
    /// document cannot be persisted.
    pub fn bump_command_count(&self) -> Result<u64> {
        let mut seen = 0;
        self.update(|doc| {
            doc.stats.commands_seen = doc.stats.commands_seen.saturating_add(1);
            seen = doc.stats.commands_seen;
        })?;
        Ok(seen)
    }

    fn update(&self, f: impl FnOnce(&mut MemoryDocument)) -> Result<()> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        f(&mut next);
        if let Some(path) = &self.path {
            let bytes = serde_json::to_vec_pretty(&next)
                .map_err(|e| OrionError::Memory(format!("serialize memory: {e}")))?;
            super::write_atomic(path, &bytes)
                .map_err(|e| OrionError::Memory(format!("write {}: {e}", path.display())))?;
        }
        *guard = next;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryDocument>> {
        self.doc
            .lock()
            .map_err(|e| OrionError::Memory(format!("memory lock poisoned: {e}")))
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn load_memory(path: &Path) -> MemoryDocument {
    match std::fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("memory file {} is corrupt, starting fresh: {e}", path.display());
                MemoryDocument::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryDocument::default(),
        Err(e) => {
            warn!("could not read memory file {}, starting fresh: {e}", path.display());
            MemoryDocument::default()
        }
    }
}
