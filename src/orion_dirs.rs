//! Centralized application directory paths for Orion.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/orion/` | `~/.local/share/orion/` |
//! | Config | `~/Library/Application Support/orion/` | `~/.config/orion/` |
//!
//! # Environment Overrides
//!
//! - `ORION_DATA_DIR` overrides [`data_dir`]
//! - `ORION_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the notes/tasks/reminders document, the preferences document and logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ORION_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("orion"))
        .unwrap_or_else(|| PathBuf::from("/tmp/orion-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ORION_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("orion"))
        .unwrap_or_else(|| PathBuf::from("/tmp/orion-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Notes / tasks / reminders document (`data_dir()/data.json`).
#[must_use]
pub fn data_file() -> PathBuf {
    data_dir().join("data.json")
}

/// Preferences and usage stats document (`data_dir()/memory.json`).
#[must_use]
pub fn memory_file() -> PathBuf {
    data_dir().join("memory.json")
}

/// User home directory, used as the default root for file search.
#[must_use]
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_their_roots() {
        assert!(data_file().starts_with(data_dir()));
        assert!(memory_file().starts_with(data_dir()));
        assert!(logs_dir().starts_with(data_dir()));
        assert!(config_file().starts_with(config_dir()));
    }

    #[test]
    fn file_names_are_stable() {
        assert_eq!(data_file().file_name().and_then(|n| n.to_str()), Some("data.json"));
        assert_eq!(
            memory_file().file_name().and_then(|n| n.to_str()),
            Some("memory.json")
        );
        assert_eq!(
            config_file().file_name().and_then(|n| n.to_str()),
            Some("config.toml")
        );
    }
}
