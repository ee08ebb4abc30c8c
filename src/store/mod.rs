//! Persisted assistant state.
//!
//! Two independent documents, each behind its own lock:
//!
//! - [`SharedStore`] owns notes, tasks and reminders (`data.json`).
//! - [`MemoryStore`] owns preferences and usage stats (`memory.json`).
//!
//! Both are rewritten whole on every change through [`write_atomic`], so a
//! reader of the file never observes a partial document.

pub mod document;
pub mod memory;
mod state;

pub use document::{Document, Note, Reminder, Task, TaskCompletion};
pub use memory::{MemoryDocument, MemoryStore, PreferenceKey, UsageStats};
pub use state::SharedStore;

use std::path::{Path, PathBuf};

/// Timestamp format used for reminder times and task due dates.
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Timestamp format used for `created_at` fields.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Write `content` to a sibling temp file, fsync it, then rename over `path`.
///
/// # Errors
///
/// Returns an I/O error if the parent directory cannot be created or any
/// write/rename step fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("orion"),
        std::process::id()
    );
    let tmp_path = path
        .parent()
        .map(|p| p.join(&tmp_name))
        .unwrap_or_else(|| PathBuf::from(&tmp_name));

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}
