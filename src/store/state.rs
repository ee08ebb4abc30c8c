use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use super::Document;
use crate::error::{OrionError, Result};

/// Lock-guarded owner of the main document.
///
/// Every read-modify-write goes through [`SharedStore::mutate`], which holds
/// the lock for the whole clone / apply / persist / commit unit. The in-memory
/// copy is only replaced after the file write succeeds, so a failed persist
/// leaves both disk and memory at the previous state.
#[derive(Debug)]
pub struct SharedStore {
    path: Option<PathBuf>,
    doc: Mutex<Document>,
}

impl SharedStore {
    /// Open the document at `path`. A missing file is an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Store`] if the file exists but cannot be read
    /// or decoded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = load_document(&path)?;
        info!(
            "store opened at {} ({} notes, {} tasks, {} reminders)",
            path.display(),
            doc.notes.len(),
            doc.tasks.len(),
            doc.reminders.len()
        );
        Ok(Self {
            path: Some(path),
            doc: Mutex::new(doc),
        })
    }

    /// A store that never touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_document(Document::default())
    }

    /// A non-persisted store seeded with `doc`.
    #[must_use]
    pub fn with_document(mut doc: Document) -> Self {
        doc.normalize();
        Self {
            path: None,
            doc: Mutex::new(doc),
        }
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of the current document.
    ///
    /// # Errors
    ///
    /// Returns [`OrionError::Store`] if the lock is poisoned.
    pub fn load(&self) -> Result<Document> {
        Ok(self.lock()?.clone())
    }

    /// Apply `f` under the exclusive lock and persist the result before
    /// returning.
    ///
    /// Nothing is written when `f` leaves the document unchanged. If `f`
    /// fails, the document is untouched and its error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or [`OrionError::Store`] when the lock is
    /// poisoned or persisting fails.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if next != *guard {
            self.persist(&next)?;
            *guard = next;
        }
        Ok(out)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Document>> {
        self.doc
            .lock()
            .map_err(|e| OrionError::Store(format!("store lock poisoned: {e}")))
    }

    fn persist(&self, doc: &Document) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| OrionError::Store(format!("serialize document: {e}")))?;
        super::write_atomic(path, &bytes)
            .map_err(|e| OrionError::Store(format!("write {}: {e}", path.display())))?;
        debug!("store persisted to {}", path.display());
        Ok(())
    }
}

fn load_document(path: &Path) -> Result<Document> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::default()),
        Err(e) => return Err(OrionError::Store(format!("read {}: {e}", path.display()))),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::default());
    }
    let mut doc: Document = serde_json::from_slice(&bytes)
        .map_err(|e| OrionError::Store(format!("decode {}: {e}", path.display())))?;
    doc.normalize();
    Ok(doc)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::Arc;

    #[test]
    fn missing_file_loads_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedStore::open(dir.path().join("data.json")).unwrap();
        assert_eq!(store.load().unwrap(), Document::default());
        assert!(!dir.path().join("data.json").exists());
    }

    #[test]
    fn mutate_persists_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = SharedStore::open(&path).unwrap();

        let id = store
            .mutate(|doc| Ok(doc.add_task("buy milk", None, "2024-01-01T08:00:00")))
            .unwrap();
        assert_eq!(id, 1);

        let reopened = SharedStore::open(&path).unwrap().load().unwrap();
        assert_eq!(reopened.tasks.len(), 1);
        assert_eq!(reopened.tasks[0].description, "buy milk");
    }

    #[test]
    fn failed_mutation_leaves_document_untouched() {
        let store = SharedStore::in_memory();
        let result: Result<()> = store.mutate(|doc| {
            doc.add_note("half-done", "");
            Err(OrionError::InvalidArgument("nope".into()))
        });
        assert!(result.is_err());
        assert!(store.load().unwrap().notes.is_empty());
    }

    #[test]
    fn failed_persist_does_not_commit_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("data.json");
        std::fs::create_dir_all(path.join("blocker")).unwrap();
        let store = SharedStore {
            path: Some(path),
            doc: Mutex::new(Document::default()),
        };

        let result = store.mutate(|doc| Ok(doc.add_note("lost", "")));
        assert!(matches!(result, Err(OrionError::Store(_))));
        assert!(store.load().unwrap().notes.is_empty());
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(SharedStore::open(&path), Err(OrionError::Store(_))));
    }

    #[test]
    fn concurrent_mutations_are_serialized() {
        let store = Arc::new(SharedStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        store
                            .mutate(|doc| Ok(doc.add_task(format!("t{i}-{j}"), None, "")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let doc = store.load().unwrap();
        assert_eq!(doc.tasks.len(), 200);
        let mut ids: Vec<u64> = doc.tasks.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 200);
    }
}
