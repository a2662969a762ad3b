//! Durable JSON document storage.
//!
//! One file per document under the data root:
//!
//! ```text
//! ~/.deepwork/
//! ├── sessions.json   # { "YYYY-MM-DD": [Session, ...], ... }
//! └── settings.json   # { "activities": [...], "durations": [a, b, c] }
//! ```
//!
//! # Guarantees
//!
//! - Reads never fail. A missing document is its typed default; a damaged one
//!   is salvaged in memory (valid entries only) and logged. Reads never write.
//! - Writes replace the whole document atomically and are on stable storage
//!   before returning.
//! - Every mutation of a given document is serialized through a per-document
//!   lock, so concurrent read-modify-write callers cannot lose updates.
//! - `repair` is explicit. Nothing in the read or write path calls it.

mod document;
mod file;

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{DeepWorkError, Result};
use crate::storage::StorageConfig;
use crate::types::{SessionsDocument, Settings};

pub use document::{DocKey, Document};

/// Outcome of an explicit repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub doc: DocKey,
    pub kept: usize,
    pub discarded: usize,
    /// False when there was no document on disk to rewrite.
    pub rewritten: bool,
}

/// File-backed store for the sessions and settings documents.
///
/// Construct once and pass by reference (or `Arc`) to the repositories.
pub struct DocumentStore {
    storage: StorageConfig,
    sessions_lock: Mutex<()>,
    settings_lock: Mutex<()>,
}

enum Loaded<D> {
    Missing,
    /// The file exists but could not be read at all.
    Unreadable(std::io::Error),
    Parsed(D),
    Salvaged { doc: D, discarded: usize, reason: String },
}

impl DocumentStore {
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            sessions_lock: Mutex::new(()),
            settings_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Prepares the data directory and checks that it accepts writes.
    ///
    /// Safe to call repeatedly; existing documents are never touched.
    pub fn initialize(&self) -> Result<()> {
        let root = self.storage.root();
        let unavailable = |source: std::io::Error| DeepWorkError::StorageUnavailable {
            path: root.to_path_buf(),
            source,
        };

        fs_err::create_dir_all(root).map_err(unavailable)?;
        // Probe file is removed when dropped.
        NamedTempFile::new_in(root).map_err(unavailable)?;

        info!(root = %root.display(), "Document store initialized");
        Ok(())
    }

    /// Ends the store's lifetime. Writes are already durable, so nothing is flushed.
    pub fn dispose(self) {
        debug!(root = %self.storage.root().display(), "Document store disposed");
    }

    fn lock(&self, key: DocKey) -> MutexGuard<'_, ()> {
        let lock = match key {
            DocKey::Sessions => &self.sessions_lock,
            DocKey::Settings => &self.settings_lock,
        };
        lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Integrity
    // ─────────────────────────────────────────────────────────────────────────────

    /// Structural validation of the stored document. Does not modify anything.
    pub fn verify_integrity(&self, key: DocKey) -> bool {
        match self.check(key) {
            Ok(()) => true,
            Err(details) => {
                warn!(doc = %key, details = %details, "Integrity check failed");
                false
            }
        }
    }

    fn check(&self, key: DocKey) -> std::result::Result<(), String> {
        let path = key.path(&self.storage);
        let content = match file::read_raw(&path) {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(()),
            Err(err) => return Err(format!("unreadable: {}", err)),
        };
        let value: Value =
            serde_json::from_slice(&content).map_err(|e| format!("not valid JSON: {}", e))?;

        match key {
            DocKey::Sessions => SessionsDocument::check(&value),
            DocKey::Settings => Settings::check(&value),
        }
    }

    fn ensure_integrity(&self, key: DocKey) -> Result<()> {
        self.check(key)
            .map_err(|details| DeepWorkError::Integrity { doc: key, details })
    }

    /// Rewrites a damaged document keeping only well-formed entries.
    ///
    /// Reserved for startup and health-check flows.
    pub fn repair(&self, key: DocKey) -> Result<RepairReport> {
        match key {
            DocKey::Sessions => self.repair_doc::<SessionsDocument>(),
            DocKey::Settings => self.repair_doc::<Settings>(),
        }
    }

    fn repair_doc<D: Document>(&self) -> Result<RepairReport> {
        let _guard = self.lock(D::KEY);

        let (doc, discarded) = match self.load::<D>() {
            Loaded::Missing => {
                return Ok(RepairReport {
                    doc: D::KEY,
                    kept: 0,
                    discarded: 0,
                    rewritten: false,
                })
            }
            Loaded::Unreadable(source) => {
                return Err(DeepWorkError::Io {
                    context: format!("reading {} for repair", D::KEY),
                    source,
                })
            }
            Loaded::Parsed(doc) => (doc, 0),
            Loaded::Salvaged { doc, discarded, .. } => (doc, discarded),
        };

        self.write_unlocked(&doc)?;

        let report = RepairReport {
            doc: D::KEY,
            kept: doc.entry_count(),
            discarded,
            rewritten: true,
        };
        info!(
            doc = %D::KEY,
            kept = report.kept,
            discarded = report.discarded,
            "Document repaired"
        );
        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Read / Write
    // ─────────────────────────────────────────────────────────────────────────────

    fn load<D: Document>(&self) -> Loaded<D> {
        let path = D::KEY.path(&self.storage);
        let content = match file::read_raw(&path) {
            Ok(Some(content)) => content,
            Ok(None) => return Loaded::Missing,
            Err(err) => return Loaded::Unreadable(err),
        };

        let value: Value = match serde_json::from_slice(&content) {
            Ok(value) => value,
            Err(err) => {
                return Loaded::Salvaged {
                    doc: D::default(),
                    discarded: 1,
                    reason: format!("not valid JSON: {}", err),
                }
            }
        };

        if let Err(reason) = D::check(&value) {
            let (doc, discarded) = D::salvage(value);
            return Loaded::Salvaged {
                doc,
                discarded,
                reason,
            };
        }

        match serde_json::from_value(value.clone()) {
            Ok(doc) => Loaded::Parsed(doc),
            Err(err) => {
                let (doc, discarded) = D::salvage(value);
                Loaded::Salvaged {
                    doc,
                    discarded,
                    reason: err.to_string(),
                }
            }
        }
    }

    fn read_unlocked<D: Document>(&self) -> D {
        match self.load::<D>() {
            Loaded::Missing => D::default(),
            Loaded::Parsed(doc) => doc,
            Loaded::Unreadable(err) => {
                warn!(doc = %D::KEY, error = %err, "Document unreadable; using defaults");
                D::default()
            }
            Loaded::Salvaged {
                doc,
                discarded,
                reason,
            } => {
                warn!(
                    doc = %D::KEY,
                    discarded,
                    reason = %reason,
                    "Read damaged document; returning well-formed entries only"
                );
                doc
            }
        }
    }

    fn write_unlocked<D: Document>(&self, doc: &D) -> Result<()> {
        let path = D::KEY.path(&self.storage);
        let content = serde_json::to_string_pretty(doc).map_err(|source| DeepWorkError::Json {
            context: format!("serializing {}", D::KEY),
            source,
        })?;
        file::atomic_write(&path, &content)?;
        debug!(doc = %D::KEY, bytes = content.len(), "Document written");
        Ok(())
    }

    /// Returns the stored document, or its default when absent.
    pub fn read<D: Document>(&self) -> D {
        let _guard = self.lock(D::KEY);
        self.read_unlocked()
    }

    /// Replaces the whole document.
    pub fn write<D: Document>(&self, doc: &D) -> Result<()> {
        let _guard = self.lock(D::KEY);
        self.write_unlocked(doc)
    }

    /// Read-modify-write under the document lock.
    ///
    /// The stored document must pass the integrity check first; a damaged
    /// document fails with `Integrity` and is left as it is. If `f` fails,
    /// nothing is written.
    pub fn mutate<D, T, F>(&self, f: F) -> Result<T>
    where
        D: Document,
        F: FnOnce(&mut D) -> Result<T>,
    {
        let _guard = self.lock(D::KEY);
        self.ensure_integrity(D::KEY)?;
        let mut doc = self.read_unlocked::<D>();
        let out = f(&mut doc)?;
        self.write_unlocked(&doc)?;
        Ok(out)
    }

    /// Deletes the document entirely.
    pub fn remove(&self, key: DocKey) -> Result<()> {
        let _guard = self.lock(key);
        file::remove(&key.path(&self.storage))?;
        info!(doc = %key, "Document removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{default_activities, Activity};
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn store_in(dir: &std::path::Path) -> DocumentStore {
        let store = DocumentStore::new(StorageConfig::with_root(dir.to_path_buf()));
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        let mut settings = Settings::default();
        settings.durations = vec![5, 15, 45];
        store.write(&settings).unwrap();

        assert!(store.initialize().is_ok());
        assert!(store.initialize().is_ok());
        assert_eq!(store.read::<Settings>(), settings);
    }

    #[test]
    fn test_initialize_fails_when_root_is_a_file() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let store = DocumentStore::new(StorageConfig::with_root(blocker));
        let err = store.initialize().unwrap_err();
        assert!(matches!(err, DeepWorkError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_read_missing_returns_defaults() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        assert!(store.read::<SessionsDocument>().is_empty());
        assert_eq!(store.read::<Settings>(), Settings::default());
        assert!(store.verify_integrity(DocKey::Sessions));
        assert!(store.verify_integrity(DocKey::Settings));
    }

    #[test]
    fn test_read_salvages_without_writing() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let path = store.storage().settings_file();
        let raw = r##"{"activities":[{"id":"code","name":"Code","color":"#fff"},7],"durations":[5,10,15]}"##;
        std::fs::write(&path, raw).unwrap();

        let settings = store.read::<Settings>();
        assert_eq!(settings.activities.len(), 1);
        assert_eq!(settings.durations, vec![5, 10, 15]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
    }

    #[test]
    fn test_mutate_refuses_damaged_document() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let path = store.storage().settings_file();
        std::fs::write(&path, "{not json").unwrap();

        let result = store.mutate::<Settings, _, _>(|settings| {
            settings.durations = vec![5, 10, 15];
            Ok(())
        });
        assert!(matches!(result, Err(DeepWorkError::Integrity { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_mutate_skips_write_when_closure_fails() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        let result: Result<()> = store.mutate::<Settings, _, _>(|settings| {
            settings.activities.clear();
            Err(DeepWorkError::Validation("nope".to_string()))
        });
        assert!(result.is_err());
        assert!(!store.storage().settings_file().exists());
    }

    #[test]
    fn test_repair_unparsable_document_resets_to_default() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        std::fs::write(store.storage().sessions_file(), "[[[").unwrap();

        assert!(!store.verify_integrity(DocKey::Sessions));
        let report = store.repair(DocKey::Sessions).unwrap();
        assert!(report.rewritten);
        assert_eq!(report.kept, 0);
        assert!(store.verify_integrity(DocKey::Sessions));
        assert!(store.read::<SessionsDocument>().is_empty());
    }

    #[test]
    fn test_repair_counts_undecodable_document_as_discarded() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let path = store.storage().sessions_file();
        let mut raw = br#"{"2024-02-15":[{"date":"2024-02-15","activity":"write","duration":30,"musicChoice":"none","notes":"caf"#.to_vec();
        raw.push(0xE9);
        raw.extend_from_slice(br#"","completedAt":"2024-02-15T10:00:00+00:00"}]}"#);
        std::fs::write(&path, &raw).unwrap();

        assert!(!store.verify_integrity(DocKey::Sessions));
        assert!(store.read::<SessionsDocument>().is_empty());

        let report = store.repair(DocKey::Sessions).unwrap();
        assert!(report.rewritten);
        assert_eq!(report.kept, 0);
        assert_eq!(report.discarded, 1);
        assert!(store.verify_integrity(DocKey::Sessions));
    }

    #[test]
    fn test_repair_fails_when_document_cannot_be_read() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let path = store.storage().sessions_file();
        std::fs::create_dir(&path).unwrap();

        assert!(!store.verify_integrity(DocKey::Sessions));
        let err = store.repair(DocKey::Sessions).unwrap_err();
        assert!(matches!(err, DeepWorkError::Io { .. }));
        assert!(path.is_dir());
    }

    #[test]
    fn test_repair_missing_document_is_noop() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        let report = store.repair(DocKey::Settings).unwrap();
        assert!(!report.rewritten);
        assert!(!store.storage().settings_file().exists());
    }

    #[test]
    fn test_concurrent_mutations_are_serialized() {
        let temp = tempdir().unwrap();
        let store = Arc::new(store_in(temp.path()));
        store
            .write(&Settings {
                activities: Vec::new(),
                durations: vec![10, 20, 30],
            })
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .mutate::<Settings, _, _>(|settings| {
                            let name = format!("Topic {}", i);
                            settings.activities.push(Activity::new(&name, "#fff")?);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.read::<Settings>().activities.len(), 8);
    }

    #[test]
    fn test_remove_deletes_document() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        store
            .write(&Settings {
                activities: default_activities(),
                durations: vec![5, 10, 15],
            })
            .unwrap();

        store.remove(DocKey::Settings).unwrap();
        assert!(!store.storage().settings_file().exists());
        assert_eq!(store.read::<Settings>(), Settings::default());
    }
}
