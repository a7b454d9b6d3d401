//! JSON-backed record store with atomic whole-document replace.
//!
//! Every mutation is a full read-modify-write cycle: load the collection,
//! change it in memory, then persist by writing a temp file in the same
//! directory and renaming it over the target. A reader never observes a
//! partially written document, and a crash mid-write leaves the previous
//! document intact.
//!
//! There is no cache between calls; every operation reloads from disk.

use crate::error::{Result, StoreError};
use crate::types::{Collection, Record};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Per-process counter feeding temp file names, so no two persists in one
/// process ever share a temp path.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Store configuration.
///
/// Paths are explicit so multiple stores can coexist and tests can point each
/// store at its own temp directory.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Path of the backing JSON document.
    pub path: PathBuf,

    /// Field that acts as the record key for `remove_by_key` and the
    /// duplicate policy.
    pub key_field: String,

    /// Reject `append` calls whose key already exists in the collection.
    ///
    /// Off by default: the store historically allows duplicate keys, and
    /// callers relying on that behavior keep it unless they opt in.
    pub reject_duplicate_keys: bool,

    /// Hold an advisory exclusive lock (on a sibling `.lock` file) across
    /// each read-modify-write cycle.
    ///
    /// Without it, two processes mutating the same document can interleave
    /// inside the load→mutate→persist window and one writer's change is
    /// lost. Atomic replace still guarantees the document stays well formed
    /// either way; the lock only closes the lost-update window.
    pub lock_on_write: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./records.json"),
            key_field: "name".to_string(),
            reject_duplicate_keys: false,
            lock_on_write: false,
        }
    }
}

/// A record collection backed by one JSON document.
pub struct RecordStore {
    config: StoreConfig,

    /// Serializes mutations within this process.
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// Create a store over the configured path.
    ///
    /// Performs no I/O: a missing document is the valid empty state and is
    /// only materialized by the first mutation.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Read and deserialize the backing document.
    ///
    /// A missing file yields an empty collection. A file that exists but does
    /// not parse yields [`StoreError::CorruptStore`]; it is never silently
    /// treated as empty, since persisting over it would discard data.
    pub fn load(&self) -> Result<Collection> {
        let bytes = match fs::read(&self.config.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Collection::new()),
            Err(e) => return Err(StoreError::StoreIo(e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptStore(e.to_string()))
    }

    /// Alias for [`load`](Self::load), for read-only callers.
    pub fn list_all(&self) -> Result<Collection> {
        self.load()
    }

    /// Append a record to the end of the collection and persist.
    ///
    /// Duplicate keys are accepted unless
    /// [`reject_duplicate_keys`](StoreConfig::reject_duplicate_keys) is set.
    pub fn append(&self, record: Record) -> Result<()> {
        let _guard = self.write_lock.lock();
        let _flock = self.file_lock()?;

        let mut records = self.load()?;

        if self.config.reject_duplicate_keys {
            if let Some(key) = record.get(&self.config.key_field) {
                if records
                    .iter()
                    .any(|r| r.get(&self.config.key_field) == Some(key))
                {
                    return Err(StoreError::DuplicateKey(key.to_string()));
                }
            }
        }

        records.push(record);
        self.persist(&records)
    }

    /// Remove every record whose key field equals `key`.
    ///
    /// Returns whether anything was removed. When nothing matches, the file
    /// is left untouched: no write, no temp file.
    pub fn remove_by_key(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let _flock = self.file_lock()?;

        let mut records = self.load()?;
        let before = records.len();
        records.retain(|r| r.get(&self.config.key_field) != Some(key));

        if records.len() == before {
            return Ok(false);
        }

        debug!(key, removed = before - records.len(), "removing records");
        self.persist(&records)?;
        Ok(true)
    }

    /// Write the full collection to disk with atomic replace.
    ///
    /// Serializes to a complete buffer first, writes it to a temp file in the
    /// same directory, fsyncs, then renames over the target. `rename` within
    /// one filesystem is atomic, so readers see either the old document or
    /// the new one, never a partial write.
    ///
    /// The temp name is unique per persist (pid plus a per-process counter)
    /// and opened with `create_new`, so two writers racing through this path
    /// never hold handles to the same inode: a concurrent mutation can still
    /// lose an update, but it cannot splice bytes into the live document
    /// after the rename.
    fn persist(&self, records: &Collection) -> Result<()> {
        let buf = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = self.tmp_path();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .map_err(StoreError::StoreIo)?;
        file.write_all(&buf).map_err(StoreError::StoreIo)?;
        file.sync_all().map_err(StoreError::StoreIo)?;
        drop(file);

        fs::rename(&tmp, &self.config.path).map_err(StoreError::StoreIo)?;

        debug!(
            path = %self.config.path.display(),
            records = records.len(),
            bytes = buf.len(),
            "persisted collection"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut name = self
            .config
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        self.config.path.with_file_name(name)
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .config
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.config.path.with_file_name(name)
    }

    /// Take the cross-process advisory lock, if configured.
    ///
    /// The lock is held on a sibling file (not the document itself, which is
    /// replaced by rename on every persist) and releases when the returned
    /// handle drops.
    fn file_lock(&self) -> Result<Option<File>> {
        if !self.config.lock_on_write {
            return Ok(None);
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(self.lock_path())
            .map_err(StoreError::StoreIo)?;
        file.lock_exclusive().map_err(StoreError::StoreIo)?;
        Ok(Some(file))
    }
}
