//! Store Adapter
//!
//! The server keeps its data in an embedded [`sled`] database. Handlers never
//! see `sled` directly: they talk to the [`KvStore`] trait, which is exactly
//! the three operations the command layer needs.
//!
//! `sled::Db` is internally synchronized, so a single [`SledStore`] is shared
//! across every connection task behind an `Arc` with no extra locking.

use bytes::Bytes;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: sled::Error,
    },

    #[error("store error: {0}")]
    Engine(#[from] sled::Error),

    /// The handle was used after `close`.
    #[error("store is closed")]
    Closed,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The narrow storage interface the command handlers depend on.
pub trait KvStore: Send + Sync + 'static {
    /// Looks up `key`. A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Inserts or overwrites `key`.
    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Flushes and releases the store. Callers invoke this exactly once.
    fn close(&self) -> StoreResult<()>;
}

/// A [`KvStore`] backed by a `sled` database.
pub struct SledStore {
    db: sled::Db,
    closed: AtomicBool,
}

impl SledStore {
    /// Opens (or creates) the store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let path = dir.as_ref();
        let db = sled::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        info!(dir = %path.display(), recovered = db.was_recovered(), "Store opened");
        Ok(Self::from_db(db))
    }

    /// Opens a store that lives only as long as the process.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::from_db(db))
    }

    fn from_db(db: sled::Db) -> Self {
        Self {
            db,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl fmt::Debug for SledStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SledStore")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self.db.get(key)?.map(|v| Bytes::copy_from_slice(&v)))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.ensure_open()?;
        self.db.insert(key, value)?;
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        let flushed = self.db.flush()?;
        debug!(bytes = flushed, "Store flushed");
        Ok(())
    }
}
