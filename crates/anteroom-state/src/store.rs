//! AdmissionStore — redb-backed persistence for the waiting room.
//!
//! Provides the batch allow-list write used by the processor, the point
//! lookup used by the poll check, and get/put for the two singleton
//! control records. The store supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Thread-safe admission store backed by redb.
#[derive(Clone)]
pub struct AdmissionStore {
    db: Arc<Database>,
}

impl AdmissionStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "admission store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory admission store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ALLOW_LIST).map_err(map_err!(Table))?;
        txn.open_table(CONTROL).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Allow list ─────────────────────────────────────────────────

    /// Write a batch of allow-list entries in a single transaction.
    ///
    /// Either every entry commits or none does; the processor relies on
    /// this to decide whether the corresponding queue messages may be
    /// deleted. Re-writing an existing token is a no-op by value.
    pub fn put_entries(&self, entries: &[AllowListEntry]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ALLOW_LIST).map_err(map_err!(Table))?;
            for entry in entries {
                let value = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
                table
                    .insert(entry.token.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count = entries.len(), "allow-list entries stored");
        Ok(())
    }

    /// Point lookup by admission token.
    pub fn get_entry(&self, token: &str) -> StoreResult<Option<AllowListEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ALLOW_LIST).map_err(map_err!(Table))?;
        match table.get(token).map_err(map_err!(Read))? {
            Some(guard) => {
                let entry: AllowListEntry =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Number of admitted tokens.
    pub fn count_entries(&self) -> StoreResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ALLOW_LIST).map_err(map_err!(Table))?;
        let mut count = 0u64;
        for item in table.iter().map_err(map_err!(Read))? {
            item.map_err(map_err!(Read))?;
            count += 1;
        }
        Ok(count)
    }

    /// Delete entries admitted before the cutoff (unix millis). Returns
    /// the number removed. Retention maintenance; never run implicitly.
    pub fn purge_admitted_before(&self, cutoff: u64) -> StoreResult<u64> {
        // Collect expired tokens in a read transaction first.
        let tokens: Vec<String> = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(ALLOW_LIST).map_err(map_err!(Table))?;
            let mut expired = Vec::new();
            for item in table.iter().map_err(map_err!(Read))? {
                let (key, value) = item.map_err(map_err!(Read))?;
                let entry: AllowListEntry =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if entry.admitted_at < cutoff {
                    expired.push(key.value().to_string());
                }
            }
            expired
        };
        // Delete in a write transaction.
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count = tokens.len() as u64;
        {
            let mut table = txn.open_table(ALLOW_LIST).map_err(map_err!(Table))?;
            for token in &tokens {
                table.remove(token.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count, cutoff, "expired allow-list entries purged");
        Ok(count)
    }

    // ── Control records ────────────────────────────────────────────

    /// Get the latency baseline, if one has been captured.
    pub fn get_baseline(&self) -> StoreResult<Option<BaselineStats>> {
        self.get_control(BASELINE_KEY)
    }

    /// Persist the latency baseline.
    pub fn put_baseline(&self, stats: &BaselineStats) -> StoreResult<()> {
        self.put_control(BASELINE_KEY, stats)
    }

    /// Delete the latency baseline so the next prober run recaptures it.
    pub fn clear_baseline(&self) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(CONTROL).map_err(map_err!(Table))?;
            existed = table.remove(BASELINE_KEY).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    /// Get the rate controller state, if seeded.
    pub fn get_tune(&self) -> StoreResult<Option<TuneState>> {
        self.get_control(TUNE_KEY)
    }

    /// Persist the rate controller state.
    pub fn put_tune(&self, state: &TuneState) -> StoreResult<()> {
        self.put_control(TUNE_KEY, state)
    }

    fn get_control<T: serde::de::DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONTROL).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put_control<T: serde::Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CONTROL).map_err(map_err!(Table))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "control record stored");
        Ok(())
    }
}
