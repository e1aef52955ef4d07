//! In-memory ledger

use berth_core::Digest;
use dashmap::DashMap;
use std::fmt;

use super::LedgerRecord;

/// Ledger that keeps records in a concurrent map; contents vanish on drop
pub struct MemoryLedger<T> {
    entries: DashMap<Digest, Vec<T>>,
}

impl<T: LedgerRecord> MemoryLedger<T> {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Append a record under its digest
    pub fn append(&self, record: T) {
        self.entries
            .entry(record.digest().clone())
            .or_default()
            .push(record);
    }

    /// Snapshot of the records for a digest
    pub fn records(&self, digest: &Digest) -> Vec<T> {
        self.entries
            .get(digest)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of digests with at least one record
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger holds no records at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: LedgerRecord> Default for MemoryLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LedgerRecord> fmt::Debug for MemoryLedger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLedger")
            .field("ledger", &T::LEDGER)
            .field("digests", &self.entries.len())
            .finish()
    }
}
