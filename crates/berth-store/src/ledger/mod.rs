//! Allocation and acceptance ledgers
//!
//! Ledgers are append-only mappings from a digest to the records written
//! for it. Records are never mutated or deleted. Implementations must give
//! read-your-writes consistency per digest: a `put` that has returned is
//! visible to every later `list` of the same digest.

use async_trait::async_trait;
use berth_core::{Acceptance, Allocation, Digest};
use serde::{de::DeserializeOwned, Serialize};

use crate::StoreResult;

pub mod fs;
pub mod memory;

#[cfg(test)]
mod tests;

pub use fs::FsLedger;
pub use memory::MemoryLedger;

/// Allocation ledger backed by memory
pub type MemoryAllocationLedger = MemoryLedger<Allocation>;
/// Acceptance ledger backed by memory
pub type MemoryAcceptanceLedger = MemoryLedger<Acceptance>;
/// Allocation ledger backed by JSON-lines files
pub type FsAllocationLedger = FsLedger<Allocation>;
/// Acceptance ledger backed by JSON-lines files
pub type FsAcceptanceLedger = FsLedger<Acceptance>;

/// A record keyed by the digest of the blob it concerns
pub trait LedgerRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable ledger name, used in logs and errors
    const LEDGER: &'static str;

    /// Digest the record is filed under
    fn digest(&self) -> &Digest;
}

impl LedgerRecord for Allocation {
    const LEDGER: &'static str = "allocation ledger";

    fn digest(&self) -> &Digest {
        &self.blob.digest
    }
}

impl LedgerRecord for Acceptance {
    const LEDGER: &'static str = "acceptance ledger";

    fn digest(&self) -> &Digest {
        &self.blob.digest
    }
}

/// Durable mapping from digest to allocation records
#[async_trait]
pub trait AllocationLedger: Send + Sync {
    /// All allocations for a digest, across every space, in write order
    async fn list(&self, digest: &Digest) -> StoreResult<Vec<Allocation>>;

    /// Append an allocation
    async fn put(&self, allocation: Allocation) -> StoreResult<()>;
}

/// Durable mapping from digest to acceptance records
#[async_trait]
pub trait AcceptanceLedger: Send + Sync {
    /// Append an acceptance
    async fn put(&self, acceptance: Acceptance) -> StoreResult<()>;

    /// All acceptances for a digest, in write order
    async fn list(&self, digest: &Digest) -> StoreResult<Vec<Acceptance>>;
}

#[async_trait]
impl AllocationLedger for MemoryLedger<Allocation> {
    async fn list(&self, digest: &Digest) -> StoreResult<Vec<Allocation>> {
        Ok(self.records(digest))
    }

    async fn put(&self, allocation: Allocation) -> StoreResult<()> {
        self.append(allocation);
        Ok(())
    }
}

#[async_trait]
impl AcceptanceLedger for MemoryLedger<Acceptance> {
    async fn put(&self, acceptance: Acceptance) -> StoreResult<()> {
        self.append(acceptance);
        Ok(())
    }

    async fn list(&self, digest: &Digest) -> StoreResult<Vec<Acceptance>> {
        Ok(self.records(digest))
    }
}

#[async_trait]
impl AllocationLedger for FsLedger<Allocation> {
    async fn list(&self, digest: &Digest) -> StoreResult<Vec<Allocation>> {
        self.records(digest).await
    }

    async fn put(&self, allocation: Allocation) -> StoreResult<()> {
        self.append(&allocation).await
    }
}

#[async_trait]
impl AcceptanceLedger for FsLedger<Acceptance> {
    async fn put(&self, acceptance: Acceptance) -> StoreResult<()> {
        self.append(&acceptance).await
    }

    async fn list(&self, digest: &Digest) -> StoreResult<Vec<Acceptance>> {
        self.records(digest).await
    }
}
