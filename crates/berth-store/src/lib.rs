//! Storage collaborators for berth
//!
//! This crate provides the three stores the admission service talks to:
//! the allocation ledger, the acceptance ledger and the content-addressed
//! payload store. Each comes as an async trait with an in-memory
//! implementation (tests, ephemeral nodes) and a filesystem implementation
//! (production), selected by configuration.

pub mod ledger;
pub mod payload;
mod shard;

// Re-export main types
pub use ledger::{
    AcceptanceLedger, AllocationLedger, FsAcceptanceLedger, FsAllocationLedger, FsLedger,
    LedgerRecord, MemoryAcceptanceLedger, MemoryAllocationLedger, MemoryLedger,
};
pub use payload::{FsPayloadStore, MemoryPayloadStore, Payload, PayloadReader, PayloadStore};

use berth_core::error::BerthError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, BerthError>;
