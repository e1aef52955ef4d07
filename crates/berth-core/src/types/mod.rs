//! Core data types for the admission protocol.
//!
//! This module provides the fundamental types used throughout berth:
//! - Content addressing (`Digest`, `Blob`)
//! - Principals and links (`Did`, `Link`)
//! - Ledger records (`Allocation`, `Acceptance`) and upload `Address`es

pub mod blob;
pub mod link;
pub mod principal;
pub mod records;

// Re-export all public types
pub use blob::{Blob, Digest, SHA2_256};
pub use link::{Link, DAG_CBOR};
pub use principal::Did;
pub use records::{Acceptance, Address, Allocation, ALLOCATION_TTL_SECS};
