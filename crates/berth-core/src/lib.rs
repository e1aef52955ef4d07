//! # berth-core
//!
//! Core types and utilities shared across all berth crates.
//!
//! This crate provides:
//! - Content addressing types (`Digest`, `Blob`) backed by multihashes
//! - Principal and link types (`Did`, `Link`)
//! - Ledger record types (`Allocation`, `Acceptance`) and the ephemeral `Address`
//! - `BerthError` enum for unified error handling
//! - `RequestContext` for cancellation-aware collaborator calls
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types
//! - `error`: Error types and result aliases
//! - `context`: Per-request context threaded through service calls
//! - `utils`: Multibase and time helpers

pub mod context;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use context::RequestContext;
pub use error::{BerthError, BerthResult};
pub use types::{Acceptance, Address, Allocation, Blob, Did, Digest, Link};
