//! # berth-service
//!
//! The admission service decides, per content digest, whether storage is
//! reserved for a space, whether an upload may proceed and whether custody
//! of received bytes can be attested with a location commitment.
//!
//! It holds no state of its own beyond per-digest locks; every decision
//! re-reads the ledgers and payload store it is composed with.

pub mod blob;

pub use blob::{Allocated, BlobService};
