//! # berth-ucan
//!
//! Capability plumbing for berth nodes.
//!
//! This crate provides:
//! - Node identity (`Signer`) and `did:key` principals
//! - Signed envelopes for delegations, invocations and receipts
//! - Policy statements and selector evaluation
//! - The `/blob/allocate`, `/blob/accept` and `/space/blob/add` capability models
//! - The location commitment issuer
//!
//! Delegation chains are not validated here; invocations only have their
//! own signature checked.

pub mod capabilities;
pub mod codec;
pub mod commitment;
pub mod delegation;
pub mod envelope;
pub mod invocation;
pub mod policy;
pub mod signer;

// Re-export commonly used types
pub use capabilities::{Capability, MAX_BLOB_SIZE};
pub use commitment::{issue_location_commitment, LOCATION_COMMAND};
pub use delegation::{Delegation, DelegationPayload};
pub use envelope::{EnvelopePayload, Signed};
pub use invocation::{issue_receipt, Failure, Invocation, InvocationPayload, Outcome, Receipt, ReceiptPayload};
pub use policy::Statement;
pub use signer::Signer;

/// Fresh random nonce for envelopes
pub(crate) fn nonce() -> Vec<u8> {
    rand::random::<[u8; 12]>().to_vec()
}
