//! Capability definitions.
//!
//! A capability pairs a command name with its argument and success types
//! and the static policy its arguments must satisfy before any handler
//! runs.

use berth_core::error::{BerthError, BerthResult};
use berth_core::types::SHA2_256;
use berth_core::{Blob, Link};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::invocation::InvocationPayload;
use crate::policy::{self, Statement};

pub mod blob;
pub mod space;

pub use blob::{AcceptArgs, AcceptOk, AllocateArgs, AllocateOk, BlobAccept, BlobAddress, BlobAllocate, CborUrl};
pub use space::{AddArgs, AddOk, SpaceBlobAdd};

/// Largest blob accepted by the blob capabilities (256 MiB)
pub const MAX_BLOB_SIZE: u64 = 268_435_456;

/// A named command with typed arguments
pub trait Capability {
    /// Command name, e.g. `/blob/allocate`
    const COMMAND: &'static str;

    type Args: Serialize + DeserializeOwned + Send;
    type Ok: Serialize + DeserializeOwned + Send;

    /// Statements the invocation arguments must satisfy
    fn policy() -> Vec<Statement> {
        Vec::new()
    }

    /// Checks on the typed arguments that a policy statement cannot express
    fn validate(_args: &Self::Args) -> BerthResult<()> {
        Ok(())
    }

    /// Bind and policy-check the arguments of an invocation
    fn bind(invocation: &InvocationPayload) -> BerthResult<Self::Args> {
        let args = invocation.bind_args()?;
        policy::check(&Self::policy(), &invocation.args, Self::COMMAND)?;
        Self::validate(&args)?;
        Ok(args)
    }
}

/// Blobs are addressed by full-length sha2-256 multihashes only
pub(crate) fn require_sha256(blob: &Blob, capability: &str) -> BerthResult<()> {
    let digest = &blob.digest;
    if digest.code() != SHA2_256 {
        return Err(BerthError::PolicyViolation {
            capability: capability.to_string(),
            reason: format!("unsupported multihash code 0x{:x}, expected sha2-256", digest.code()),
        });
    }
    if digest.hash_bytes().len() != 32 {
        return Err(BerthError::PolicyViolation {
            capability: capability.to_string(),
            reason: format!("sha2-256 digest has {} bytes, expected 32", digest.hash_bytes().len()),
        });
    }
    Ok(())
}

/// Size bounds shared by capabilities that carry a blob
pub(crate) fn blob_size_policy() -> Vec<Statement> {
    vec![
        Statement::greater_than(".blob.size", 0),
        Statement::less_than_or_equal(".blob.size", MAX_BLOB_SIZE),
    ]
}

/// Reference to the successful result of another invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitOk {
    #[serde(rename = "await/ok")]
    pub task: Link,
}

impl AwaitOk {
    pub fn new(task: Link) -> Self {
        Self { task }
    }
}
