//! `/space/blob/add`: the agent-facing request that starts an upload.
//!
//! It is served elsewhere; the models live here because allocations name
//! its invocation as their cause.

use berth_core::Blob;
use serde::{Deserialize, Serialize};

use super::{blob_size_policy, AwaitOk, Capability};
use crate::policy::Statement;

/// Add a blob to a space
pub struct SpaceBlobAdd;

impl Capability for SpaceBlobAdd {
    const COMMAND: &'static str = "/space/blob/add";

    type Args = AddArgs;
    type Ok = AddOk;

    fn policy() -> Vec<Statement> {
        blob_size_policy()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddArgs {
    pub blob: Blob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOk {
    /// Resolves to the location commitment once the blob is accepted
    pub site: AwaitOk,
}
