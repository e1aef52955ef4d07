//! Ledger records and upload addresses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use super::{Blob, Did, Link};

/// How long an allocation (and the address it hands out) stays valid
pub const ALLOCATION_TTL_SECS: u64 = 24 * 60 * 60;

/// A reservation of storage capacity for a blob on behalf of a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub space: Did,
    pub blob: Blob,
    /// Unix seconds after which the allocation no longer authorizes writes
    pub expires: u64,
    /// The invocation that caused this allocation
    pub cause: Link,
}

impl Allocation {
    /// Whether the allocation has lapsed at `now` (unix seconds)
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires <= now
    }
}

/// A record that a blob was received and custody attested for a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    pub space: Did,
    pub blob: Blob,
    #[serde(rename = "executedAt")]
    pub executed_at: u64,
    pub cause: Link,
}

/// Where and how to upload a blob; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    /// Unix seconds
    pub expires: u64,
}
