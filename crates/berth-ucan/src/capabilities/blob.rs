//! `/blob/*` capabilities: storage allocation and upload acceptance.

use berth_core::error::{BerthError, BerthResult};
use berth_core::{Address, Blob, Did, Link};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use url::Url;

use super::{blob_size_policy, require_sha256, AwaitOk, Capability};
use crate::policy::Statement;

/// Longest URL carried in a blob address
pub const MAX_URL_LEN: usize = 8192;

/// Reserve storage for a blob on behalf of a space
pub struct BlobAllocate;

impl Capability for BlobAllocate {
    const COMMAND: &'static str = "/blob/allocate";

    type Args = AllocateArgs;
    type Ok = AllocateOk;

    fn policy() -> Vec<Statement> {
        blob_size_policy()
    }

    fn validate(args: &AllocateArgs) -> BerthResult<()> {
        require_sha256(&args.blob, Self::COMMAND)
    }
}

/// Confirm an upload completed and request a location commitment
pub struct BlobAccept;

impl Capability for BlobAccept {
    const COMMAND: &'static str = "/blob/accept";

    type Args = AcceptArgs;
    type Ok = AcceptOk;

    fn validate(args: &AcceptArgs) -> BerthResult<()> {
        require_sha256(&args.blob, Self::COMMAND)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateArgs {
    pub blob: Blob,
    /// The invocation this allocation is made for
    pub cause: Link,
    pub space: Did,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateOk {
    /// Bytes newly charged to the space
    pub size: u64,
    /// Where to upload; absent once the blob has been received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<BlobAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobAddress {
    pub url: CborUrl,
    /// Unix seconds
    pub expires: u64,
    pub headers: BTreeMap<String, String>,
}

impl TryFrom<Address> for BlobAddress {
    type Error = BerthError;

    fn try_from(address: Address) -> BerthResult<Self> {
        Ok(Self {
            url: CborUrl::new(address.url)?,
            expires: address.expires,
            headers: address.headers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptArgs {
    #[serde(rename = "_put")]
    pub put: AwaitOk,
    pub blob: Blob,
    pub space: Did,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOk {
    /// Link to the location commitment
    pub site: Link,
}

/// A URL that encodes as a string of at most [`MAX_URL_LEN`] bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CborUrl(Url);

impl CborUrl {
    pub fn new(url: Url) -> BerthResult<Self> {
        if url.as_str().len() > MAX_URL_LEN {
            return Err(BerthError::Encoding {
                message: format!("URL exceeds {} bytes", MAX_URL_LEN),
            });
        }
        Ok(Self(url))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl Serialize for CborUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for CborUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.len() > MAX_URL_LEN {
            return Err(D::Error::custom(format!("URL exceeds {} bytes", MAX_URL_LEN)));
        }
        let url = Url::parse(&text).map_err(D::Error::custom)?;
        Ok(Self(url))
    }
}
