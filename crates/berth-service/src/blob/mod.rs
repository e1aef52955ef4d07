//! Blob admission: allocate, receive and accept.

use berth_core::error::{BerthError, BerthResult};
use berth_core::types::ALLOCATION_TTL_SECS;
use berth_core::utils::now_unix;
use berth_core::{Acceptance, Address, Allocation, Blob, Did, Digest, Link, RequestContext};
use berth_store::{AcceptanceLedger, AllocationLedger, PayloadReader, PayloadStore};
use berth_ucan::{issue_location_commitment, Delegation, Signer};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

#[cfg(test)]
mod tests;

const ALLOCATION_LEDGER: &str = "allocation ledger";
const ACCEPTANCE_LEDGER: &str = "acceptance ledger";
const PAYLOAD_STORE: &str = "payload store";

/// Outcome of an allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocated {
    /// Bytes newly charged to the space; 0 if it already held an allocation
    pub size: u64,
    /// Upload location, present until the blob has been received
    pub address: Option<Address>,
}

/// The admission service
pub struct BlobService {
    signer: Signer,
    public_url: Url,
    blobs: Arc<dyn PayloadStore>,
    allocations: Arc<dyn AllocationLedger>,
    acceptances: Arc<dyn AcceptanceLedger>,
    /// Serializes the read-then-append of `allocate` per digest
    locks: DashMap<Digest, Arc<Mutex<()>>>,
}

impl BlobService {
    pub fn new(
        signer: Signer,
        public_url: Url,
        blobs: Arc<dyn PayloadStore>,
        allocations: Arc<dyn AllocationLedger>,
        acceptances: Arc<dyn AcceptanceLedger>,
    ) -> Self {
        Self {
            signer,
            public_url,
            blobs,
            allocations,
            acceptances,
            locks: DashMap::new(),
        }
    }

    /// Node identity used to sign commitments
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn public_url(&self) -> &Url {
        &self.public_url
    }

    /// Payload store backing this service
    pub fn blobs(&self) -> &Arc<dyn PayloadStore> {
        &self.blobs
    }

    /// Canonical retrieval (and upload) URL for a digest: `{public_url}/blob/{digest}`
    pub fn blob_url(&self, digest: &Digest) -> BerthResult<Url> {
        let mut url = self.public_url.clone();
        url.path_segments_mut()
            .map_err(|_| BerthError::ConfigValidation {
                field: "server.public_url".to_string(),
                reason: format!("{} cannot be used as a base URL", self.public_url),
            })?
            .pop_if_empty()
            .push("blob")
            .push(&digest.to_multibase());
        Ok(url)
    }

    /// Reserve storage for `blob` on behalf of `space`.
    ///
    /// Every call that is not a repeat of a completed upload appends an
    /// allocation record, even when the space already holds one; only the
    /// first is charged. An address is returned until the bytes arrive.
    pub async fn allocate(
        &self,
        ctx: &RequestContext,
        space: &Did,
        blob: &Blob,
        cause: &Link,
    ) -> BerthResult<Allocated> {
        let digest = &blob.digest;
        info!(space = %space, blob = %digest, size = blob.size, "allocating blob");

        let lock = self.lock_for(digest);
        let guard = match ctx
            .run("allocate", async { Ok(lock.clone().lock_owned().await) })
            .await
        {
            Ok(guard) => guard,
            Err(e) => {
                drop(lock);
                self.release_lock(digest);
                return Err(e);
            },
        };

        let result = self.allocate_locked(ctx, space, blob, cause).await;

        drop(guard);
        drop(lock);
        self.release_lock(digest);
        result
    }

    async fn allocate_locked(
        &self,
        ctx: &RequestContext,
        space: &Did,
        blob: &Blob,
        cause: &Link,
    ) -> BerthResult<Allocated> {
        let digest = &blob.digest;

        let existing = ctx
            .run("list allocations", self.allocations.list(digest))
            .await
            .map_err(collaborator(ALLOCATION_LEDGER, "list", digest))?;

        let allocated = existing.iter().any(|a| &a.space == space);

        // the payload store is only consulted for digests someone reserved
        let received = if existing.is_empty() {
            false
        } else {
            self.has_blob(ctx, digest).await?
        };

        let size = if allocated {
            debug!(space = %space, blob = %digest, "blob allocation already exists");
            0
        } else {
            blob.size
        };

        if allocated && received {
            info!(space = %space, blob = %digest, "blob already received");
            return Ok(Allocated { size, address: None });
        }

        let expires = now_unix() + ALLOCATION_TTL_SECS;
        let address = if received {
            None
        } else {
            Some(Address {
                url: self.blob_url(digest)?,
                headers: BTreeMap::new(),
                expires,
            })
        };

        ctx.run(
            "put allocation",
            self.allocations.put(Allocation {
                space: space.clone(),
                blob: blob.clone(),
                expires,
                cause: cause.clone(),
            }),
        )
        .await
        .map_err(collaborator(ALLOCATION_LEDGER, "put", digest))?;

        info!(
            space = %space,
            blob = %digest,
            size,
            upload = address.is_some(),
            "allocated blob"
        );
        Ok(Allocated { size, address })
    }

    /// Confirm `blob` was received for `space` and issue a location commitment.
    ///
    /// Each call records a new acceptance and signs a fresh commitment. The
    /// commitment itself is not stored.
    pub async fn accept(
        &self,
        ctx: &RequestContext,
        space: &Did,
        blob: &Blob,
        cause: &Link,
    ) -> BerthResult<Delegation> {
        let digest = &blob.digest;
        info!(space = %space, blob = %digest, size = blob.size, "accepting blob");

        if !self.has_blob(ctx, digest).await? {
            warn!(space = %space, blob = %digest, "accept before upload");
            return Err(BerthError::BlobNotFound {
                space: space.to_string(),
                digest: digest.to_string(),
            });
        }

        ctx.run(
            "put acceptance",
            self.acceptances.put(Acceptance {
                space: space.clone(),
                blob: blob.clone(),
                executed_at: now_unix(),
                cause: cause.clone(),
            }),
        )
        .await
        .map_err(collaborator(ACCEPTANCE_LEDGER, "put", digest))?;

        let url = self.blob_url(digest)?;
        let commitment = issue_location_commitment(&self.signer, space, digest, &url, blob.size)?;

        info!(space = %space, blob = %digest, site = %commitment.link(), "accepted blob");
        Ok(commitment)
    }

    /// Check that at least one live allocation permits a write of `digest`
    pub async fn authorize_write(&self, ctx: &RequestContext, digest: &Digest) -> BerthResult<()> {
        let allocations = ctx
            .run("list allocations", self.allocations.list(digest))
            .await
            .map_err(collaborator(ALLOCATION_LEDGER, "list", digest))?;

        if allocations.is_empty() {
            return Err(BerthError::MissingAllocation {
                digest: digest.to_string(),
            });
        }

        let now = now_unix();
        if allocations.iter().all(|a| a.is_expired(now)) {
            return Err(BerthError::AllocationExpired {
                digest: digest.to_string(),
            });
        }

        debug!(blob = %digest, allocations = allocations.len(), "write authorized");
        Ok(())
    }

    /// Store uploaded bytes for an allocated digest
    pub async fn receive(
        &self,
        ctx: &RequestContext,
        digest: &Digest,
        size: u64,
        body: PayloadReader,
    ) -> BerthResult<()> {
        self.authorize_write(ctx, digest).await?;

        ctx.run("put blob", self.blobs.put(digest, size, body))
            .await
            .map_err(|e| match e {
                // the caller sent bad bytes; nothing to attribute to the store
                BerthError::DataInconsistent { .. } | BerthError::UnsupportedHash { .. } => e,
                other => collaborator(PAYLOAD_STORE, "put", digest)(other),
            })?;

        info!(blob = %digest, size, "received blob");
        Ok(())
    }

    async fn has_blob(&self, ctx: &RequestContext, digest: &Digest) -> BerthResult<bool> {
        match ctx.run("get blob", self.blobs.get(digest)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(collaborator(PAYLOAD_STORE, "get", digest)(e)),
        }
    }

    fn lock_for(&self, digest: &Digest) -> Arc<Mutex<()>> {
        self.locks
            .entry(digest.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release_lock(&self, digest: &Digest) {
        // only the map still holds it: nobody is waiting
        self.locks.remove_if(digest, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Wrap a collaborator error with where it happened; cancellation passes through
fn collaborator<'a>(
    component: &'static str,
    operation: &'static str,
    digest: &'a Digest,
) -> impl FnOnce(BerthError) -> BerthError + 'a {
    move |err| match err {
        BerthError::Cancelled { .. } => err,
        other => {
            warn!(blob = %digest, error = %other, "{} {} failed", component, operation);
            BerthError::collaborator(component, operation, digest, other)
        },
    }
}
