//! In-memory payload store

use async_trait::async_trait;
use berth_core::Digest;
use dashmap::DashMap;
use std::io::Cursor;
use std::sync::Arc;

use super::{copy_verified, not_found, Payload, PayloadReader, PayloadStore};
use crate::StoreResult;

/// Payload store holding blobs in memory; cannot serve files directly
#[derive(Debug, Default)]
pub struct MemoryPayloadStore {
    blobs: DashMap<Digest, Arc<[u8]>>,
}

impl MemoryPayloadStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a payload is held for the digest
    pub fn contains(&self, digest: &Digest) -> bool {
        self.blobs.contains_key(digest)
    }
}

#[async_trait]
impl PayloadStore for MemoryPayloadStore {
    async fn get(&self, digest: &Digest) -> StoreResult<Payload> {
        let bytes = self
            .blobs
            .get(digest)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found(digest))?;

        Ok(Payload {
            size: bytes.len() as u64,
            reader: Box::pin(Cursor::new(bytes)),
        })
    }

    async fn put(&self, digest: &Digest, size: u64, body: PayloadReader) -> StoreResult<()> {
        let mut staged = Vec::with_capacity(size.min(1 << 20) as usize);
        copy_verified(digest, size, body, &mut staged).await?;
        self.blobs.insert(digest.clone(), Arc::from(staged));
        Ok(())
    }
}
