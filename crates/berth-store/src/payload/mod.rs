//! Content-addressed payload storage
//!
//! Payload stores hold blob bytes keyed by digest. Writes are verified as
//! they stream: a payload is committed only if it has exactly the declared
//! size and hashes to the declared digest.

use async_trait::async_trait;
use berth_core::error::BerthError;
use berth_core::types::SHA2_256;
use berth_core::utils::Sha256Stream;
use berth_core::Digest;
use camino::Utf8PathBuf;
use std::fmt;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::StoreResult;

pub mod fs;
pub mod memory;


pub use fs::FsPayloadStore;
pub use memory::MemoryPayloadStore;

/// Boxed byte stream
pub type PayloadReader = Pin<Box<dyn AsyncRead + Send>>;

/// Stored payload: its length and a reader over its bytes
pub struct Payload {
    pub size: u64,
    pub reader: PayloadReader,
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload").field("size", &self.size).finish_non_exhaustive()
    }
}

impl Payload {
    /// Read the whole payload into memory
    pub async fn into_bytes(mut self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size as usize);
        self.reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| BerthError::io("Failed to read payload", e))?;
        Ok(buf)
    }
}

/// Content-addressed byte storage
#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Open a stored payload; `NotFound` if the digest was never written
    async fn get(&self, digest: &Digest) -> StoreResult<Payload>;

    /// Stream `size` bytes from `body` into the store under `digest`
    async fn put(&self, digest: &Digest, size: u64, body: PayloadReader) -> StoreResult<()>;

    /// Location on disk the payload can be served from directly, if any
    fn file_path(&self, _digest: &Digest) -> Option<Utf8PathBuf> {
        None
    }
}

pub(crate) fn not_found(digest: &Digest) -> BerthError {
    BerthError::NotFound {
        resource: format!("blob {}", digest),
    }
}

/// Copy `body` into `sink`, verifying it matches `digest` and `size`
pub(crate) async fn copy_verified<W>(
    digest: &Digest,
    size: u64,
    body: PayloadReader,
    sink: &mut W,
) -> StoreResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    if digest.code() != SHA2_256 {
        return Err(BerthError::UnsupportedHash {
            digest: digest.to_string(),
            code: digest.code(),
        });
    }

    // one extra byte lets an oversized body be detected without reading it all
    let mut limited = body.take(size.saturating_add(1));
    let mut hasher = Sha256Stream::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = limited
            .read(&mut buf)
            .await
            .map_err(|e| BerthError::io(format!("Failed to read upload body for {}", digest), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        if hasher.len() > size {
            return Err(BerthError::DataInconsistent {
                digest: digest.to_string(),
                reason: format!("body exceeds declared size of {} bytes", size),
            });
        }
        sink.write_all(&buf[..n])
            .await
            .map_err(|e| BerthError::io(format!("Failed to write payload for {}", digest), e))?;
    }

    if hasher.len() != size {
        return Err(BerthError::DataInconsistent {
            digest: digest.to_string(),
            reason: format!("expected {} bytes, received {}", size, hasher.len()),
        });
    }

    let actual = hasher.finalize();
    if actual.as_slice() != digest.hash_bytes() {
        return Err(BerthError::DataInconsistent {
            digest: digest.to_string(),
            reason: format!("content hashes to {}", Digest::from_sha256(actual)),
        });
    }

    sink.flush()
        .await
        .map_err(|e| BerthError::io(format!("Failed to flush payload for {}", digest), e))?;
    Ok(())
}
