//! Filesystem payload store
//!
//! Uploads are staged in a temporary directory and renamed into a sharded
//! tree once verified, so readers never observe partial blobs. The temp
//! directory should live on the same filesystem as the blob directory.

use async_trait::async_trait;
use berth_core::error::BerthError;
use berth_core::Digest;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::ErrorKind;
use tokio::fs;
use tracing::{debug, info};

use super::{copy_verified, not_found, Payload, PayloadReader, PayloadStore};
use crate::shard::{shard_dir, shard_path};
use crate::StoreResult;

/// Payload store persisting blobs as files
#[derive(Debug)]
pub struct FsPayloadStore {
    /// Root directory for blobs
    root: Utf8PathBuf,
    /// Staging directory for in-flight uploads
    tmp_dir: Utf8PathBuf,
}

impl FsPayloadStore {
    /// Open (creating if needed) a store rooted at `root`, staging uploads in `tmp_dir`
    pub async fn open<P: AsRef<Utf8Path>, Q: AsRef<Utf8Path>>(root: P, tmp_dir: Q) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let tmp_dir = tmp_dir.as_ref().to_path_buf();

        for dir in [&root, &tmp_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| BerthError::io(format!("Failed to create blob store directory {}", dir), e))?;
        }

        Ok(Self { root, tmp_dir })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn blob_path(&self, digest: &Digest) -> Utf8PathBuf {
        shard_path(&self.root, digest, None)
    }
}

#[async_trait]
impl PayloadStore for FsPayloadStore {
    async fn get(&self, digest: &Digest) -> StoreResult<Payload> {
        let path = self.blob_path(digest);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(digest)),
            Err(e) => return Err(BerthError::io(format!("Failed to open blob file {}", path), e)),
        };
        let metadata = file
            .metadata()
            .await
            .map_err(|e| BerthError::io(format!("Failed to stat blob file {}", path), e))?;

        Ok(Payload {
            size: metadata.len(),
            reader: Box::pin(file),
        })
    }

    async fn put(&self, digest: &Digest, size: u64, body: PayloadReader) -> StoreResult<()> {
        let staged = tempfile::NamedTempFile::new_in(&self.tmp_dir)
            .map_err(|e| BerthError::io(format!("Failed to create staging file in {}", self.tmp_dir), e))?;
        let std_file = staged
            .reopen()
            .map_err(|e| BerthError::io("Failed to open staging file", e))?;
        let mut file = fs::File::from_std(std_file);

        // a failed verification drops `staged`, which removes the temp file
        copy_verified(digest, size, body, &mut file).await?;
        file.sync_all()
            .await
            .map_err(|e| BerthError::io("Failed to sync staging file", e))?;
        drop(file);

        let dir = shard_dir(&self.root, digest);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| BerthError::io(format!("Failed to create blob directory {}", dir), e))?;

        let path = self.blob_path(digest);
        staged
            .persist(&path)
            .map_err(|e| BerthError::io(format!("Failed to move blob into {}", path), e.error))?;

        info!(blob = %digest, size, "stored blob");
        debug!(path = %path, "blob file written");
        Ok(())
    }

    fn file_path(&self, digest: &Digest) -> Option<Utf8PathBuf> {
        Some(self.blob_path(digest))
    }
}
