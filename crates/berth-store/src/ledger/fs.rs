//! Filesystem ledger
//!
//! Each digest gets one JSON-lines file under a sharded directory tree.
//! Appends are serialized per digest and synced before returning, so a
//! completed `put` is always visible to the next `list`.
//!
//! Only newline-terminated lines are records. A trailing fragment left by an
//! interrupted append is skipped on read and truncated by the next append.

use berth_core::error::BerthError;
use berth_core::Digest;
use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use std::fmt;
use std::io::{ErrorKind, SeekFrom};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::LedgerRecord;
use crate::shard::{shard_dir, shard_path};
use crate::StoreResult;

/// Append-only ledger persisted as JSON-lines files
pub struct FsLedger<T> {
    /// Root directory for ledger files
    root: Utf8PathBuf,
    /// Per-digest write locks
    locks: DashMap<Digest, Arc<Mutex<()>>>,
    _record: PhantomData<fn() -> T>,
}

impl<T: LedgerRecord> FsLedger<T> {
    /// Open (creating if needed) a ledger rooted at `root`
    pub async fn open<P: AsRef<Utf8Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| BerthError::io(format!("Failed to create {} directory {}", T::LEDGER, root), e))?;

        Ok(Self {
            root,
            locks: DashMap::new(),
            _record: PhantomData,
        })
    }

    /// Root directory of the ledger
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn lock_for(&self, digest: &Digest) -> Arc<Mutex<()>> {
        self.locks
            .entry(digest.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry for `digest` once no other task holds it
    fn release_lock(&self, digest: &Digest, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks.remove_if(digest, |_, l| Arc::strong_count(l) == 1);
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Append a record and sync it to disk
    pub async fn append(&self, record: &T) -> StoreResult<()> {
        let digest = record.digest();
        let mut line = serde_json::to_vec(record).map_err(BerthError::encoding)?;
        line.push(b'\n');

        let lock = self.lock_for(digest);
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(digest, &line).await
        };
        self.release_lock(digest, lock);
        result
    }

    async fn append_locked(&self, digest: &Digest, line: &[u8]) -> StoreResult<()> {
        let dir = shard_dir(&self.root, digest);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| BerthError::io(format!("Failed to create ledger directory {}", dir), e))?;

        let path = shard_path(&self.root, digest, Some("jsonl"));
        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .await
            .map_err(|e| BerthError::io(format!("Failed to open ledger file {}", path), e))?;

        truncate_torn_tail(&mut file, &path)
            .await
            .map_err(|e| BerthError::io(format!("Failed to repair ledger file {}", path), e))?;
        file.seek(SeekFrom::End(0))
            .await
            .map_err(|e| BerthError::io(format!("Failed to seek ledger file {}", path), e))?;

        file.write_all(line)
            .await
            .map_err(|e| BerthError::io(format!("Failed to append to ledger file {}", path), e))?;
        file.sync_data()
            .await
            .map_err(|e| BerthError::io(format!("Failed to sync ledger file {}", path), e))?;

        debug!(ledger = T::LEDGER, blob = %digest, "appended ledger record");
        Ok(())
    }

    /// Read every record for a digest
    pub async fn records(&self, digest: &Digest) -> StoreResult<Vec<T>> {
        let path = shard_path(&self.root, digest, Some("jsonl"));

        let lock = self.lock_for(digest);
        let read = {
            let _guard = lock.lock().await;
            fs::read_to_string(&path).await
        };
        self.release_lock(digest, lock);

        let content = match read {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BerthError::io(format!("Failed to read ledger file {}", path), e)),
        };

        let complete = match content.rfind('\n') {
            Some(end) => &content[..=end],
            None => "",
        };
        if complete.len() < content.len() {
            warn!(ledger = T::LEDGER, path = %path, "ignoring unterminated ledger record");
        }

        complete
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| BerthError::Encoding {
                    message: format!("corrupt record {} in {}: {}", n + 1, path, e),
                })
            })
            .collect()
    }
}

/// Cut a trailing partial line left by an interrupted append
async fn truncate_torn_tail(file: &mut fs::File, path: &Utf8Path) -> std::io::Result<()> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1)).await?;
    file.read_exact(&mut last).await?;
    if last[0] == b'\n' {
        return Ok(());
    }

    let mut content = Vec::with_capacity(len as usize);
    file.seek(SeekFrom::Start(0)).await?;
    file.read_to_end(&mut content).await?;
    let keep = content.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    file.set_len(keep as u64).await?;
    warn!(path = %path, dropped = len - keep as u64, "truncated unterminated ledger record");
    Ok(())
}

impl<T: LedgerRecord> fmt::Debug for FsLedger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsLedger")
            .field("ledger", &T::LEDGER)
            .field("root", &self.root)
            .finish()
    }
}
