//! Unit tests for ledgers

use super::*;
use berth_core::{Blob, Did, Link};
use camino::Utf8PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

fn space(name: &str) -> Did {
    Did::parse(&format!("did:web:{}.example", name)).unwrap()
}

fn allocation(content: &[u8], space_name: &str, expires: u64) -> Allocation {
    Allocation {
        space: space(space_name),
        blob: Blob::from_content(content),
        expires,
        cause: Link::of_dag_cbor(space_name.as_bytes()),
    }
}

fn acceptance(content: &[u8], space_name: &str) -> Acceptance {
    Acceptance {
        space: space(space_name),
        blob: Blob::from_content(content),
        executed_at: 1_700_000_000,
        cause: Link::of_dag_cbor(space_name.as_bytes()),
    }
}

async fn fs_ledger<T: LedgerRecord>(dir: &tempfile::TempDir) -> FsLedger<T> {
    let root = Utf8PathBuf::from_path_buf(dir.path().join("ledger")).unwrap();
    FsLedger::open(root).await.unwrap()
}

async fn exercise_allocation_ledger(ledger: &dyn AllocationLedger) {
    let digest = Digest::sha256(b"blob one");
    assert!(ledger.list(&digest).await.unwrap().is_empty());

    ledger.put(allocation(b"blob one", "alice", 10)).await.unwrap();
    ledger.put(allocation(b"blob one", "alice", 20)).await.unwrap();
    ledger.put(allocation(b"blob one", "bob", 30)).await.unwrap();
    ledger.put(allocation(b"blob two", "bob", 40)).await.unwrap();

    let listed = ledger.list(&digest).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(
        listed.iter().map(|a| a.expires).collect::<Vec<_>>(),
        vec![10, 20, 30]
    );
    assert_eq!(listed[2].space, space("bob"));

    let other = ledger.list(&Digest::sha256(b"blob two")).await.unwrap();
    assert_eq!(other.len(), 1);
}

#[tokio::test]
async fn test_memory_allocation_ledger() {
    let ledger = MemoryAllocationLedger::new();
    exercise_allocation_ledger(&ledger).await;
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
async fn test_fs_allocation_ledger() {
    let dir = tempdir().unwrap();
    let ledger: FsAllocationLedger = fs_ledger(&dir).await;
    exercise_allocation_ledger(&ledger).await;
}

#[tokio::test]
async fn test_fs_ledger_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let ledger: FsAcceptanceLedger = fs_ledger(&dir).await;
        AcceptanceLedger::put(&ledger, acceptance(b"kept", "alice")).await.unwrap();
    }

    let reopened: FsAcceptanceLedger = fs_ledger(&dir).await;
    let listed = AcceptanceLedger::list(&reopened, &Digest::sha256(b"kept")).await.unwrap();
    assert_eq!(listed, vec![acceptance(b"kept", "alice")]);
}

#[tokio::test]
async fn test_fs_ledger_reports_corruption() {
    let dir = tempdir().unwrap();
    let ledger: FsAllocationLedger = fs_ledger(&dir).await;
    let record = allocation(b"corrupt", "alice", 10);
    AllocationLedger::put(&ledger, record.clone()).await.unwrap();

    let path = crate::shard::shard_path(ledger.root(), &record.blob.digest, Some("jsonl"));
    tokio::fs::write(&path, b"{not json}\n").await.unwrap();

    let err = AllocationLedger::list(&ledger, &record.blob.digest).await.unwrap_err();
    assert!(err.to_string().contains("corrupt record 1"));
}

#[tokio::test]
async fn test_fs_ledger_concurrent_appends() {
    let dir = tempdir().unwrap();
    let ledger: Arc<FsAllocationLedger> = Arc::new(fs_ledger(&dir).await);

    let mut handles = Vec::new();
    for i in 0..16u64 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            AllocationLedger::put(ledger.as_ref(), allocation(b"busy", "alice", i)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listed = AllocationLedger::list(ledger.as_ref(), &Digest::sha256(b"busy")).await.unwrap();
    assert_eq!(listed.len(), 16);
    let mut expires: Vec<u64> = listed.iter().map(|a| a.expires).collect();
    expires.sort_unstable();
    assert_eq!(expires, (0..16).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_memory_acceptance_ledger() {
    let ledger = MemoryAcceptanceLedger::new();
    ledger.put(acceptance(b"x", "alice")).await.unwrap();
    ledger.put(acceptance(b"x", "alice")).await.unwrap();

    // no deduplication
    let listed = AcceptanceLedger::list(&ledger, &Digest::sha256(b"x")).await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_fs_ledger_releases_digest_locks() {
    let dir = tempdir().unwrap();
    let ledger: FsAllocationLedger = fs_ledger(&dir).await;

    for i in 0..8u64 {
        let content = format!("blob {}", i);
        AllocationLedger::put(&ledger, allocation(content.as_bytes(), "alice", i)).await.unwrap();
        AllocationLedger::list(&ledger, &Digest::sha256(content.as_bytes())).await.unwrap();
    }
    AllocationLedger::list(&ledger, &Digest::sha256(b"never written")).await.unwrap();

    assert_eq!(ledger.lock_count(), 0);
}

#[tokio::test]
async fn test_fs_ledger_skips_unterminated_tail() {
    let dir = tempdir().unwrap();
    let ledger: FsAllocationLedger = fs_ledger(&dir).await;
    let record = allocation(b"torn", "alice", 10);
    AllocationLedger::put(&ledger, record.clone()).await.unwrap();

    // interrupted append: half a record, no newline
    let path = crate::shard::shard_path(ledger.root(), &record.blob.digest, Some("jsonl"));
    let mut content = tokio::fs::read(&path).await.unwrap();
    content.extend_from_slice(br#"{"space":"did:web:al"#);
    tokio::fs::write(&path, &content).await.unwrap();

    let listed = AllocationLedger::list(&ledger, &record.blob.digest).await.unwrap();
    assert_eq!(listed, vec![record.clone()]);

    let next = allocation(b"torn", "bob", 20);
    AllocationLedger::put(&ledger, next.clone()).await.unwrap();
    let listed = AllocationLedger::list(&ledger, &record.blob.digest).await.unwrap();
    assert_eq!(listed, vec![record, next]);
}

#[tokio::test]
async fn test_fs_ledger_short_hash() {
    let dir = tempdir().unwrap();
    let ledger: FsAllocationLedger = fs_ledger(&dir).await;
    let digest = Digest::from_bytes(&[0x12, 0x00]).unwrap();
    assert!(AllocationLedger::list(&ledger, &digest).await.unwrap().is_empty());
}
