//! Unit tests for the admission service

use super::*;
use async_trait::async_trait;
use berth_store::{MemoryAcceptanceLedger, MemoryAllocationLedger, MemoryPayloadStore};
use std::error::Error as _;
use std::io::Cursor;
use std::time::Duration;

const PUBLIC_URL: &str = "http://localhost:3000";

struct Harness {
    service: Arc<BlobService>,
    blobs: Arc<MemoryPayloadStore>,
    allocations: Arc<MemoryAllocationLedger>,
    acceptances: Arc<MemoryAcceptanceLedger>,
}

fn harness() -> Harness {
    harness_with(Arc::new(MemoryAllocationLedger::new()), None)
}

fn harness_with(
    allocations: Arc<MemoryAllocationLedger>,
    ledger: Option<Arc<dyn AllocationLedger>>,
) -> Harness {
    let blobs = Arc::new(MemoryPayloadStore::new());
    let acceptances = Arc::new(MemoryAcceptanceLedger::new());
    let ledger = ledger.unwrap_or_else(|| allocations.clone() as Arc<dyn AllocationLedger>);
    let service = BlobService::new(
        Signer::generate().unwrap(),
        Url::parse(PUBLIC_URL).unwrap(),
        blobs.clone(),
        ledger,
        acceptances.clone(),
    );
    Harness {
        service: Arc::new(service),
        blobs,
        allocations,
        acceptances,
    }
}

fn space(name: &str) -> Did {
    Did::parse(&format!("did:key:z6Mk{}", name)).unwrap()
}

fn cause(n: u8) -> Link {
    Link::of_dag_cbor(&[0x81, n])
}

fn body(bytes: &[u8]) -> PayloadReader {
    Box::pin(Cursor::new(bytes.to_vec()))
}

async fn upload(h: &Harness, content: &[u8]) {
    let blob = Blob::from_content(content);
    h.service
        .receive(&RequestContext::new(), &blob.digest, blob.size, body(content))
        .await
        .unwrap();
}

/// Allocation ledger that takes a while to answer
struct SlowLedger {
    inner: Arc<MemoryAllocationLedger>,
    delay: Duration,
}

#[async_trait]
impl AllocationLedger for SlowLedger {
    async fn list(&self, digest: &Digest) -> berth_store::StoreResult<Vec<Allocation>> {
        tokio::time::sleep(self.delay).await;
        AllocationLedger::list(self.inner.as_ref(), digest).await
    }

    async fn put(&self, allocation: Allocation) -> berth_store::StoreResult<()> {
        AllocationLedger::put(self.inner.as_ref(), allocation).await
    }
}

/// Allocation ledger whose backing storage is gone
struct BrokenLedger;

#[async_trait]
impl AllocationLedger for BrokenLedger {
    async fn list(&self, _digest: &Digest) -> berth_store::StoreResult<Vec<Allocation>> {
        Err(BerthError::io(
            "Failed to read ledger",
            std::io::Error::new(std::io::ErrorKind::Other, "disk unplugged"),
        ))
    }

    async fn put(&self, _allocation: Allocation) -> berth_store::StoreResult<()> {
        Err(BerthError::io(
            "Failed to append ledger entry",
            std::io::Error::new(std::io::ErrorKind::Other, "disk unplugged"),
        ))
    }
}

#[tokio::test]
async fn test_blob_url() {
    let h = harness();
    let digest = Digest::sha256(b"x");
    let url = h.service.blob_url(&digest).unwrap();
    assert_eq!(url.as_str(), format!("{}/blob/{}", PUBLIC_URL, digest));
}

#[tokio::test]
async fn test_allocate_upload_accept_scenario() {
    let h = harness();
    let ctx = RequestContext::new();
    let content = vec![7u8; 12345];
    let blob = Blob::from_content(&content);
    let (s1, s2) = (space("One"), space("Two"));
    let before = now_unix();

    let first = h.service.allocate(&ctx, &s1, &blob, &cause(1)).await.unwrap();
    assert_eq!(first.size, 12345);
    let address = first.address.clone().unwrap();
    assert_eq!(address.url, h.service.blob_url(&blob.digest).unwrap());
    assert!(address.headers.is_empty());
    assert!(address.expires >= before + ALLOCATION_TTL_SECS);
    assert!(address.expires <= now_unix() + ALLOCATION_TTL_SECS);

    // same space again before upload: not charged, still told where to upload
    let second = h.service.allocate(&ctx, &s1, &blob, &cause(2)).await.unwrap();
    assert_eq!(second.size, 0);
    assert_eq!(second.address.unwrap().url, address.url);
    assert_eq!(h.allocations.records(&blob.digest).len(), 2);

    upload(&h, &content).await;

    // another space after upload: charged, nothing to upload
    let third = h.service.allocate(&ctx, &s2, &blob, &cause(3)).await.unwrap();
    assert_eq!(third.size, 12345);
    assert!(third.address.is_none());
    assert_eq!(h.allocations.records(&blob.digest).len(), 3);

    let commitment = h.service.accept(&ctx, &s1, &blob, &cause(4)).await.unwrap();
    commitment.verify().unwrap();
    assert_eq!(&commitment.payload().iss, h.service.signer().did());
    assert_eq!(commitment.payload().aud, s1);

    let fresh = Blob::from_content(b"never uploaded");
    let err = h.service.accept(&ctx, &s1, &fresh, &cause(5)).await.unwrap_err();
    assert!(matches!(err, BerthError::BlobNotFound { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_repeat_after_receipt_writes_nothing() {
    let h = harness();
    let ctx = RequestContext::new();
    let blob = Blob::from_content(b"hello");

    h.service.allocate(&ctx, &space("A"), &blob, &cause(1)).await.unwrap();
    upload(&h, b"hello").await;

    let again = h.service.allocate(&ctx, &space("A"), &blob, &cause(2)).await.unwrap();
    assert_eq!(again, Allocated { size: 0, address: None });
    assert_eq!(h.allocations.records(&blob.digest).len(), 1);
}

#[tokio::test]
async fn test_payload_store_not_consulted_without_allocations() {
    let h = harness();
    let ctx = RequestContext::new();
    let blob = Blob::from_content(b"orphan");

    // bytes present but never allocated by anyone
    h.blobs.put(&blob.digest, blob.size, body(b"orphan")).await.unwrap();

    let allocated = h.service.allocate(&ctx, &space("A"), &blob, &cause(1)).await.unwrap();
    assert_eq!(allocated.size, blob.size);
    assert!(allocated.address.is_some());
}

#[tokio::test]
async fn test_accept_commitment_policy() {
    let h = harness();
    let ctx = RequestContext::new();
    let content = b"custody proof";
    let blob = Blob::from_content(content);
    let s = space("A");

    h.service.allocate(&ctx, &s, &blob, &cause(1)).await.unwrap();
    upload(&h, content).await;

    let commitment = h.service.accept(&ctx, &s, &blob, &cause(2)).await.unwrap();
    let url = h.service.blob_url(&blob.digest).unwrap();
    assert_eq!(
        commitment.payload().pol,
        berth_ucan::commitment::location_policy(&s, &blob.digest, &url, blob.size)
    );
    assert_eq!(commitment.payload().exp, None);

    let recorded = AcceptanceLedger::list(h.acceptances.as_ref(), &blob.digest).await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].space, s);
    assert_eq!(recorded[0].cause, cause(2));

    // accepts are not deduplicated
    let again = h.service.accept(&ctx, &s, &blob, &cause(3)).await.unwrap();
    assert_ne!(again.link(), commitment.link());
    let recorded = AcceptanceLedger::list(h.acceptances.as_ref(), &blob.digest).await.unwrap();
    assert_eq!(recorded.len(), 2);
}

#[tokio::test]
async fn test_write_authorization() {
    let h = harness();
    let ctx = RequestContext::new();
    let blob = Blob::from_content(b"guarded");

    let err = h.service.authorize_write(&ctx, &blob.digest).await.unwrap_err();
    assert!(matches!(err, BerthError::MissingAllocation { .. }));

    let stale = Allocation {
        space: space("A"),
        blob: blob.clone(),
        expires: now_unix() - 1,
        cause: cause(1),
    };
    h.allocations.append(stale.clone());
    let err = h.service.authorize_write(&ctx, &blob.digest).await.unwrap_err();
    assert!(matches!(err, BerthError::AllocationExpired { .. }));

    let err = h
        .service
        .receive(&ctx, &blob.digest, blob.size, body(b"guarded"))
        .await
        .unwrap_err();
    assert!(matches!(err, BerthError::AllocationExpired { .. }));
    assert!(!h.blobs.contains(&blob.digest));

    // any live allocation, from any space, opens the door
    h.allocations.append(Allocation {
        space: space("B"),
        expires: now_unix() + 60,
        ..stale
    });
    h.service.authorize_write(&ctx, &blob.digest).await.unwrap();
    h.service
        .receive(&ctx, &blob.digest, blob.size, body(b"guarded"))
        .await
        .unwrap();
    assert!(h.blobs.contains(&blob.digest));
}

#[tokio::test]
async fn test_receive_rejects_mismatched_bytes() {
    let h = harness();
    let ctx = RequestContext::new();
    let blob = Blob::from_content(b"the real bytes");
    h.service.allocate(&ctx, &space("A"), &blob, &cause(1)).await.unwrap();

    let err = h
        .service
        .receive(&ctx, &blob.digest, blob.size, body(b"some fake byte"))
        .await
        .unwrap_err();
    assert!(matches!(err, BerthError::DataInconsistent { .. }), "{:?}", err);
    assert!(!h.blobs.contains(&blob.digest));

    // still not received, so the next allocation hands out an address again
    let again = h.service.allocate(&ctx, &space("A"), &blob, &cause(2)).await.unwrap();
    assert!(again.address.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocations_charge_once() {
    let allocations = Arc::new(MemoryAllocationLedger::new());
    let slow: Arc<dyn AllocationLedger> = Arc::new(SlowLedger {
        inner: allocations.clone(),
        delay: Duration::from_millis(5),
    });
    let h = harness_with(allocations, Some(slow));
    let blob = Blob::from_content(b"contended");

    let tasks: Vec<_> = (0..8u8)
        .map(|i| {
            let service = h.service.clone();
            let blob = blob.clone();
            tokio::spawn(async move {
                service
                    .allocate(&RequestContext::new(), &space("A"), &blob, &cause(i))
                    .await
            })
        })
        .collect();

    let results: Vec<Allocated> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let charged = results.iter().filter(|r| r.size == blob.size).count();
    assert_eq!(charged, 1);
    assert!(results.iter().all(|r| r.address.is_some()));
    assert_eq!(h.allocations.records(&blob.digest).len(), 8);
    assert!(h.service.locks.is_empty());
}

#[tokio::test]
async fn test_collaborator_failure_is_wrapped() {
    let ledger: Arc<dyn AllocationLedger> = Arc::new(BrokenLedger);
    let h = harness_with(Arc::new(MemoryAllocationLedger::new()), Some(ledger));
    let ctx = RequestContext::new();
    let blob = Blob::from_content(b"anything");

    let err = h.service.allocate(&ctx, &space("A"), &blob, &cause(1)).await.unwrap_err();
    match &err {
        BerthError::Collaborator {
            component,
            operation,
            digest,
            ..
        } => {
            assert_eq!(*component, "allocation ledger");
            assert_eq!(*operation, "list");
            assert_eq!(digest, &blob.digest.to_string());
        },
        other => panic!("expected collaborator error, got {:?}", other),
    }
    assert!(err.is_recoverable());
    let cause = err.source().unwrap();
    assert!(cause.to_string().contains("Failed to read ledger"));

    let err = h.service.authorize_write(&ctx, &blob.digest).await.unwrap_err();
    assert!(matches!(err, BerthError::Collaborator { .. }));
}

#[tokio::test]
async fn test_cancelled_context() {
    let h = harness();
    let ctx = RequestContext::new();
    ctx.cancel();
    let blob = Blob::from_content(b"never");

    let err = h.service.allocate(&ctx, &space("A"), &blob, &cause(1)).await.unwrap_err();
    assert!(matches!(err, BerthError::Cancelled { .. }), "{:?}", err);
    assert!(h.allocations.records(&blob.digest).is_empty());
    assert!(h.service.locks.is_empty());

    let err = h.service.accept(&ctx, &space("A"), &blob, &cause(2)).await.unwrap_err();
    assert!(matches!(err, BerthError::Cancelled { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_cancellation_aborts_slow_collaborator() {
    let allocations = Arc::new(MemoryAllocationLedger::new());
    let slow: Arc<dyn AllocationLedger> = Arc::new(SlowLedger {
        inner: allocations.clone(),
        delay: Duration::from_secs(30),
    });
    let h = harness_with(allocations, Some(slow));
    let blob = Blob::from_content(b"slow");

    let ctx = RequestContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = h.service.allocate(&ctx, &space("A"), &blob, &cause(1)).await.unwrap_err();
    match err {
        BerthError::Cancelled { operation } => assert_eq!(operation, "list allocations"),
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert!(h.allocations.records(&blob.digest).is_empty());
}

#[tokio::test]
async fn test_filesystem_backed_flow() {
    use berth_store::{FsAcceptanceLedger, FsAllocationLedger, FsPayloadStore};
    use camino::Utf8PathBuf;

    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let blobs = Arc::new(FsPayloadStore::open(root.join("blobs"), root.join("tmp")).await.unwrap());
    let allocations = Arc::new(FsAllocationLedger::open(root.join("allocation")).await.unwrap());
    let acceptances = Arc::new(FsAcceptanceLedger::open(root.join("acceptance")).await.unwrap());

    let service = BlobService::new(
        Signer::generate().unwrap(),
        Url::parse("https://node.example/base/").unwrap(),
        blobs.clone(),
        allocations,
        acceptances,
    );
    let ctx = RequestContext::new();
    let content = b"durable bytes";
    let blob = Blob::from_content(content);

    let allocated = service.allocate(&ctx, &space("A"), &blob, &cause(1)).await.unwrap();
    assert_eq!(
        allocated.address.unwrap().url.as_str(),
        format!("https://node.example/base/blob/{}", blob.digest)
    );

    service
        .receive(&ctx, &blob.digest, blob.size, body(content))
        .await
        .unwrap();
    assert!(blobs.file_path(&blob.digest).unwrap().exists());

    service.accept(&ctx, &space("A"), &blob, &cause(2)).await.unwrap();
    let repeat = service.allocate(&ctx, &space("A"), &blob, &cause(3)).await.unwrap();
    assert_eq!(repeat, Allocated { size: 0, address: None });
}
