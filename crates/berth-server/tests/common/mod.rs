//! Shared fixtures for HTTP tests

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use berth_core::{Blob, Did, Link};
use berth_server::routes::ucan::DAG_CBOR_CONTENT_TYPE;
use berth_server::{router, AppState, ResponseContainer};
use berth_service::BlobService;
use berth_store::{MemoryAcceptanceLedger, MemoryAllocationLedger, PayloadStore};
use berth_ucan::capabilities::{AcceptArgs, AllocateArgs, AwaitOk, BlobAccept, BlobAllocate};
use berth_ucan::{Capability, Invocation, InvocationPayload, Receipt, Signer};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

pub const PUBLIC_URL: &str = "http://localhost:3000";

pub struct TestNode {
    pub router: Router,
    pub node: Did,
    pub allocations: Arc<MemoryAllocationLedger>,
    pub acceptances: Arc<MemoryAcceptanceLedger>,
}

pub fn node(blobs: Arc<dyn PayloadStore>) -> TestNode {
    let signer = Signer::generate().unwrap();
    let node = signer.did().clone();
    let allocations = Arc::new(MemoryAllocationLedger::new());
    let acceptances = Arc::new(MemoryAcceptanceLedger::new());
    let service = BlobService::new(
        signer,
        Url::parse(PUBLIC_URL).unwrap(),
        blobs,
        allocations.clone(),
        acceptances.clone(),
    );
    TestNode {
        router: router(AppState::new(service)),
        node,
        allocations,
        acceptances,
    }
}

/// Agent acting on its own space, so no proofs are needed
pub fn agent() -> Signer {
    Signer::generate().unwrap()
}

pub fn invocation<A: Serialize>(agent: &Signer, command: &str, args: &A) -> Invocation {
    let payload = InvocationPayload::new(agent.did(), agent.did(), command, args).unwrap();
    Invocation::seal(agent, payload).unwrap()
}

pub fn allocate_invocation(agent: &Signer, blob: &Blob) -> Invocation {
    let args = AllocateArgs {
        blob: blob.clone(),
        cause: Link::of_dag_cbor(&[0x81, 0x01]),
        space: agent.did().clone(),
    };
    invocation(agent, BlobAllocate::COMMAND, &args)
}

pub fn accept_invocation(agent: &Signer, blob: &Blob) -> Invocation {
    let args = AcceptArgs {
        put: AwaitOk::new(Link::of_dag_cbor(&[0x81, 0x02])),
        blob: blob.clone(),
        space: agent.did().clone(),
    };
    invocation(agent, BlobAccept::COMMAND, &args)
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

/// POST an invocation and decode the receipt plus any returned blocks
pub async fn invoke(router: &Router, invocation: &Invocation) -> (Receipt, Vec<Vec<u8>>) {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(CONTENT_TYPE, DAG_CBOR_CONTENT_TYPE)
        .body(Body::from(invocation.as_bytes().to_vec()))
        .unwrap();
    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);

    let container: ResponseContainer = berth_ucan::codec::from_slice(&body).unwrap();
    let receipt = Receipt::decode(&container.receipt).unwrap();
    let blocks = container.blocks.into_iter().map(|b| b.into_vec()).collect();
    (receipt, blocks)
}

pub fn put_request(digest: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/blob/{}", digest))
        .header(CONTENT_LENGTH, content.len())
        .body(Body::from(content.to_vec()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
