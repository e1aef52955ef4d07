//! HTTP route handlers.

pub mod blob;
pub mod root;
pub mod ucan;

use berth_core::RequestContext;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Context for one request, cancelled when the returned guard is dropped.
///
/// Axum drops the handler future when the client goes away, which drops the
/// guard and aborts any collaborator call still in flight.
pub(crate) fn request_context() -> (RequestContext, DropGuard) {
    let token = CancellationToken::new();
    let ctx = RequestContext::with_cancellation(token.clone());
    (ctx, token.drop_guard())
}
