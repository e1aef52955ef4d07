//! Per-request context.
//!
//! Every admission operation receives a `RequestContext`. Collaborator calls
//! are driven through [`RequestContext::run`], which aborts them as soon as
//! the request is cancelled and reports a `Cancelled` error instead of
//! partial state.

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{BerthError, BerthResult};

/// Cancellation-aware context threaded through service calls
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context that is never cancelled unless asked to
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context bound to an existing cancellation token
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Derive a child context, cancelled together with this one
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
        }
    }

    /// Cancel this context and all of its children
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context has already been cancelled
    pub fn check(&self, operation: &str) -> BerthResult<()> {
        if self.is_cancelled() {
            return Err(BerthError::Cancelled {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Run a collaborator call, abandoning it if the context is cancelled first
    pub async fn run<F, T>(&self, operation: &str, fut: F) -> BerthResult<T>
    where
        F: Future<Output = BerthResult<T>>,
    {
        self.check(operation)?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BerthError::Cancelled {
                operation: operation.to_string(),
            }),
            result = fut => result,
        }
    }
}
