//! Capability binding layer.
//!
//! Maps command names to handlers. A handler binds the invocation
//! arguments to their typed form, enforces the capability policy, calls the
//! admission service and shapes its result for the receipt.

use berth_core::error::{BerthError, BerthResult};
use berth_core::RequestContext;
use berth_service::BlobService;
use berth_ucan::capabilities::{AcceptOk, AllocateOk, BlobAccept, BlobAddress, BlobAllocate};
use berth_ucan::{codec, Capability, Invocation};
use ipld_core::ipld::Ipld;
use std::collections::HashMap;
use tracing::debug;

/// Largest upload the allocate handler admits
pub const MAX_UPLOAD_SIZE: u64 = 127 * (1 << 25);

/// A registered capability handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Allocate,
    Accept,
}

/// Successful handler result
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    /// Receipt `ok` value
    pub out: Ipld,
    /// Extra blocks returned alongside the receipt
    pub blocks: Vec<Vec<u8>>,
}

impl Handler {
    pub async fn execute(
        &self,
        service: &BlobService,
        ctx: &RequestContext,
        invocation: &Invocation,
    ) -> BerthResult<Executed> {
        match self {
            Handler::Allocate => allocate(service, ctx, invocation).await,
            Handler::Accept => accept(service, ctx, invocation).await,
        }
    }
}

async fn allocate(
    service: &BlobService,
    ctx: &RequestContext,
    invocation: &Invocation,
) -> BerthResult<Executed> {
    let args = BlobAllocate::bind(invocation.payload())?;
    debug!(space = %args.space, blob = %args.blob.digest, size = args.blob.size, "bound allocate args");

    if args.blob.size > MAX_UPLOAD_SIZE {
        return Err(BerthError::PolicyViolation {
            capability: BlobAllocate::COMMAND.to_string(),
            reason: format!(
                "blob size {} exceeds maximum upload size of {} bytes",
                args.blob.size, MAX_UPLOAD_SIZE
            ),
        });
    }

    let allocated = service
        .allocate(ctx, &args.space, &args.blob, &args.cause)
        .await?;

    let ok = AllocateOk {
        size: allocated.size,
        address: allocated.address.map(BlobAddress::try_from).transpose()?,
    };
    Ok(Executed {
        out: codec::to_ipld(&ok)?,
        blocks: Vec::new(),
    })
}

async fn accept(
    service: &BlobService,
    ctx: &RequestContext,
    invocation: &Invocation,
) -> BerthResult<Executed> {
    let args = BlobAccept::bind(invocation.payload())?;
    debug!(space = %args.space, blob = %args.blob.digest, "bound accept args");

    let commitment = service
        .accept(ctx, &args.space, &args.blob, invocation.link())
        .await?;

    let ok = AcceptOk {
        site: commitment.link().clone(),
    };
    Ok(Executed {
        out: codec::to_ipld(&ok)?,
        blocks: vec![commitment.as_bytes().to_vec()],
    })
}

/// Command name to handler table
#[derive(Debug, Clone)]
pub struct Registry {
    handlers: HashMap<&'static str, Handler>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry with the blob admission handlers
    pub fn new() -> Self {
        let mut handlers = HashMap::new();
        handlers.insert(BlobAllocate::COMMAND, Handler::Allocate);
        handlers.insert(BlobAccept::COMMAND, Handler::Accept);
        Self { handlers }
    }

    /// Look up the handler for a command
    pub fn get(&self, command: &str) -> BerthResult<Handler> {
        self.handlers
            .get(command)
            .copied()
            .ok_or_else(|| BerthError::HandlerNotFound {
                command: command.to_string(),
            })
    }

    /// Registered command names, sorted
    pub fn commands(&self) -> Vec<&'static str> {
        let mut commands: Vec<_> = self.handlers.keys().copied().collect();
        commands.sort_unstable();
        commands
    }
}
