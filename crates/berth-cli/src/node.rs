//! Node composition: stores, service and identity from resolved settings.

use anyhow::{Context, Result};
use berth_config::{AppConfig, StoreConfig};
use berth_service::BlobService;
use berth_store::{
    AcceptanceLedger, AllocationLedger, FsAcceptanceLedger, FsAllocationLedger, FsPayloadStore,
    MemoryAcceptanceLedger, MemoryAllocationLedger, MemoryPayloadStore, PayloadStore,
};
use berth_ucan::Signer;
use std::sync::Arc;
use tracing::info;

/// The three collaborators of the admission service
pub struct Stores {
    pub blobs: Arc<dyn PayloadStore>,
    pub allocations: Arc<dyn AllocationLedger>,
    pub acceptances: Arc<dyn AcceptanceLedger>,
}

/// Open the stores the configuration asks for
pub async fn open_stores(store: &StoreConfig) -> Result<Stores> {
    match store {
        StoreConfig::Memory => {
            info!("using in-memory stores; nothing survives a restart");
            Ok(Stores {
                blobs: Arc::new(MemoryPayloadStore::new()),
                allocations: Arc::new(MemoryAllocationLedger::new()),
                acceptances: Arc::new(MemoryAcceptanceLedger::new()),
            })
        },
        StoreConfig::Filesystem {
            data_dir,
            blobs_dir,
            blobs_tmp_dir,
            allocations_dir,
            acceptances_dir,
            ..
        } => {
            info!(data_dir = %data_dir, "opening filesystem stores");
            let blobs = FsPayloadStore::open(blobs_dir, blobs_tmp_dir)
                .await
                .with_context(|| format!("opening blob store at {}", blobs_dir))?;
            let allocations = FsAllocationLedger::open(allocations_dir)
                .await
                .with_context(|| format!("opening allocation ledger at {}", allocations_dir))?;
            let acceptances = FsAcceptanceLedger::open(acceptances_dir)
                .await
                .with_context(|| format!("opening acceptance ledger at {}", acceptances_dir))?;
            Ok(Stores {
                blobs: Arc::new(blobs),
                allocations: Arc::new(allocations),
                acceptances: Arc::new(acceptances),
            })
        },
    }
}

/// Assemble the admission service for this node
pub async fn compose(config: &AppConfig) -> Result<BlobService> {
    let key_file = &config.identity.key_file;
    let signer = Signer::load(key_file)
        .with_context(|| format!("loading node identity from {}", key_file))?;
    let stores = open_stores(&config.store).await?;

    Ok(BlobService::new(
        signer,
        config.server.public_url.clone(),
        stores.blobs,
        stores.allocations,
        stores.acceptances,
    ))
}
