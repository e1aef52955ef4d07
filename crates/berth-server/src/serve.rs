//! Server loop.

use axum::Router;
use berth_core::error::{BerthError, BerthResult};
use std::future::Future;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Serve `router` on `listener` until `shutdown` resolves, then drain in-flight requests
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> BerthResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        info!(address = %address, "listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| BerthError::io("HTTP server failed", e))?;

    info!("server stopped");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            },
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
