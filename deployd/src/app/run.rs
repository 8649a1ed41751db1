//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::deploy::classifier::FailureClassifier;
use crate::deploy::log_sink::TracingLogSink;
use crate::deploy::service::DeploymentService;
use crate::errors::DeployError;
use crate::repository::InMemoryJobRepository;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the deployment job server until `shutdown_signal` resolves.
///
/// Jobs still running at shutdown are detached tasks and are not awaited.
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeployError> {
    info!("Initializing deployment job runner...");

    let service = DeploymentService::new(
        Arc::new(InMemoryJobRepository::new()),
        Arc::new(TracingLogSink),
        FailureClassifier::new(&options.failure_phrases),
    );

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    let server_handle = serve(
        &options.server,
        Arc::new(ServerState::new(service)),
        async move {
            let _ = shutdown_rx.recv().await;
        },
    )
    .await?;

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(options.max_shutdown_delay, server_handle).await {
        Ok(joined) => {
            joined.map_err(|e| DeployError::ShutdownError(e.to_string()))??;
            info!("Shutdown complete");
            Ok(())
        }
        Err(_) => {
            error!(
                "Shutdown timed out after {:?}, forcing shutdown...",
                options.max_shutdown_delay
            );
            Err(DeployError::ShutdownError(
                "timed out waiting for the HTTP server".to_string(),
            ))
        }
    }
}
