use crate::config::Config;
use crate::labels::LabelTable;
use crate::model::OrtModelHandle;
use crate::predictor::Predictor;
use crate::server::HttpServer;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let labels = LabelTable::gardiner();

    // Startup is fatal on any load error: the listener below is never
    // bound with a half-initialized model handle.
    let model = match OrtModelHandle::new(&config.model, labels.count()) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            tracing::error!("Failed to initialize model handle: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let predictor = Arc::new(Predictor::new(model, labels));

    let server = HttpServer::new(predictor, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
