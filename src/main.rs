use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use ara_chat_service::chat::ChatService;
use ara_chat_service::config::Settings;
use ara_chat_service::hub::Hub;
use ara_chat_service::server::{create_app, AppState};
use ara_chat_service::store::create_message_store;
use ara_chat_service::tasks::ExpirySweeper;
use ara_chat_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing; the guard flushes spans on exit
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Message store and chat service
    let store = create_message_store(&settings).await?;
    let chat = Arc::new(ChatService::new(store, settings.chat.message_lifetime())?);
    tracing::info!(backend = chat.store_backend(), "Message store initialized");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start the hub
    let (hub, hub_handle) = Hub::new(&settings.websocket, shutdown_tx.subscribe())?;
    let hub_task = tokio::spawn(hub.run());

    // Start the expiry sweeper
    let sweeper = ExpirySweeper::new(
        chat.clone(),
        settings.chat.sweep_interval(),
        shutdown_tx.subscribe(),
    )?;
    let sweeper_task = tokio::spawn(sweeper.run());

    let addr = settings.server_addr();
    let state = AppState::new(settings, chat, hub_handle);
    let app = create_app(state);

    // Start server
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = tokio::join!(hub_task, sweeper_task);

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the hub (which closes every session queue) and the sweeper
    let _ = shutdown_tx.send(());
}
