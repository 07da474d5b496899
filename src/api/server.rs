use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{any, get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, decompression::RequestDecompressionLayer, trace::TraceLayer,
};
use tracing::{error, info};

use super::{services, state::AppState};
use crate::config::Config;
use crate::ledger::{FjallStore, Ledger};
use crate::notify::{build_http_client, select_channel};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Full HTTP surface with its middleware
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/webhooks",
            post(services::create_webhook).get(services::list_webhooks),
        )
        .route("/webhooks/{id}", get(services::get_webhook))
        .route("/hooks/{id}", any(services::capture_webhook))
        .route("/health", get(services::health))
        .route("/public-url", get(services::public_url))
        .route(
            "/notification-config",
            get(services::get_notification_config).post(services::save_notification_config),
        )
        .route(
            "/notification-config/test",
            post(services::test_notification_config),
        )
        .route(
            "/threads",
            post(services::create_thread).get(services::list_threads),
        )
        .route(
            "/threads/{id}",
            get(services::get_thread).delete(services::delete_thread),
        )
        .route("/threads/{id}/replies", post(services::add_reply))
        .route(
            "/alerts",
            get(services::list_alerts).post(services::create_alert),
        )
        .route("/deliveries", get(services::list_deliveries))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                // Senders may gzip their payloads; handlers always see plain bytes
                .layer(RequestDecompressionLayer::new()),
        )
}

pub async fn run(address: Option<SocketAddr>, config_path: Option<PathBuf>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let mut config =
        Config::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(address) = address {
        config.server.bind_addr = address;
    }
    let address = config.server.bind_addr;

    info!(path = %config.server.fjall_path.display(), "Opening Fjall store");
    let store = FjallStore::open(&config.server.fjall_path)
        .map_err(|e| format!("Failed to open Fjall store: {e}"))?;

    let http = build_http_client(&config.notifier)?;
    let channel = select_channel(&config.notifier, http.clone())?;
    if let Some(saved) = store.notification_config()? {
        info!(channel = ?saved.channel, "Applying saved notification config");
        channel.apply_config(&saved);
    }

    let ledger: Arc<dyn Ledger> = Arc::new(store.clone());
    let state = AppState::new(config, ledger, channel, http);

    let bootstrap = state.registry.create_endpoint(&state.local_url()).await;
    info!(webhook_id = %bootstrap.id, url = %bootstrap.url, "Startup webhook ready");

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "hookrelay listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.persist()?;
    let stats = store.stats()?;
    info!(
        deliveries = stats.delivery_count,
        alerts = stats.alert_count,
        threads = stats.thread_count,
        "Ledger flushed"
    );

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
