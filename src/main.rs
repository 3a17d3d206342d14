//! Application entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use time_is_money::api::create_router;
use time_is_money::app::AppState;
use time_is_money::config::Config;
use time_is_money::infra::{MonzoClient, SqliteConfig, SqliteTokenStore};

/// How long in-flight requests get to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("time-is-money v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Invalid configuration")?;

    info!("Initializing infrastructure...");
    let token_store = Arc::new(
        SqliteTokenStore::open(&config.data_dir, SqliteConfig::default())
            .await
            .context("Failed to open token store")?,
    );
    token_store
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    let banking =
        Arc::new(MonzoClient::new(config.monzo_config()).context("Failed to build Monzo client")?);

    let state = Arc::new(AppState::new(
        Arc::clone(&token_store) as _,
        banking as _,
        config.income,
        config.feed_settings(),
        config.webhook_url(),
    ));

    let app = create_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(address = %addr, webhook_url = %config.webhook_url(), "Server listening");
    info!("Visit {}/login to connect an account", config.public_base_url);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result.context("Server task panicked")??;
        }
        _ = shutdown_signal() => {
            info!("Shutting down, draining requests...");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
                Ok(result) => result.context("Server task panicked")??,
                Err(_) => {
                    warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Requests still running; forcing shutdown");
                    server.abort();
                }
            }
        }
    }

    token_store.close().await;
    info!("Server shutdown complete");
    Ok(())
}
