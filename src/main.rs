use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::Server;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use notes_api::{
    config::Config, db, middleware::LoginLimiter, route::create_router, AppState,
};

const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

// Entry point of the application
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("notes_api=info,tower_http=info")),
        )
        .init();

    let config = Config::load().context("failed to load configuration")?;

    let pool = db::connect(&config.database_url, config.database_max_connections)
        .await
        .with_context(|| format!("failed to connect to {}", config.database_url))?;
    db::migrate(&pool)
        .await
        .context("failed to create the notes schema")?;

    let login_limiter = LoginLimiter::new(&config.login_limit);
    login_limiter.spawn_pruning(LIMITER_PRUNE_INTERVAL);
    info!(
        max_requests = config.login_limit.max_requests,
        window_secs = config.login_limit.window.as_secs(),
        "Login rate limiter configured"
    );

    // Login routes belong to the authentication service; this binary only
    // serves notes.
    let app = create_router(
        AppState::sqlite(pool, login_limiter),
        &config.cors_origins,
        None,
    );

    let addr = config.socket_addr()?;
    info!("Server listening on {addr}");

    Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!("Failed to install signal handler: {err}");
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
}
