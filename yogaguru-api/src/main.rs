//! # Yoga Guru API Server
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/yogaguru JWT_SECRET=$(openssl rand -hex 32) \
//!     cargo run -p yogaguru-api
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yogaguru_api::{
    app::{build_router, AppState},
    bootstrap,
    config::Config,
};
use yogaguru_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // LOG_FORMAT=json switches to one JSON object per line
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "yogaguru_api=debug,yogaguru_shared=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Yoga Guru API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(
        DatabaseConfig::new(config.database.url.clone())
            .with_max_connections(config.database.max_connections),
    )
    .await?;

    run_migrations(&pool).await?;

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap::ensure_admin(&pool, admin).await?;
    }

    let address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
