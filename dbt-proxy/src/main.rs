//! dbt-proxy - authenticated relay in front of the dbt Cloud API.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;

use dbt_proxy::{build_router, logging, AppState, Config};

const VERSION: &str = env!("CARGO_PKG_VERSION");

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("dbt-proxy {}", VERSION);
        return Ok(());
    }

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Make sure DBT_ACCOUNT_ID and DBT_API_KEY are set.",
            e
        )
    })?;

    logging::init(&config.log_level);

    tracing::info!(
        "Starting dbt-proxy {} for account {} ({})",
        VERSION,
        config.dbt.account_id,
        config.dbt.base_url
    );
    if config.proxy_secret.is_none() {
        tracing::warn!("PROXY_SECRET is not set; all authenticated endpoints will return 401");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config)?);
    let app = build_router(state);

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
