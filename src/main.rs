use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use calesync::{
    app::{build_app, serve},
    config::AppConfig,
    db::Database,
    state::AppState,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "calesync exiting");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "calesync=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::from_env().context("load configuration")?);

    // The listener only comes up once the database answered.
    let database = Database::connect(&config.database)
        .await
        .context("connect to MongoDB")?;

    let state = AppState::new(config.clone(), Arc::new(database.users()));
    let app = build_app(state);

    let addr = config.listen_addr();
    let served = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => serve(listener, app, shutdown_signal()).await,
        Err(e) => Err(anyhow::Error::new(e).context(format!("bind {addr}"))),
    };

    let closed = database
        .close(config.database.shutdown_timeout)
        .await
        .context("Error closing MongoDB connection");
    served?;
    closed
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("received shutdown signal");
}
