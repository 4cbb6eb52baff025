use anyhow::{Context, Result};
use chrono::FixedOffset;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use motor_current_service::{
    api::{self, AppState},
    config::Config,
    readings::ReadingLog,
    recorder::Recorder,
    trend::TrendRenderer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; variables may come from the environment
    let _ = dotenvy::dotenv();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env()?;

    let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600)
        .context("UTC_OFFSET_HOURS is out of range")?;
    let log = ReadingLog::new(config.readings_csv_path.clone());
    info!(
        path = %log.path().display(),
        warning_threshold_amps = config.warning_threshold_amps,
        "Reading log ready"
    );

    let state = AppState {
        recorder: Recorder::new(log, offset, config.warning_threshold_amps),
        max_current_amps: config.max_current_amps,
        renderer: TrendRenderer::new(config.chart_width, config.chart_height),
    };

    // Start HTTP server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
