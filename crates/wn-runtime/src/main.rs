//! # websocket-notify
//!
//! Tag-based publish/subscribe relay.
//!
//! ## Startup Sequence
//!
//! 1. Parse flags (environment variables fill unset flags)
//! 2. Load the YAML file and apply overrides
//! 3. Install logging
//! 4. Load TLS certificates and bind the API and WebSocket listeners
//! 5. Serve until Ctrl-C or SIGTERM

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use wn_02_api_gateway::GatewayService;
use wn_runtime::{telemetry, Args, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(&args).context("failed to load configuration")?;
    telemetry::init_logging(settings.debug, settings.log_json)
        .context("failed to initialize logging")?;

    match &settings.source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!(path = %args.config.display(), "No configuration file, using defaults"),
    }
    info!(
        api_auth = !settings.gateway.api_secret.is_empty(),
        subscription_auth = !settings.gateway.websocket_secret.is_empty(),
        "Authorization"
    );

    let service = GatewayService::new(settings.gateway).context("invalid gateway configuration")?;
    let gateway = service.bind().await.context("failed to bind listeners")?;
    info!(
        api_tls = gateway.api_tls(),
        ws_tls = gateway.ws_tls(),
        "Listeners bound"
    );

    info!("websocket-notify is running. Press Ctrl+C to stop.");
    gateway
        .serve(shutdown_signal())
        .await
        .context("gateway failed")?;

    info!("websocket-notify stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
