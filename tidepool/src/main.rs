//! tidepool host
//!
//! Serves the `/activity-actor` HTTP surface backed by the `Test` / `Test2`
//! actor contracts, on a listener that can drain and rebind in place.

use anyhow::{Context, Result};
use tidepool::config::Config;
use tidepool::contracts;
use tidepool::host::ListenerHost;
use tidepool::runtime::ActorRuntime;
use tidepool::web;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to TIDEPOOL_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting tidepool");
    info!(endpoint = %config.endpoint, restart_delay_ms = config.restart.delay.as_millis() as u64, "Configuration loaded");

    let runtime = contracts::register(ActorRuntime::builder(), None)
        .config(config.runtime.clone())
        .build()
        .context("failed to build actor runtime")?;

    let host = ListenerHost::bind(config.endpoint.clone(), web::router(runtime.clone()), config.restart)
        .await
        .context("failed to bind listener")?;
    info!(addr = %host.local_addr(), "Listening");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
        outcome = host.wait() => {
            if let Err(e) = outcome {
                error!(error = %e, "Listener host failed");
                runtime.shutdown().await;
                return Err(e.into());
            }
        }
    }

    if let Err(e) = host.shutdown().await {
        error!(error = %e, "Listener shutdown failed");
    }
    runtime.shutdown().await;

    info!("tidepool stopped");
    Ok(())
}
