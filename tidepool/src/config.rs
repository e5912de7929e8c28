//! Process configuration.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::host::{ListenerEndpoint, RestartPolicy};
use crate::runtime::{DeactivationPolicy, RuntimeConfig};

/// Host configuration (env-driven).
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint the HTTP listener binds.
    pub endpoint: ListenerEndpoint,

    /// Listener restart policy.
    pub restart: RestartPolicy,

    /// Actor runtime settings.
    pub runtime: RuntimeConfig,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let name = lookup("TIDEPOOL_ENDPOINT_NAME").unwrap_or_else(|| "http".to_string());

        let addr: SocketAddr = lookup("TIDEPOOL_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("TIDEPOOL_LISTEN_ADDR must be a socket address (example: 0.0.0.0:8080).")?;

        let restart_delay_ms: u64 = lookup("TIDEPOOL_RESTART_DELAY_MS")
            .map(|v| v.parse())
            .transpose()
            .context("TIDEPOOL_RESTART_DELAY_MS must be an integer (milliseconds).")?
            .unwrap_or(2000);

        let arm_on_request = lookup("TIDEPOOL_RESTART_ON_REQUEST")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let idle_timeout_secs: Option<u64> = lookup("TIDEPOOL_IDLE_TIMEOUT_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("TIDEPOOL_IDLE_TIMEOUT_SECS must be an integer (seconds).")?;
        let deactivation_policy = match idle_timeout_secs {
            Some(secs) if secs > 0 => DeactivationPolicy::AfterIdle(Duration::from_secs(secs)),
            _ => DeactivationPolicy::Never,
        };

        let call_timeout_ms: u64 = lookup("TIDEPOOL_CALL_TIMEOUT_MS")
            .map(|v| v.parse())
            .transpose()
            .context("TIDEPOOL_CALL_TIMEOUT_MS must be an integer (milliseconds).")?
            .unwrap_or(30_000);

        let log_level = lookup("TIDEPOOL_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            endpoint: ListenerEndpoint::new(name, addr),
            restart: RestartPolicy::default()
                .with_delay(Duration::from_millis(restart_delay_ms))
                .with_arm_on_request(arm_on_request),
            runtime: RuntimeConfig::builder()
                .deactivation_policy(deactivation_policy)
                .call_timeout(Duration::from_millis(call_timeout_ms.max(1)))
                .build(),
            log_level,
        })
    }
}
