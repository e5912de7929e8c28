//! Runtime configuration for [`ActorRuntime`](super::ActorRuntime).

use std::time::Duration;

use crate::error::RuntimeError;

/// Default time a caller waits for a reply.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default period of the idle collector.
pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(1);

/// When idle actors are deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeactivationPolicy {
    /// Actors stay active until explicitly deactivated or the runtime stops.
    #[default]
    Never,

    /// Deactivate actors that ran no turn for the given duration.
    AfterIdle(Duration),
}

impl DeactivationPolicy {
    /// Idle timeout, if any.
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self {
            DeactivationPolicy::Never => None,
            DeactivationPolicy::AfterIdle(timeout) => Some(*timeout),
        }
    }
}

/// Runtime-level settings.
///
/// # Example
///
/// ```rust,ignore
/// let config = RuntimeConfig::builder()
///     .deactivation_policy(DeactivationPolicy::AfterIdle(Duration::from_secs(600)))
///     .call_timeout(Duration::from_secs(5))
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    deactivation_policy: DeactivationPolicy,
    collection_interval: Duration,
    call_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            deactivation_policy: DeactivationPolicy::Never,
            collection_interval: DEFAULT_COLLECTION_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl RuntimeConfig {
    /// Start building a runtime configuration.
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Idle deactivation policy.
    pub fn deactivation_policy(&self) -> DeactivationPolicy {
        self.deactivation_policy
    }

    /// How often the idle collector scans.
    pub fn collection_interval(&self) -> Duration {
        self.collection_interval
    }

    /// How long callers wait for a reply.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Reject zero durations.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.call_timeout.is_zero() {
            return Err(RuntimeError::InvalidConfiguration(
                "call_timeout must be greater than zero".to_string(),
            ));
        }
        if self.collection_interval.is_zero() {
            return Err(RuntimeError::InvalidConfiguration(
                "collection_interval must be greater than zero".to_string(),
            ));
        }
        if self.deactivation_policy.idle_timeout() == Some(Duration::ZERO) {
            return Err(RuntimeError::InvalidConfiguration(
                "idle timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`RuntimeConfig`].
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder {
    deactivation_policy: Option<DeactivationPolicy>,
    collection_interval: Option<Duration>,
    call_timeout: Option<Duration>,
}

impl RuntimeConfigBuilder {
    /// Set the idle deactivation policy.
    pub fn deactivation_policy(mut self, policy: DeactivationPolicy) -> Self {
        self.deactivation_policy = Some(policy);
        self
    }

    /// Set how often the idle collector scans.
    pub fn collection_interval(mut self, interval: Duration) -> Self {
        self.collection_interval = Some(interval);
        self
    }

    /// Set how long callers wait for a reply.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Build the runtime configuration (infallible; validated by the runtime builder).
    pub fn build(self) -> RuntimeConfig {
        let defaults = RuntimeConfig::default();
        RuntimeConfig {
            deactivation_policy: self
                .deactivation_policy
                .unwrap_or(defaults.deactivation_policy),
            collection_interval: self
                .collection_interval
                .unwrap_or(defaults.collection_interval),
            call_timeout: self.call_timeout.unwrap_or(defaults.call_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.deactivation_policy(), DeactivationPolicy::Never);
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::builder()
            .deactivation_policy(DeactivationPolicy::AfterIdle(Duration::from_secs(60)))
            .call_timeout(Duration::from_millis(500))
            .build();

        assert_eq!(
            config.deactivation_policy().idle_timeout(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(config.call_timeout(), Duration::from_millis(500));
        assert_eq!(config.collection_interval(), DEFAULT_COLLECTION_INTERVAL);
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        let config = RuntimeConfig::builder().call_timeout(Duration::ZERO).build();
        assert!(matches!(
            config.validate(),
            Err(RuntimeError::InvalidConfiguration(_))
        ));

        let config = RuntimeConfig::builder()
            .deactivation_policy(DeactivationPolicy::AfterIdle(Duration::ZERO))
            .build();
        assert!(config.validate().is_err());
    }
}
