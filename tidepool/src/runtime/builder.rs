//! Actor runtime builder for configuration.

use tracing::warn;

use crate::actor::{ActorFactory, ActorType};
use crate::error::RuntimeError;
use crate::runtime::{ActorRegistry, ActorRuntime, RuntimeConfig};

/// Builder for ActorRuntime with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = ActorRuntime::builder()
///     .config(RuntimeConfig::default())
///     .register(TEST, |_: &ActorReference| Box::new(TestActor::default()) as Box<dyn Actor>)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct ActorRuntimeBuilder {
    registry: ActorRegistry,
    config: RuntimeConfig,
}

impl ActorRuntimeBuilder {
    /// Create a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for `actor_type`. A later registration replaces
    /// an earlier one.
    pub fn register(mut self, actor_type: ActorType, factory: impl ActorFactory) -> Self {
        if self.registry.contains(&actor_type) {
            warn!(%actor_type, "replacing registered actor factory");
        }
        self.registry.register(actor_type, factory);
        self
    }

    /// Set the runtime configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build and start the runtime.
    ///
    /// Must be called from within a tokio runtime when idle deactivation is
    /// enabled (the collector task is spawned here).
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if no actor type is registered or the
    /// configuration fails validation.
    pub fn build(self) -> Result<ActorRuntime, RuntimeError> {
        if self.registry.is_empty() {
            return Err(RuntimeError::InvalidConfiguration(
                "at least one actor type must be registered".to_string(),
            ));
        }
        self.config.validate()?;

        Ok(ActorRuntime::start(self.registry, self.config))
    }
}
