//! Actor runtime: activation, turn serialization and deactivation.

pub mod actor_runtime;
pub mod builder;
pub mod config;
pub mod instance;
pub mod registry;

pub use actor_runtime::ActorRuntime;
pub use builder::ActorRuntimeBuilder;
pub use config::{DeactivationPolicy, RuntimeConfig, RuntimeConfigBuilder};
pub use instance::{ActivationId, ActorInstance};
pub use registry::ActorRegistry;
