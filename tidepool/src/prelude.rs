//! Common imports for the tidepool actor host.
//!
//! This module provides a convenient prelude for importing commonly used types and traits.

pub use crate::actor::{
    ActivationState, Actor, ActorContext, ActorFactory, ActorIdentity, ActorReference, ActorType,
    DeactivationReason, StateMap,
};
pub use crate::contracts::{self, CallJournal, Test2Ref, TestRef, TEST, TEST2};
pub use crate::error::{ActorError, HostError, RuntimeError};
pub use crate::host::{HostState, ListenerEndpoint, ListenerHost, RestartOutcome, RestartPolicy};
pub use crate::messaging::{Call, CallChain, Dispatcher, Invoker};
pub use crate::runtime::{ActorRuntime, ActorRuntimeBuilder, DeactivationPolicy, RuntimeConfig};

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use serde_json::{json, Value};
pub use std::sync::Arc;
pub use std::time::Duration;

/// Result type for actor calls.
pub type Result<T> = std::result::Result<T, ActorError>;
