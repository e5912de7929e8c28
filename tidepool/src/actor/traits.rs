//! Actor trait definitions.
//!
//! This module defines the trait every actor contract implements: lifecycle
//! hooks plus a single method dispatch entry point.

use async_trait::async_trait;
use serde_json::Value;

use crate::actor::{ActorContext, ActorReference, DeactivationReason, StateMap};
use crate::error::ActorError;

/// Behavior of one actor contract.
///
/// An implementation is created by its [`ActorFactory`](crate::actor::ActorFactory)
/// the first time a reference of its type is resolved, and lives until the
/// instance is deactivated. The runtime never runs two methods of the same
/// instance at once, so `&mut self` is all the synchronization a contract needs.
///
/// # Lifecycle
///
/// ```text
/// [Unactivated] → on_activate → [Active] → handle* → on_deactivate → [Deactivated]
/// ```
///
/// # Example
///
/// ```rust,ignore
/// use tidepool::prelude::*;
///
/// struct Counter;
///
/// #[async_trait]
/// impl Actor for Counter {
///     async fn on_activate(
///         &mut self,
///         _reference: &ActorReference,
///         state: &mut StateMap,
///     ) -> Result<(), ActorError> {
///         state.set("count", 0);
///         Ok(())
///     }
///
///     async fn handle(
///         &mut self,
///         ctx: &mut ActorContext<'_>,
///         method: &str,
///         _args: Vec<Value>,
///     ) -> Result<Value, ActorError> {
///         match method {
///             "Increment" => {
///                 let count = ctx.state().get_as::<i64>("count").unwrap_or(0) + 1;
///                 ctx.state_mut().set("count", count);
///                 Ok(json!(count))
///             }
///             _ => Err(ctx.unknown_method()),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Actor: Send + 'static {
    /// Called once, before the first call is admitted.
    ///
    /// # Error Handling
    ///
    /// If this method returns an error the instance goes straight to
    /// `Deactivated`, the resolver receives `ActorError::ActivationFailed`
    /// and the next resolve of the same reference tries again with a fresh
    /// instance.
    async fn on_activate(
        &mut self,
        _reference: &ActorReference,
        _state: &mut StateMap,
    ) -> Result<(), ActorError> {
        Ok(())
    }

    /// Called once after the last turn, when the instance leaves the directory.
    ///
    /// Errors are logged; deactivation completes regardless.
    async fn on_deactivate(
        &mut self,
        _reason: DeactivationReason,
        _state: &mut StateMap,
    ) -> Result<(), ActorError> {
        Ok(())
    }

    /// Run one turn: execute `method` with `args`.
    ///
    /// Unknown methods should return [`ActorContext::unknown_method`].
    async fn handle(
        &mut self,
        ctx: &mut ActorContext<'_>,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ActorError>;
}
