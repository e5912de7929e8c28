//! Per-turn execution context.
//!
//! An `ActorContext` exists only for the duration of one turn. It gives the
//! method body its own address, its state map and an [`Invoker`] whose calls
//! carry this actor in their call chain.

use serde_json::Value;

use crate::actor::{ActorReference, StateMap};
use crate::error::ActorError;
use crate::messaging::Invoker;
use crate::runtime::ActivationId;

/// Execution environment of the turn currently running on an instance.
///
/// # Calls from a turn
///
/// - [`call`](Self::call) awaits the result while this actor's turn stays
///   held. Calling back into any actor already holding a turn in the same
///   chain (including this one) fails with `ReentrancyDetected`.
/// - [`post`](Self::post) is one-way: the call runs on a fresh chain after
///   this turn is free to finish, and its outcome is only logged.
pub struct ActorContext<'a> {
    reference: &'a ActorReference,
    activation_id: ActivationId,
    ticket: u64,
    caller: Option<&'a ActorReference>,
    method: &'a str,
    state: &'a mut StateMap,
    invoker: Invoker,
}

impl<'a> ActorContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        reference: &'a ActorReference,
        activation_id: ActivationId,
        ticket: u64,
        caller: Option<&'a ActorReference>,
        method: &'a str,
        state: &'a mut StateMap,
        invoker: Invoker,
    ) -> Self {
        Self {
            reference,
            activation_id,
            ticket,
            caller,
            method,
            state,
            invoker,
        }
    }

    /// Address of the actor running this turn.
    pub fn reference(&self) -> &ActorReference {
        self.reference
    }

    /// Activation that is running this turn.
    pub fn activation_id(&self) -> ActivationId {
        self.activation_id
    }

    /// Admission ticket of this turn. Tickets increase in arrival order.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Actor that issued the call, `None` for external callers.
    pub fn caller(&self) -> Option<&ActorReference> {
        self.caller
    }

    /// Method being executed.
    pub fn method(&self) -> &str {
        self.method
    }

    /// The instance's state map.
    pub fn state(&self) -> &StateMap {
        &*self.state
    }

    /// Mutable access to the instance's state map.
    pub fn state_mut(&mut self) -> &mut StateMap {
        &mut *self.state
    }

    /// Invoker for calls made on behalf of this turn.
    pub fn invoker(&self) -> Invoker {
        self.invoker.clone()
    }

    /// Synchronous nested call: await `target.method(args)` inside this turn.
    pub async fn call(
        &self,
        target: &ActorReference,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ActorError> {
        self.invoker.call(target, method, args).await
    }

    /// One-way call: `target.method(args)` runs independently of this turn.
    pub fn post(&self, target: &ActorReference, method: &str, args: Vec<Value>) {
        self.invoker.post(target, method, args);
    }

    /// Application error carrying `payload`.
    pub fn fail(&self, payload: impl Into<Value>) -> ActorError {
        ActorError::InvocationFailed {
            reference: self.reference.clone(),
            method: self.method.to_string(),
            payload: payload.into(),
        }
    }

    /// Fault for a method this contract does not implement.
    pub fn unknown_method(&self) -> ActorError {
        ActorError::UnknownMethod {
            actor_type: self.reference.actor_type.clone(),
            method: self.method.to_string(),
        }
    }
}
