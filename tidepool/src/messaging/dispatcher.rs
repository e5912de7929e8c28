//! Dispatcher: caller-side resolution and call delivery.
//!
//! Every call, external or actor-originated, goes through the same path.
//!
//! # Flow
//!
//! 1. Refuse the call if the target already holds a turn in the caller's chain
//! 2. Resolve the target through the address directory (activating if needed)
//! 3. Submit the call to the instance's turn queue
//! 4. Await the reply, bounded by the configured call timeout

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::actor::ActorReference;
use crate::directory::AddressDirectory;
use crate::error::ActorError;
use crate::messaging::{Call, CallChain};

type Reply = oneshot::Receiver<Result<Value, ActorError>>;

/// Routes calls to actor instances.
///
/// Cheap to clone; all clones share one directory.
#[derive(Clone)]
pub struct Dispatcher {
    directory: Arc<AddressDirectory>,
}

impl Dispatcher {
    pub(crate) fn new(directory: Arc<AddressDirectory>) -> Self {
        Self { directory }
    }

    /// Directory this dispatcher resolves through.
    pub fn directory(&self) -> &Arc<AddressDirectory> {
        &self.directory
    }

    /// Invoker for callers outside any actor.
    pub fn external(&self) -> Invoker {
        Invoker {
            dispatcher: self.clone(),
            caller: None,
            chain: CallChain::root(),
        }
    }

    /// Invoker for calls made from a turn running on `reference`.
    pub(crate) fn for_turn(&self, reference: &ActorReference, chain: &CallChain) -> Invoker {
        Invoker {
            dispatcher: self.clone(),
            caller: Some(reference.clone()),
            chain: chain.extended(reference),
        }
    }

    /// Deliver `call` as the root of a new call chain and await its result.
    pub async fn invoke(&self, call: Call) -> Result<Value, ActorError> {
        self.invoke_in_chain(call, CallChain::root()).await
    }

    /// Deliver `call` on behalf of the turns held in `chain`.
    ///
    /// # Errors
    ///
    /// - `ReentrancyDetected` if the target holds a turn in `chain`
    /// - `UnknownReference` if no contract is registered for the target type
    /// - `ActivationFailed` / `ActorDeactivated` from resolution and admission
    /// - `Timeout` if no reply arrived within the call timeout
    /// - any fault raised by the method body, unchanged
    pub async fn invoke_in_chain(&self, call: Call, chain: CallChain) -> Result<Value, ActorError> {
        if chain.contains(&call.target) {
            warn!(
                target_actor = %call.target,
                method = %call.method,
                depth = chain.depth(),
                "reentrant call refused"
            );
            return Err(ActorError::ReentrancyDetected {
                reference: call.target,
                chain: chain.into_frames(),
            });
        }

        let reference = call.target.clone();
        let method = call.method.clone();
        let timeout = self.directory.call_timeout();

        let delivery = async {
            let reply = self.deliver(call, chain).await?;
            // A dropped reply means the instance went away with the call still queued.
            reply
                .await
                .unwrap_or_else(|_| Err(ActorError::deactivated(&reference)))
        };

        // The caller stops waiting on timeout; the turn itself keeps running.
        let outcome = tokio::time::timeout(timeout, delivery).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(timed_out(reference, method, timeout)),
        }
    }

    /// Fire-and-forget delivery of `call` on a fresh call chain.
    ///
    /// Faults are logged, never returned.
    pub fn post(&self, call: Call) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let reference = call.target.clone();
            let method = call.method.clone();
            if let Err(error) = dispatcher.invoke(call).await {
                warn!(target_actor = %reference, %method, %error, "one-way call failed");
            }
        });
    }

    async fn deliver(&self, call: Call, chain: CallChain) -> Result<Reply, ActorError> {
        let instance = self.directory.resolve(&call.target).await?;
        match instance.submit(call.clone(), chain.clone()) {
            Ok(reply) => Ok(reply),
            Err(_) => {
                // Lost a race with deactivation; a deactivated slot is replaced on resolve.
                debug!(target_actor = %call.target, "instance left Active before admission, re-resolving");
                let instance = self.directory.resolve(&call.target).await?;
                instance.submit(call, chain)
            }
        }
    }
}

fn timed_out(reference: ActorReference, method: String, timeout: std::time::Duration) -> ActorError {
    warn!(target_actor = %reference, %method, timeout_ms = timeout.as_millis() as u64, "call timed out");
    ActorError::Timeout {
        reference,
        method,
        millis: timeout.as_millis() as u64,
    }
}

/// A dispatcher bound to a call origin.
///
/// Calls made through an invoker carry its caller and call chain, so
/// reentrancy is detected no matter how deeply calls nest.
#[derive(Clone)]
pub struct Invoker {
    dispatcher: Dispatcher,
    caller: Option<ActorReference>,
    chain: CallChain,
}

impl Invoker {
    /// Actor on whose behalf calls are made, `None` for external callers.
    pub fn caller(&self) -> Option<&ActorReference> {
        self.caller.as_ref()
    }

    /// Turns held by the frames above calls made through this invoker.
    pub fn chain(&self) -> &CallChain {
        &self.chain
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Call `target.method(args)` and await the result.
    pub async fn call(
        &self,
        target: &ActorReference,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ActorError> {
        let call = self.build(target, method, args);
        self.dispatcher
            .invoke_in_chain(call, self.chain.clone())
            .await
    }

    /// Post `target.method(args)` without waiting for it.
    pub fn post(&self, target: &ActorReference, method: &str, args: Vec<Value>) {
        self.dispatcher.post(self.build(target, method, args));
    }

    fn build(&self, target: &ActorReference, method: &str, args: Vec<Value>) -> Call {
        Call {
            caller: self.caller.clone(),
            target: target.clone(),
            method: method.to_string(),
            args,
        }
    }
}
