//! Contract `Test`: starts a `Test2` peer and receives its callback.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::actor::{Actor, ActorContext, ActorReference, ActorType, StateMap};
use crate::contracts::{CallJournal, Test2Ref, TEST2};
use crate::error::ActorError;
use crate::messaging::{reference_arg, Invoker};

/// Actor type of the `Test` contract.
pub const TEST: ActorType = ActorType::from_static("Test");

/// `Test` method names.
pub mod methods {
    /// No-op acknowledgement.
    pub const CALL_ME: &str = "CallMe";
    /// Closes the callback loop; takes the calling `Test2` reference.
    pub const CALL_ME_BACK: &str = "CallMeBack";
    /// Addresses a fresh `Test2` and hands it this actor's reference.
    pub const START: &str = "Start";
}

/// State key holding the `Test2` this actor started.
pub const PEER: &str = "peer";
/// State key holding the `Test2` that last called back.
pub const LAST_CALLBACK: &str = "last_callback";

/// Implementation of the `Test` contract.
#[derive(Debug, Default)]
pub struct TestActor {
    journal: Option<CallJournal>,
}

impl TestActor {
    /// Create an actor recording its calls into `journal`.
    pub fn with_journal(journal: CallJournal) -> Self {
        Self { journal: Some(journal) }
    }
}

#[async_trait]
impl Actor for TestActor {
    async fn on_activate(
        &mut self,
        reference: &ActorReference,
        state: &mut StateMap,
    ) -> Result<(), ActorError> {
        state.set(super::COUNT, 0);
        info!(%reference, "Test activated");
        Ok(())
    }

    async fn handle(
        &mut self,
        ctx: &mut ActorContext<'_>,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ActorError> {
        if let Some(journal) = &self.journal {
            journal.record(ctx.reference(), method, ctx.caller());
        }

        match method {
            methods::CALL_ME => {
                info!(reference = %ctx.reference(), "CallMe");
                Ok(Value::Null)
            }
            methods::CALL_ME_BACK => {
                let peer = reference_arg(method, &args, 0)?;
                info!(reference = %ctx.reference(), %peer, "CallMeBack");
                ctx.state_mut().set(LAST_CALLBACK, peer);
                Ok(Value::Null)
            }
            methods::START => {
                let peer = ActorReference::random(TEST2);
                info!(reference = %ctx.reference(), %peer, "Start");
                ctx.state_mut().set(PEER, peer.clone());
                Test2Ref::new(peer, ctx.invoker())
                    .call_me1(ctx.reference())
                    .await?;
                Ok(Value::Null)
            }
            _ => Err(ctx.unknown_method()),
        }
    }
}

/// Typed proxy for a `Test` actor.
#[derive(Clone)]
pub struct TestRef {
    reference: ActorReference,
    invoker: Invoker,
}

impl TestRef {
    /// Proxy for `reference`, calling through `invoker`.
    pub fn new(reference: ActorReference, invoker: Invoker) -> Self {
        Self { reference, invoker }
    }

    /// Address of the proxied actor.
    pub fn reference(&self) -> &ActorReference {
        &self.reference
    }

    /// `CallMe()`
    pub async fn call_me(&self) -> Result<(), ActorError> {
        self.invoker
            .call(&self.reference, methods::CALL_ME, Vec::new())
            .await
            .map(drop)
    }

    /// `CallMeBack(peer)`
    pub async fn call_me_back(&self, peer: &ActorReference) -> Result<(), ActorError> {
        self.invoker
            .call(&self.reference, methods::CALL_ME_BACK, vec![peer.to_value()])
            .await
            .map(drop)
    }

    /// `CallMeBack(peer)` as a one-way call.
    pub fn post_call_me_back(&self, peer: &ActorReference) {
        self.invoker
            .post(&self.reference, methods::CALL_ME_BACK, vec![peer.to_value()]);
    }

    /// `Start()`
    pub async fn start(&self) -> Result<(), ActorError> {
        self.invoker
            .call(&self.reference, methods::START, Vec::new())
            .await
            .map(drop)
    }
}
