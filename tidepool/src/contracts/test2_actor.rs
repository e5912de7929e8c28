//! Contract `Test2`: called by a `Test` and calls it back.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::actor::{Actor, ActorContext, ActorReference, ActorType, StateMap};
use crate::contracts::{CallJournal, TestRef, TEST};
use crate::error::ActorError;
use crate::messaging::{reference_arg, Invoker};

/// Actor type of the `Test2` contract.
pub const TEST2: ActorType = ActorType::from_static("Test2");

/// `Test2` method names.
pub mod methods {
    /// Stores the calling `Test` and calls it back.
    pub const CALL_ME1: &str = "CallMe1";
    /// No-op acknowledgement.
    pub const CALL_ME2: &str = "CallMe2";
    /// Addresses a fresh `Test` and calls `CallMe` on it.
    pub const START: &str = "Start";
}

/// State key holding the `Test` this actor was handed.
pub const PEER: &str = "peer";

/// Implementation of the `Test2` contract.
#[derive(Debug, Default)]
pub struct Test2Actor {
    journal: Option<CallJournal>,
}

impl Test2Actor {
    /// Create an actor recording its calls into `journal`.
    pub fn with_journal(journal: CallJournal) -> Self {
        Self { journal: Some(journal) }
    }
}

#[async_trait]
impl Actor for Test2Actor {
    async fn on_activate(
        &mut self,
        reference: &ActorReference,
        state: &mut StateMap,
    ) -> Result<(), ActorError> {
        state.set(super::COUNT, 0);
        info!(%reference, "Test2 activated");
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
            methods::CALL_ME1 => {
                let peer = reference_arg(method, &args, 0)?;
                info!(reference = %ctx.reference(), %peer, "CallMe1");
                ctx.state_mut().set(PEER, peer.clone());

                // One-way: the peer's Start turn is held until this turn returns.
                TestRef::new(peer, ctx.invoker()).post_call_me_back(ctx.reference());
                Ok(Value::Null)
            }
            methods::CALL_ME2 => {
                info!(reference = %ctx.reference(), "CallMe2");
                Ok(Value::Null)
            }
            methods::START => {
                let peer = ActorReference::random(TEST);
                info!(reference = %ctx.reference(), %peer, "Start");
                TestRef::new(peer, ctx.invoker()).call_me().await?;
                Ok(Value::Null)
            }
            _ => Err(ctx.unknown_method()),
        }
    }
}

/// Typed proxy for a `Test2` actor.
#[derive(Clone)]
pub struct Test2Ref {
    reference: ActorReference,
    invoker: Invoker,
}

impl Test2Ref {
    /// Proxy for `reference`, calling through `invoker`.
    pub fn new(reference: ActorReference, invoker: Invoker) -> Self {
        Self { reference, invoker }
    }

    /// Address of the proxied actor.
    pub fn reference(&self) -> &ActorReference {
        &self.reference
    }

    /// `CallMe1(peer)`
    pub async fn call_me1(&self, peer: &ActorReference) -> Result<(), ActorError> {
        self.invoker
            .call(&self.reference, methods::CALL_ME1, vec![peer.to_value()])
            .await
            .map(drop)
    }

    /// `CallMe2()`
    pub async fn call_me2(&self) -> Result<(), ActorError> {
        self.invoker
            .call(&self.reference, methods::CALL_ME2, Vec::new())
            .await
            .map(drop)
    }

    /// `Start()`
    pub async fn start(&self) -> Result<(), ActorError> {
        self.invoker
            .call(&self.reference, methods::START, Vec::new())
            .await
            .map(drop)
    }
}
