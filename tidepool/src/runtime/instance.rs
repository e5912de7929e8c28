//! Live actor instances and their turn loops.
//!
//! Each activation owns one unbounded mailbox drained by one task. Admission
//! (state check, ticket stamp, enqueue) happens under a single lock, so the
//! order tickets are issued is the order turns run.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::actor::{
    ActivationState, Actor, ActorContext, ActorReference, DeactivationReason, StateMap,
};
use crate::directory::AddressDirectory;
use crate::error::ActorError;
use crate::messaging::{Call, CallChain, Dispatcher};

/// Identifies one activation of a reference. A reactivated actor gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivationId(u64);

impl ActivationId {
    /// Wrap a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "act-{:016x}", self.0)
    }
}

type ReplySender = oneshot::Sender<Result<Value, ActorError>>;

enum Envelope {
    Turn {
        call: Call,
        chain: CallChain,
        ticket: u64,
        reply: ReplySender,
    },
    Deactivate {
        reason: DeactivationReason,
        done: oneshot::Sender<()>,
    },
}

struct Admission {
    state: ActivationState,
    next_ticket: u64,
    mailbox: Option<mpsc::UnboundedSender<Envelope>>,
}

/// One activation of an actor reference.
///
/// # Invariants
///
/// - At most one turn runs at a time (one turn loop per instance)
/// - Turns run in ticket order
/// - Calls are admitted only while `Active`
pub struct ActorInstance {
    reference: ActorReference,
    activation_id: ActivationId,
    admission: Mutex<Admission>,
    published: RwLock<StateMap>,
    activated_at: Instant,
    last_turn: Mutex<Instant>,
    in_flight: AtomicUsize,
    turns: AtomicU64,
}

impl ActorInstance {
    /// Run the activation hook and start the turn loop.
    ///
    /// On failure the instance is left `Deactivated` and dropped; nothing is
    /// admitted and the caller gets `ActivationFailed`.
    pub(crate) async fn activate(
        reference: ActorReference,
        activation_id: ActivationId,
        mut actor: Box<dyn Actor>,
        directory: Weak<AddressDirectory>,
    ) -> Result<Arc<Self>, ActorError> {
        let (sender, mailbox) = mpsc::unbounded_channel();
        let now = Instant::now();
        let instance = Arc::new(Self {
            reference,
            activation_id,
            admission: Mutex::new(Admission {
                state: ActivationState::Unactivated,
                next_ticket: 0,
                mailbox: Some(sender),
            }),
            published: RwLock::new(StateMap::new()),
            activated_at: now,
            last_turn: Mutex::new(now),
            in_flight: AtomicUsize::new(0),
            turns: AtomicU64::new(0),
        });
        instance.transition(ActivationState::Activating);

        let mut state = StateMap::new();
        if let Err(error) = actor.on_activate(&instance.reference, &mut state).await {
            instance.admission.lock().mailbox = None;
            instance.transition(ActivationState::Deactivated);
            warn!(reference = %instance.reference, activation = %activation_id, %error, "activation failed");
            return Err(match error {
                failed @ ActorError::ActivationFailed { .. } => failed,
                other => ActorError::ActivationFailed {
                    reference: instance.reference.clone(),
                    reason: other.to_string(),
                },
            });
        }

        state.take_dirty();
        *instance.published.write() = state.clone();

        let span = info_span!("actor", reference = %instance.reference, activation = %activation_id);
        let turn_loop = TurnLoop {
            reference: instance.reference.clone(),
            activation_id,
            instance: Arc::downgrade(&instance),
            directory,
            actor,
            state,
        };
        tokio::spawn(turn_loop.run(mailbox).instrument(span));

        instance.transition(ActivationState::Active);
        info!(reference = %instance.reference, activation = %activation_id, "actor activated");
        Ok(instance)
    }

    /// Address of this instance.
    pub fn reference(&self) -> &ActorReference {
        &self.reference
    }

    /// Activation id of this instance.
    pub fn activation_id(&self) -> ActivationId {
        self.activation_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActivationState {
        self.admission.lock().state
    }

    /// State map as of the end of the last turn that changed it.
    pub fn snapshot(&self) -> StateMap {
        self.published.read().clone()
    }

    /// Calls admitted and not yet answered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Turns executed by this activation.
    pub fn turns_completed(&self) -> u64 {
        self.turns.load(Ordering::Acquire)
    }

    /// Time since the activation hook completed.
    pub fn age(&self) -> Duration {
        self.activated_at.elapsed()
    }


    /// Admit `call`: stamp the next ticket and enqueue it.
    pub(crate) fn submit(
        &self,
        call: Call,
        chain: CallChain,
    ) -> Result<oneshot::Receiver<Result<Value, ActorError>>, ActorError> {
        let mut admission = self.admission.lock();
        if !admission.state.accepts_calls() {
            return Err(ActorError::deactivated(&self.reference));
        }
        let Some(mailbox) = admission.mailbox.as_ref() else {
            return Err(ActorError::deactivated(&self.reference));
        };

        let ticket = admission.next_ticket;
        let (reply, receiver) = oneshot::channel();
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if mailbox
            .send(Envelope::Turn {
                call,
                chain,
                ticket,
                reply,
            })
            .is_err()
        {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(ActorError::deactivated(&self.reference));
        }
        admission.next_ticket += 1;
        Ok(receiver)
    }

    /// Move to `Deactivating` and ask the turn loop to stop.
    ///
    /// Returns `None` if the instance is not `Active`. The receiver fires once
    /// `on_deactivate` has run and the directory slot is gone.
    pub(crate) fn deactivate(&self, reason: DeactivationReason) -> Option<oneshot::Receiver<()>> {
        let mut admission = self.admission.lock();
        Self::begin_deactivation(&mut admission, reason)
    }

    /// Deactivate for idleness if nothing is admitted and no turn ran within
    /// `idle_timeout`.
    ///
    /// The check and the transition share the admission lock, so a call
    /// admitted concurrently either keeps the instance alive or is refused
    /// with `ActorDeactivated` before it is queued.
    pub(crate) fn deactivate_if_idle(&self, idle_timeout: Duration) -> Option<oneshot::Receiver<()>> {
        let mut admission = self.admission.lock();
        if !admission.state.accepts_calls()
            || self.in_flight() > 0
            || self.last_turn.lock().elapsed() < idle_timeout
        {
            return None;
        }
        Self::begin_deactivation(&mut admission, DeactivationReason::IdleTimeout)
    }

    fn begin_deactivation(
        admission: &mut Admission,
        reason: DeactivationReason,
    ) -> Option<oneshot::Receiver<()>> {
        if !admission.state.can_transition_to(ActivationState::Deactivating) {
            return None;
        }
        admission.state = ActivationState::Deactivating;

        // Dropping the sender closes the mailbox behind the Deactivate envelope.
        let mailbox = admission.mailbox.take()?;
        let (done, finished) = oneshot::channel();
        mailbox
            .send(Envelope::Deactivate { reason, done })
            .ok()
            .map(|_| finished)
    }

    fn transition(&self, next: ActivationState) -> bool {
        let mut admission = self.admission.lock();
        if !admission.state.can_transition_to(next) {
            debug!(
                reference = %self.reference,
                from = %admission.state,
                to = %next,
                "ignored invalid state transition"
            );
            return false;
        }
        admission.state = next;
        true
    }

    fn publish(&self, state: &StateMap) {
        *self.published.write() = state.clone();
    }

    fn release(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn record_turn(&self) {
        *self.last_turn.lock() = Instant::now();
        self.turns.fetch_add(1, Ordering::AcqRel);
        self.release();
    }
}

impl fmt::Debug for ActorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorInstance")
            .field("reference", &self.reference)
            .field("activation_id", &self.activation_id)
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// The task side of an instance. Holds the actor and its state map.
///
/// Only weak handles point back at the instance and directory, so dropping
/// the runtime closes the mailbox and ends the loop.
struct TurnLoop {
    reference: ActorReference,
    activation_id: ActivationId,
    instance: Weak<ActorInstance>,
    directory: Weak<AddressDirectory>,
    actor: Box<dyn Actor>,
    state: StateMap,
}

impl TurnLoop {
    async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<Envelope>) {
        debug!("turn loop started");

        let (reason, done) = loop {
            match mailbox.recv().await {
                Some(Envelope::Turn {
                    call,
                    chain,
                    ticket,
                    reply,
                }) => self.turn(call, chain, ticket, reply).await,
                Some(Envelope::Deactivate { reason, done }) => break (reason, Some(done)),
                None => break (DeactivationReason::RuntimeShutdown, None),
            }
        };

        if let Err(error) = self.actor.on_deactivate(reason, &mut self.state).await {
            warn!(%error, ?reason, "on_deactivate failed");
        }

        let mut turns = 0;
        let mut age = Duration::ZERO;
        if let Some(instance) = self.instance.upgrade() {
            if self.state.take_dirty() {
                instance.publish(&self.state);
            }
            instance.transition(ActivationState::Deactivated);
            turns = instance.turns_completed();
            age = instance.age();
        }
        if let Some(directory) = self.directory.upgrade() {
            directory.remove(&self.reference, self.activation_id);
        }

        info!(
            reference = %self.reference,
            activation = %self.activation_id,
            ?reason,
            turns,
            age_ms = age.as_millis() as u64,
            "actor deactivated"
        );
        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    async fn turn(&mut self, call: Call, chain: CallChain, ticket: u64, reply: ReplySender) {
        let Some(instance) = self.instance.upgrade() else {
            let _ = reply.send(Err(ActorError::deactivated(&self.reference)));
            return;
        };

        // Calls still queued when deactivation started are refused.
        let directory = match self.directory.upgrade() {
            Some(directory) if instance.state().accepts_calls() => directory,
            _ => {
                instance.release();
                let _ = reply.send(Err(ActorError::deactivated(&self.reference)));
                return;
            }
        };

        let invoker = Dispatcher::new(directory).for_turn(&self.reference, &chain);
        let Call {
            caller,
            method,
            args,
            ..
        } = call;

        debug!(%method, ticket, "turn started");
        let result = {
            let mut ctx = ActorContext::new(
                &self.reference,
                self.activation_id,
                ticket,
                caller.as_ref(),
                &method,
                &mut self.state,
                invoker,
            );
            self.actor.handle(&mut ctx, &method, args).await
        };

        if self.state.take_dirty() {
            instance.publish(&self.state);
        }
        instance.record_turn();

        match &result {
            Ok(_) => debug!(%method, ticket, "turn completed"),
            Err(error) => debug!(%method, ticket, %error, "turn failed"),
        }
        let _ = reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorType;
    use async_trait::async_trait;

    struct Refusing;

    #[async_trait]
    impl Actor for Refusing {
        async fn on_activate(
            &mut self,
            _reference: &ActorReference,
            _state: &mut StateMap,
        ) -> Result<(), ActorError> {
            Err(ActorError::InvocationFailed {
                reference: ActorReference::random(ActorType::from_static("Refusing")),
                method: "on_activate".into(),
                payload: Value::from("disk on fire"),
            })
        }

        async fn handle(
            &mut self,
            ctx: &mut ActorContext<'_>,
            _method: &str,
            _args: Vec<Value>,
        ) -> Result<Value, ActorError> {
            Err(ctx.unknown_method())
        }
    }

    struct Quiet;

    #[async_trait]
    impl Actor for Quiet {
        async fn on_activate(
            &mut self,
            _reference: &ActorReference,
            state: &mut StateMap,
        ) -> Result<(), ActorError> {
            state.set("count", 0);
            Ok(())
        }

        async fn handle(
            &mut self,
            _ctx: &mut ActorContext<'_>,
            _method: &str,
            _args: Vec<Value>,
        ) -> Result<Value, ActorError> {
            Ok(Value::Null)
        }
    }

    fn reference() -> ActorReference {
        ActorReference::random(ActorType::from_static("Quiet"))
    }

    #[test]
    fn test_activation_id_display() {
        assert_eq!(ActivationId::new(255).to_string(), "act-00000000000000ff");
    }

    #[tokio::test]
    async fn test_failed_activation_reports_reason() {
        let reference = reference();
        let error = ActorInstance::activate(
            reference.clone(),
            ActivationId::new(1),
            Box::new(Refusing),
            Weak::new(),
        )
        .await
        .unwrap_err();

        match error {
            ActorError::ActivationFailed {
                reference: failed,
                reason,
            } => {
                assert_eq!(failed, reference);
                assert!(reason.contains("disk on fire"), "reason was {reason}");
            }
            other => panic!("expected ActivationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_activation_publishes_initial_state() {
        let instance =
            ActorInstance::activate(reference(), ActivationId::new(1), Box::new(Quiet), Weak::new())
                .await
                .unwrap();

        assert_eq!(instance.state(), ActivationState::Active);
        assert_eq!(instance.snapshot().get_as::<i64>("count"), Some(0));
        assert_eq!(instance.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_deactivate_refuses_admission() {
        let instance =
            ActorInstance::activate(reference(), ActivationId::new(7), Box::new(Quiet), Weak::new())
                .await
                .unwrap();

        let finished = instance
            .deactivate(DeactivationReason::ExplicitRequest)
            .expect("active instance accepts deactivation");
        assert!(instance
            .deactivate(DeactivationReason::ExplicitRequest)
            .is_none());

        let call = Call::new(instance.reference().clone(), "CallMe");
        assert!(matches!(
            instance.submit(call, CallChain::root()),
            Err(ActorError::ActorDeactivated { .. })
        ));

        finished.await.unwrap();
        assert_eq!(instance.state(), ActivationState::Deactivated);
    }

    #[tokio::test]
    async fn test_idle_deactivation_waits_for_admitted_calls() {
        let instance =
            ActorInstance::activate(reference(), ActivationId::new(3), Box::new(Quiet), Weak::new())
                .await
                .unwrap();

        let reply = instance
            .submit(Call::new(instance.reference().clone(), "CallMe"), CallChain::root())
            .unwrap();
        assert_eq!(instance.in_flight(), 1);
        assert!(instance.deactivate_if_idle(Duration::ZERO).is_none());
        assert_eq!(instance.state(), ActivationState::Active);

        reply.await.unwrap().unwrap();
        assert_eq!(instance.in_flight(), 0);
        assert_eq!(instance.turns_completed(), 1);
        assert!(instance.deactivate_if_idle(Duration::from_secs(60)).is_none());

        let finished = instance
            .deactivate_if_idle(Duration::ZERO)
            .expect("idle instance deactivates");
        assert!(matches!(
            instance.submit(Call::new(instance.reference().clone(), "CallMe"), CallChain::root()),
            Err(ActorError::ActorDeactivated { .. })
        ));
        finished.await.unwrap();
        assert_eq!(instance.state(), ActivationState::Deactivated);
        assert_eq!(instance.turns_completed(), 1);
    }
}
