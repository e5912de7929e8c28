//! Address directory: maps actor references to live instances.
//!
//! The directory is the actor system's "phone book". Given an
//! `ActorReference`, `resolve()` returns the one live `ActorInstance` for
//! it, activating a new one on first use.
//!
//! # Single-flight activation
//!
//! Each reference owns a slot holding a `OnceCell`. Finding or creating the
//! slot is double-checked (read lock, then write lock with a second lookup),
//! and the cell runs the activation at most once at a time. Concurrent
//! resolvers of the same reference all await the same activation.
//! A failed activation leaves the cell empty: a resolver already waiting on
//! the slot retries the activation in place, and the slot is dropped only
//! once no resolver holds it.
//!
//! # Stale slots
//!
//! A deactivated instance removes its own slot, guarded by activation id so a
//! newer activation is never removed by an older one. A resolve that still
//! sees a `Deactivated` instance replaces it; one that sees a `Deactivating`
//! instance fails with `ActorDeactivated` and the caller retries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::actor::{ActivationState, ActorReference};
use crate::error::ActorError;
use crate::runtime::{ActivationId, ActorInstance, ActorRegistry};

/// Resolve attempts before giving up on a reference whose instances keep
/// deactivating underneath the resolver.
const MAX_RESOLVE_ATTEMPTS: usize = 3;

#[derive(Default)]
struct ActivationSlot {
    cell: OnceCell<Arc<ActorInstance>>,
}

/// In-process directory of actor activations.
pub struct AddressDirectory {
    slots: RwLock<HashMap<ActorReference, Arc<ActivationSlot>>>,
    registry: ActorRegistry,
    call_timeout: Duration,
    next_activation: AtomicU64,
    closed: AtomicBool,
}

impl AddressDirectory {
    /// Create an empty directory activating types from `registry`.
    pub fn new(registry: ActorRegistry, call_timeout: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            registry,
            call_timeout,
            next_activation: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// The registration table.
    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    /// How long callers wait for a reply.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Return the live instance for `reference`, activating it if needed.
    ///
    /// # Errors
    ///
    /// - `UnknownReference` if the type is not registered (no slot is created)
    /// - `ActivationFailed` if the activation hook failed
    /// - `ActorDeactivated` if the instance is deactivating or the directory
    ///   is closed
    pub async fn resolve(
        self: &Arc<Self>,
        reference: &ActorReference,
    ) -> Result<Arc<ActorInstance>, ActorError> {
        let factory =
            self.registry
                .get(&reference.actor_type)
                .ok_or_else(|| ActorError::UnknownReference {
                    actor_type: reference.actor_type.clone(),
                })?;

        for _ in 0..MAX_RESOLVE_ATTEMPTS {
            if self.is_closed() {
                return Err(ActorError::deactivated(reference));
            }

            let slot = self.slot(reference);
            let activation = slot
                .cell
                .get_or_try_init(|| {
                    let activation_id =
                        ActivationId::new(self.next_activation.fetch_add(1, Ordering::Relaxed));
                    debug!(%reference, activation = %activation_id, "activating");
                    ActorInstance::activate(
                        reference.clone(),
                        activation_id,
                        factory.create(reference),
                        Arc::downgrade(self),
                    )
                })
                .await;

            let instance = match activation {
                Ok(instance) => Arc::clone(instance),
                Err(error) => {
                    self.discard_empty(reference, &slot);
                    return Err(error);
                }
            };

            match instance.state() {
                ActivationState::Active => return Ok(instance),
                ActivationState::Deactivated => {
                    self.remove(reference, instance.activation_id());
                }
                _ => return Err(ActorError::deactivated(reference)),
            }
        }

        Err(ActorError::deactivated(reference))
    }

    /// The live instance for `reference`, without activating.
    pub fn lookup(&self, reference: &ActorReference) -> Option<Arc<ActorInstance>> {
        self.slots
            .read()
            .get(reference)
            .and_then(|slot| slot.cell.get().cloned())
    }

    /// Remove the slot for `reference` if it holds `activation_id`.
    ///
    /// Returns whether a slot was removed.
    pub fn remove(&self, reference: &ActorReference, activation_id: ActivationId) -> bool {
        let mut slots = self.slots.write();
        let current = slots
            .get(reference)
            .and_then(|slot| slot.cell.get())
            .map(|instance| instance.activation_id());

        if current == Some(activation_id) {
            slots.remove(reference);
            debug!(%reference, activation = %activation_id, "slot removed");
            true
        } else {
            false
        }
    }

    /// All live instances.
    pub fn instances(&self) -> Vec<Arc<ActorInstance>> {
        self.slots
            .read()
            .values()
            .filter_map(|slot| slot.cell.get().cloned())
            .collect()
    }

    /// References with a live instance.
    pub fn references(&self) -> Vec<ActorReference> {
        self.instances()
            .iter()
            .map(|instance| instance.reference().clone())
            .collect()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.cell.initialized())
            .count()
    }

    /// Whether no instance is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refuse all future activations and calls.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn slot(&self, reference: &ActorReference) -> Arc<ActivationSlot> {
        // Fast path: slot exists
        if let Some(slot) = self.slots.read().get(reference) {
            return Arc::clone(slot);
        }

        // Slow path: double-check under the write lock
        let mut slots = self.slots.write();
        Arc::clone(slots.entry(reference.clone()).or_default())
    }

    fn discard_empty(&self, reference: &ActorReference, slot: &Arc<ActivationSlot>) {
        let mut slots = self.slots.write();
        // Slots are only cloned out under the lock, so the count is exact here:
        // one reference from the map, one from the caller.
        let empty = slots.get(reference).is_some_and(|current| {
            Arc::ptr_eq(current, slot)
                && Arc::strong_count(current) == 2
                && !current.cell.initialized()
        });
        if empty {
            slots.remove(reference);
        }
    }
}
