//! The actor runtime: registration, dispatch and lifecycle control.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::actor::{ActorReference, DeactivationReason, StateMap};
use crate::directory::AddressDirectory;
use crate::error::ActorError;
use crate::messaging::{Call, Dispatcher, Invoker};
use crate::runtime::{ActorInstance, ActorRegistry, ActorRuntimeBuilder, RuntimeConfig};

/// Main actor runtime coordinating the directory, dispatch and idle collection.
///
/// `ActorRuntime` is the one explicit context every component that talks to
/// actors receives. Clones share the same directory.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = ActorRuntime::builder()
///     .register(TEST, |_: &ActorReference| Box::new(TestActor::default()) as Box<dyn Actor>)
///     .build()?;
///
/// let test = ActorReference::random(TEST);
/// runtime.invoke(Call::new(test.clone(), "CallMe")).await?;
///
/// runtime.shutdown().await;
/// ```
#[derive(Clone)]
pub struct ActorRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    directory: Arc<AddressDirectory>,
    config: RuntimeConfig,
    collector: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        if let Some(collector) = self.collector.get_mut().take() {
            collector.abort();
        }
    }
}

impl ActorRuntime {
    /// Create a new runtime builder.
    pub fn builder() -> ActorRuntimeBuilder {
        ActorRuntimeBuilder::new()
    }

    pub(crate) fn start(registry: ActorRegistry, config: RuntimeConfig) -> Self {
        let directory = Arc::new(AddressDirectory::new(registry, config.call_timeout()));

        let collector = config.deactivation_policy().idle_timeout().map(|idle_timeout| {
            tokio::spawn(collect_idle(
                Arc::downgrade(&directory),
                idle_timeout,
                config.collection_interval(),
            ))
        });

        info!(
            types = ?directory.registry().types(),
            policy = ?config.deactivation_policy(),
            "actor runtime started"
        );

        Self {
            inner: Arc::new(RuntimeInner {
                directory,
                config,
                collector: Mutex::new(collector),
            }),
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// The address directory.
    pub fn directory(&self) -> &Arc<AddressDirectory> {
        &self.inner.directory
    }

    /// Dispatcher sharing this runtime's directory.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.inner.directory))
    }

    /// Invoker for callers outside any actor.
    pub fn invoker(&self) -> Invoker {
        self.dispatcher().external()
    }

    /// Deliver an external call and await its result.
    pub async fn invoke(&self, call: Call) -> Result<Value, ActorError> {
        self.dispatcher().invoke(call).await
    }

    /// Resolve `reference`, activating it if needed.
    pub async fn resolve(&self, reference: &ActorReference) -> Result<Arc<ActorInstance>, ActorError> {
        self.inner.directory.resolve(reference).await
    }

    /// Deactivate the live instance of `reference` and wait until it is gone.
    ///
    /// The running turn (if any) completes; queued calls fail with
    /// `ActorDeactivated`. Returns `false` if there was nothing to deactivate.
    pub async fn deactivate(&self, reference: &ActorReference) -> bool {
        let Some(instance) = self.inner.directory.lookup(reference) else {
            return false;
        };
        match instance.deactivate(DeactivationReason::ExplicitRequest) {
            Some(finished) => finished.await.is_ok(),
            None => false,
        }
    }

    /// Number of live activations.
    pub fn activation_count(&self) -> usize {
        self.inner.directory.len()
    }

    /// Published state of the live instance of `reference`.
    pub fn state_snapshot(&self, reference: &ActorReference) -> Option<StateMap> {
        self.inner
            .directory
            .lookup(reference)
            .map(|instance| instance.snapshot())
    }

    /// Stop the runtime: refuse new calls and deactivate every instance.
    pub async fn shutdown(&self) {
        self.inner.directory.close();
        if let Some(collector) = self.inner.collector.lock().take() {
            collector.abort();
        }

        let pending: Vec<_> = self
            .inner
            .directory
            .instances()
            .into_iter()
            .filter_map(|instance| instance.deactivate(DeactivationReason::RuntimeShutdown))
            .collect();
        let count = pending.len();
        for finished in pending {
            let _ = finished.await;
        }

        info!(deactivated = count, "actor runtime stopped");
    }
}

async fn collect_idle(directory: Weak<AddressDirectory>, idle_timeout: Duration, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(directory) = directory.upgrade() else {
            break;
        };
        if directory.is_closed() {
            break;
        }

        for instance in directory.instances() {
            // The turn loop removes its own slot once on_deactivate ran.
            if instance.deactivate_if_idle(idle_timeout).is_some() {
                debug!(reference = %instance.reference(), "deactivating idle actor");
            }
        }
    }
}
