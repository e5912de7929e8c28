//! The listener host and its supervisor task.

use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use axum::middleware::from_fn_with_state;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};

use super::middleware::arm_restart;
use super::{HostState, ListenerEndpoint, RestartOutcome, RestartPolicy};
use crate::error::HostError;

/// Serves a router on a named endpoint and can drain and rebind it.
///
/// Cheap to clone; clones control the same listener.
///
/// # Example
///
/// ```rust,ignore
/// let host = ListenerHost::bind(
///     ListenerEndpoint::new("http", "0.0.0.0:8080".parse()?),
///     web::router(runtime.clone()),
///     RestartPolicy::default(),
/// )
/// .await?;
///
/// host.schedule_restart()?;   // drains and rebinds after 2s
/// host.shutdown().await?;
/// ```
#[derive(Clone)]
pub struct ListenerHost {
    inner: Arc<HostInner>,
}

struct HostInner {
    endpoint: ListenerEndpoint,
    local_addr: SocketAddr,
    policy: RestartPolicy,
    state: watch::Sender<HostState>,
    generation: watch::Sender<u64>,
    control: Mutex<Control>,
    /// Set once by the supervisor when it exits.
    outcome: watch::Sender<Option<Result<(), HostError>>>,
}

#[derive(Default)]
struct Control {
    restart_in_progress: bool,
    shutting_down: bool,
    /// Fires the graceful shutdown of the current listener.
    drain: Option<oneshot::Sender<()>>,
    /// Armed restart timer.
    armed: Option<JoinHandle<()>>,
}

impl HostInner {
    fn begin_drain(&self, control: &mut Control) {
        if let Some(drain) = control.drain.take() {
            self.state.send_replace(HostState::Draining);
            info!(endpoint = %self.endpoint.name, "draining listener");
            let _ = drain.send(());
        }
    }

    fn stop(&self) {
        let mut control = self.control.lock();
        control.restart_in_progress = false;
        control.drain = None;
        if let Some(timer) = control.armed.take() {
            timer.abort();
        }
        self.state.send_replace(HostState::Stopped);
    }

    fn is_running(&self, control: &Control) -> bool {
        !control.shutting_down && *self.state.borrow() != HostState::Stopped
    }
}

impl ListenerHost {
    /// Bind `endpoint` and start serving `service` on it.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Bind` if the address cannot be bound.
    pub async fn bind(
        endpoint: ListenerEndpoint,
        service: Router,
        policy: RestartPolicy,
    ) -> Result<Self, HostError> {
        let (state, _) = watch::channel(HostState::Stopped);
        state.send_replace(HostState::Starting);

        let listener = TcpListener::bind(endpoint.addr)
            .await
            .map_err(|source| HostError::Bind {
                endpoint: endpoint.name.clone(),
                addr: endpoint.addr,
                source: Arc::new(source),
            })?;
        let local_addr = listener.local_addr()?;

        let (drain, drained) = oneshot::channel();
        let inner = Arc::new(HostInner {
            endpoint,
            local_addr,
            policy,
            state,
            generation: watch::channel(0).0,
            control: Mutex::new(Control {
                drain: Some(drain),
                ..Control::default()
            }),
            outcome: watch::channel(None).0,
        });

        let app = service_stack(service, &inner);
        inner.state.send_replace(HostState::Listening);

        let span = info_span!("listener", endpoint = %inner.endpoint.name);
        let supervisor = Arc::clone(&inner);
        tokio::spawn(
            async move {
                let outcome = supervise(Arc::clone(&supervisor), app, listener, drained).await;
                supervisor.outcome.send_replace(Some(outcome));
            }
            .instrument(span),
        );

        info!(endpoint = %inner.endpoint.name, addr = %local_addr, "listener bound");
        Ok(Self { inner })
    }

    /// The endpoint this host serves.
    pub fn endpoint(&self) -> &ListenerEndpoint {
        &self.inner.endpoint
    }

    /// Address actually bound (ephemeral ports resolved).
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Restart policy.
    pub fn policy(&self) -> RestartPolicy {
        self.inner.policy
    }

    /// Current state.
    pub fn state(&self) -> HostState {
        *self.inner.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<HostState> {
        self.inner.state.subscribe()
    }

    /// Completed drain/rebind cycles.
    pub fn generation(&self) -> u64 {
        *self.inner.generation.borrow()
    }

    /// Drain and rebind now.
    ///
    /// Returns `AlreadyInProgress` if a restart is armed or running.
    pub fn request_restart(&self) -> Result<RestartOutcome, HostError> {
        let mut control = self.inner.control.lock();
        if !self.inner.is_running(&control) {
            return Err(HostError::NotRunning);
        }
        if control.restart_in_progress {
            debug!("restart already in progress");
            return Ok(RestartOutcome::AlreadyInProgress);
        }

        control.restart_in_progress = true;
        self.inner.begin_drain(&mut control);
        Ok(RestartOutcome::Started)
    }

    /// Drain and rebind after the policy delay.
    ///
    /// Returns `AlreadyInProgress` if a restart is armed or running.
    pub fn schedule_restart(&self) -> Result<RestartOutcome, HostError> {
        let mut control = self.inner.control.lock();
        if !self.inner.is_running(&control) {
            return Err(HostError::NotRunning);
        }
        if control.restart_in_progress {
            debug!("restart already in progress");
            return Ok(RestartOutcome::AlreadyInProgress);
        }

        control.restart_in_progress = true;
        let delay = self.inner.policy.delay;
        let host = Arc::downgrade(&self.inner);
        control.armed = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = host.upgrade() else {
                return;
            };
            let mut control = inner.control.lock();
            control.armed = None;
            if !control.shutting_down {
                inner.begin_drain(&mut control);
            }
        }));

        info!(delay_ms = delay.as_millis() as u64, "restart scheduled");
        Ok(RestartOutcome::Scheduled)
    }

    /// Wait until the host reaches `target`.
    pub async fn wait_for_state(&self, target: HostState) -> Result<(), HostError> {
        let mut state = self.inner.state.subscribe();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| HostError::NotRunning)
    }

    /// Wait until at least `generation` restarts have completed.
    pub async fn wait_for_generation(&self, generation: u64) -> Result<(), HostError> {
        let mut current = self.inner.generation.subscribe();
        current
            .wait_for(|completed| *completed >= generation)
            .await
            .map(|_| ())
            .map_err(|_| HostError::NotRunning)
    }

    /// Wait for the host to stop, returning the supervisor's outcome.
    ///
    /// Every caller sees the same outcome; a failed rebind surfaces here as
    /// `HostError::Bind`.
    pub async fn wait(&self) -> Result<(), HostError> {
        let mut outcome = self.inner.outcome.subscribe();
        let finished = outcome
            .wait_for(Option::is_some)
            .await
            .map_err(|_| HostError::NotRunning)?;
        let result = (*finished).clone();
        result.unwrap_or(Ok(()))
    }

    /// Cancel any armed restart, drain, and stop.
    pub async fn shutdown(&self) -> Result<(), HostError> {
        {
            let mut control = self.inner.control.lock();
            if !control.shutting_down {
                control.shutting_down = true;
                if let Some(timer) = control.armed.take() {
                    timer.abort();
                }
                info!(endpoint = %self.inner.endpoint.name, "listener shutting down");
                self.inner.begin_drain(&mut control);
            }
        }
        self.wait().await
    }
}

/// Non-owning handle used by middleware so the router does not keep the host alive.
#[derive(Clone)]
pub(super) struct WeakListenerHost(Weak<HostInner>);

impl WeakListenerHost {
    pub(super) fn upgrade(&self) -> Option<ListenerHost> {
        self.0.upgrade().map(|inner| ListenerHost { inner })
    }
}

// New connections are refused by closing the listener, not per request:
// a request on a connection accepted before the drain is always served.
fn service_stack(service: Router, inner: &Arc<HostInner>) -> Router {
    if inner.policy.arm_on_request {
        let host = WeakListenerHost(Arc::downgrade(inner));
        service.layer(from_fn_with_state(host, arm_restart))
    } else {
        service
    }
}

async fn supervise(
    inner: Arc<HostInner>,
    app: Router,
    mut listener: TcpListener,
    mut drained: oneshot::Receiver<()>,
) -> Result<(), HostError> {
    loop {
        let serving = axum::serve(listener, app.clone()).with_graceful_shutdown(async move {
            let _ = drained.await;
        });
        // Returns once the listener is closed and every accepted connection finished.
        if let Err(error) = serving.await {
            error!(%error, "listener failed");
            inner.stop();
            return Err(error.into());
        }
        debug!("listener drained");

        if inner.control.lock().shutting_down {
            inner.stop();
            info!("listener stopped");
            return Ok(());
        }
        inner.state.send_replace(HostState::Starting);

        listener = match TcpListener::bind(inner.local_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(addr = %inner.local_addr, error = %source, "rebind failed");
                inner.stop();
                return Err(HostError::Bind {
                    endpoint: inner.endpoint.name.clone(),
                    addr: inner.local_addr,
                    source: Arc::new(source),
                });
            }
        };

        let (drain, next) = oneshot::channel();
        {
            let mut control = inner.control.lock();
            if control.shutting_down {
                drop(control);
                inner.stop();
                info!("listener stopped");
                return Ok(());
            }
            control.drain = Some(drain);
            control.restart_in_progress = false;
            inner.generation.send_modify(|generation| *generation += 1);
            inner.state.send_replace(HostState::Listening);
        }
        drained = next;

        info!(
            addr = %inner.local_addr,
            generation = *inner.generation.borrow(),
            "listener rebound"
        );
    }
}
