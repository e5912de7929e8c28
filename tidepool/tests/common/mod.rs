//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tidepool::messaging::reference_arg;
use tidepool::prelude::*;
use tidepool::web;

/// Test actor type with instrumented methods.
pub const RECORDER: ActorType = ActorType::from_static("Recorder");

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Observations shared by every `Recorder` instance of a runtime.
#[derive(Clone, Default)]
pub struct RecorderLog {
    inner: Arc<RecorderLogInner>,
}

#[derive(Default)]
struct RecorderLogInner {
    tickets: Mutex<Vec<u64>>,
    deactivations: Mutex<Vec<(ActorReference, DeactivationReason)>>,
    activations: AtomicUsize,
    failing_activations: AtomicUsize,
    running: AtomicUsize,
    overlaps: AtomicUsize,
}

impl RecorderLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` activations fail.
    pub fn fail_next_activations(&self, count: usize) {
        self.inner.failing_activations.store(count, Ordering::SeqCst);
    }

    pub fn tickets(&self) -> Vec<u64> {
        self.inner.tickets.lock().clone()
    }

    pub fn deactivations(&self) -> Vec<(ActorReference, DeactivationReason)> {
        self.inner.deactivations.lock().clone()
    }

    pub fn activations(&self) -> usize {
        self.inner.activations.load(Ordering::SeqCst)
    }

    /// Times a `Record` turn started while another was still running.
    pub fn overlaps(&self) -> usize {
        self.inner.overlaps.load(Ordering::SeqCst)
    }
}

/// Methods:
/// - `Ping()`
/// - `Increment()` returns the new count
/// - `Record()` logs its ticket, flagging overlapping turns
/// - `Sleep(ms)`
/// - `Forward(target, method, args..)` calls through and returns the result
/// - `CallSelf()` calls `Ping` on itself synchronously
/// - `Fail()` raises `{"reason": "requested"}`
pub struct Recorder {
    reference: ActorReference,
    log: RecorderLog,
}

#[async_trait]
impl Actor for Recorder {
    async fn on_activate(
        &mut self,
        _reference: &ActorReference,
        state: &mut StateMap,
    ) -> Result<()> {
        let failing = &self.log.inner.failing_activations;
        if failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ActorError::InvocationFailed {
                reference: self.reference.clone(),
                method: "on_activate".into(),
                payload: json!("storage unavailable"),
            });
        }

        self.log.inner.activations.fetch_add(1, Ordering::SeqCst);
        state.set(contracts::COUNT, 0);
        Ok(())
    }

    async fn on_deactivate(
        &mut self,
        reason: DeactivationReason,
        _state: &mut StateMap,
    ) -> Result<()> {
        self.log
            .inner
            .deactivations
            .lock()
            .push((self.reference.clone(), reason));
        Ok(())
    }

    async fn handle(
        &mut self,
        ctx: &mut ActorContext<'_>,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        match method {
            "Ping" => Ok(Value::Null),
            "Increment" => {
                let count = ctx.state().get_as::<u64>(contracts::COUNT).unwrap_or(0) + 1;
                ctx.state_mut().set(contracts::COUNT, count);
                Ok(json!(count))
            }
            "Record" => {
                let inner = &self.log.inner;
                if inner.running.fetch_add(1, Ordering::SeqCst) > 0 {
                    inner.overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
                inner.tickets.lock().push(ctx.ticket());
                inner.running.fetch_sub(1, Ordering::SeqCst);
                Ok(json!(ctx.ticket()))
            }
            "Sleep" => {
                let millis = args.first().and_then(Value::as_u64).unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(json!(millis))
            }
            "Forward" => {
                let target = reference_arg(method, &args, 0)?;
                let forwarded = args
                    .get(1)
                    .and_then(Value::as_str)
                    .unwrap_or("Ping")
                    .to_string();
                let rest = args.into_iter().skip(2).collect();
                ctx.call(&target, &forwarded, rest).await
            }
            "CallSelf" => {
                let me = ctx.reference().clone();
                ctx.call(&me, "Ping", Vec::new()).await
            }
            "Fail" => Err(ctx.fail(json!({"reason": "requested"}))),
            _ => Err(ctx.unknown_method()),
        }
    }
}

pub fn recorder_runtime(log: &RecorderLog, config: RuntimeConfig) -> ActorRuntime {
    let log = log.clone();
    ActorRuntime::builder()
        .config(config)
        .register(RECORDER, move |reference: &ActorReference| {
            Box::new(Recorder {
                reference: reference.clone(),
                log: log.clone(),
            }) as Box<dyn Actor>
        })
        .build()
        .expect("recorder runtime")
}

pub fn contract_runtime(journal: &CallJournal) -> ActorRuntime {
    contracts::register(ActorRuntime::builder(), Some(journal))
        .build()
        .expect("contract runtime")
}

pub async fn call(
    runtime: &ActorRuntime,
    target: &ActorReference,
    method: &str,
    args: Vec<Value>,
) -> Result<Value> {
    runtime.invoke(Call::new(target.clone(), method).with_args(args)).await
}

/// Serve the HTTP surface of `runtime` on an ephemeral port.
pub async fn serve(runtime: &ActorRuntime, policy: RestartPolicy) -> ListenerHost {
    ListenerHost::bind(
        ListenerEndpoint::new("http", "127.0.0.1:0".parse().expect("addr")),
        web::router(runtime.clone()),
        policy,
    )
    .await
    .expect("bind listener")
}

/// Client that opens a fresh connection per request.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("http client")
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
