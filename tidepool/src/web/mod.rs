//! HTTP surface translating requests into actor calls.
//!
//! - `GET /activity-actor/test` starts a fresh `Test` actor
//! - `GET /activity-actor/test/{id}` pings an existing (or lazily activated) one

mod error;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use tracing::info;

pub use error::ApiError;

use crate::actor::{ActorIdentity, ActorReference};
use crate::contracts::{TestRef, TEST};
use crate::runtime::ActorRuntime;

/// Routes served by the host.
pub fn router(runtime: ActorRuntime) -> Router {
    Router::new()
        .route("/activity-actor/test", get(start_test))
        .route("/activity-actor/test/{id}", get(call_test))
        .with_state(runtime)
}

/// `Test.CallMe()` then `Test.Start()` on a new identity; responds with it.
async fn start_test(State(runtime): State<ActorRuntime>) -> Result<String, ApiError> {
    let identity = ActorIdentity::random();
    let test = TestRef::new(ActorReference::new(TEST, identity), runtime.invoker());

    test.call_me().await?;
    test.start().await?;

    info!(%identity, "test actor started");
    Ok(identity.to_string())
}

/// `Test.CallMe()` on `{id}`; responds with the identity.
async fn call_test(
    State(runtime): State<ActorRuntime>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let identity: ActorIdentity = id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid_identity", format!("not a valid identity: {id}")))?;
    let test = TestRef::new(ActorReference::new(TEST, identity), runtime.invoker());

    test.call_me().await?;
    Ok(identity.to_string())
}
