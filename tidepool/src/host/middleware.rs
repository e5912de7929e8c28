//! Request middleware installed by the listener host.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use super::listener::WeakListenerHost;

/// Arm a delayed restart once the request has been handled.
pub(super) async fn arm_restart(
    State(host): State<WeakListenerHost>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if let Some(host) = host.upgrade() {
        match host.schedule_restart() {
            Ok(outcome) => debug!(?outcome, "restart armed by request"),
            Err(error) => warn!(%error, "could not arm restart"),
        }
    }
    response
}
