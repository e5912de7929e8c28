//! Problem responses for failed actor calls.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ActorError;

/// Problem body returned for failed requests.
#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    /// HTTP status code.
    pub status: u16,
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable detail.
    pub detail: String,
    /// Whether retrying the same request may succeed.
    pub retryable: bool,
}

/// Error response of the HTTP surface.
#[derive(Debug)]
pub struct ApiError {
    /// Response status.
    pub status: StatusCode,
    /// Response body.
    pub problem: Box<ProblemDetails>,
}

impl ApiError {
    fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        let problem = Box::new(ProblemDetails {
            status: status.as_u16(),
            code: code.into(),
            detail: detail.into(),
            retryable: false,
        });
        Self { status, problem }
    }

    /// 400 Bad Request.
    pub fn bad_request(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, detail)
    }

    /// 404 Not Found.
    pub fn not_found(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, detail)
    }

    /// 409 Conflict.
    pub fn conflict(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, detail)
    }

    /// 500 Internal Server Error.
    pub fn internal(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, detail)
    }

    /// 503 Service Unavailable.
    pub fn unavailable(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, code, detail)
    }

    /// 504 Gateway Timeout.
    pub fn gateway_timeout(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, code, detail)
    }

    fn with_retryable(mut self, retryable: bool) -> Self {
        self.problem.retryable = retryable;
        self
    }
}

impl From<ActorError> for ApiError {
    fn from(error: ActorError) -> Self {
        let code = error.code();
        let detail = error.to_string();
        let retryable = error.is_retryable();

        let api = match error {
            ActorError::ActivationFailed { .. } | ActorError::InvocationFailed { .. } => {
                Self::internal(code, detail)
            }
            ActorError::ActorDeactivated { .. } => Self::unavailable(code, detail),
            ActorError::ReentrancyDetected { .. } => Self::conflict(code, detail),
            ActorError::UnknownReference { .. } | ActorError::UnknownMethod { .. } => {
                Self::not_found(code, detail)
            }
            ActorError::InvalidArgument { .. } => Self::bad_request(code, detail),
            ActorError::Timeout { .. } => Self::gateway_timeout(code, detail),
        };
        api.with_retryable(retryable)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.problem)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorReference, ActorType};

    fn reference() -> ActorReference {
        ActorReference::random(ActorType::from_static("Test"))
    }

    #[test]
    fn test_fault_status_mapping() {
        let cases = [
            (ActorError::deactivated(&reference()), StatusCode::SERVICE_UNAVAILABLE, true),
            (
                ActorError::ReentrancyDetected {
                    reference: reference(),
                    chain: vec![],
                },
                StatusCode::CONFLICT,
                false,
            ),
            (
                ActorError::UnknownReference {
                    actor_type: ActorType::from_static("Nope"),
                },
                StatusCode::NOT_FOUND,
                false,
            ),
            (
                ActorError::Timeout {
                    reference: reference(),
                    method: "Start".into(),
                    millis: 30_000,
                },
                StatusCode::GATEWAY_TIMEOUT,
                true,
            ),
        ];

        for (fault, status, retryable) in cases {
            let code = fault.code();
            let api = ApiError::from(fault);
            assert_eq!(api.status, status);
            assert_eq!(api.problem.code, code);
            assert_eq!(api.problem.retryable, retryable);
        }
    }
}
