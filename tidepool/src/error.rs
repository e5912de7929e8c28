//! Error types for the tidepool actor host.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::actor::{ActorReference, ActorType};

/// Faults returned by actor calls.
///
/// Faults are values: they are cloneable and serializable so a fault raised
/// deep inside a nested call reaches the outermost caller with its
/// classification intact.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActorError {
    /// The activation hook failed. The next resolve of the reference retries.
    #[error("activation of {reference} failed: {reason}")]
    ActivationFailed {
        /// Actor that failed to activate.
        reference: ActorReference,
        /// Reason reported by the activation hook.
        reason: String,
    },

    /// The target was deactivated before the call could run.
    #[error("{reference} is deactivated")]
    ActorDeactivated {
        /// Actor that refused the call.
        reference: ActorReference,
    },

    /// A synchronous call re-entered an actor whose turn is held further up
    /// the same call chain.
    #[error("reentrant call into {reference}")]
    ReentrancyDetected {
        /// Actor whose turn was already held.
        reference: ActorReference,
        /// Actors holding turns when the call was made, outermost first.
        chain: Vec<ActorReference>,
    },

    /// The method body returned an application error.
    #[error("{reference}.{method} failed: {payload}")]
    InvocationFailed {
        /// Actor that raised the error.
        reference: ActorReference,
        /// Method that raised the error.
        method: String,
        /// Application payload.
        payload: Value,
    },

    /// No contract is registered for the actor type.
    #[error("no actor registered for type {actor_type}")]
    UnknownReference {
        /// Unregistered actor type.
        actor_type: ActorType,
    },

    /// The contract has no such method.
    #[error("{actor_type} has no method {method}")]
    UnknownMethod {
        /// Actor type that was called.
        actor_type: ActorType,
        /// Requested method.
        method: String,
    },

    /// An argument was missing or could not be decoded.
    #[error("invalid argument {index} for {method}: {reason}")]
    InvalidArgument {
        /// Method that received the argument.
        method: String,
        /// Position of the argument.
        index: usize,
        /// Decoding failure.
        reason: String,
    },

    /// The caller stopped waiting. The turn itself is not cancelled.
    #[error("call to {reference}.{method} timed out after {millis}ms")]
    Timeout {
        /// Target actor.
        reference: ActorReference,
        /// Target method.
        method: String,
        /// Timeout that elapsed.
        millis: u64,
    },
}

impl ActorError {
    /// Stable machine-readable code for the fault.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ActivationFailed { .. } => "activation_failed",
            Self::ActorDeactivated { .. } => "actor_deactivated",
            Self::ReentrancyDetected { .. } => "reentrancy_detected",
            Self::InvocationFailed { .. } => "invocation_failed",
            Self::UnknownReference { .. } => "unknown_reference",
            Self::UnknownMethod { .. } => "unknown_method",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Whether re-issuing the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ActivationFailed { .. } | Self::ActorDeactivated { .. } | Self::Timeout { .. }
        )
    }

    pub(crate) fn deactivated(reference: &ActorReference) -> Self {
        Self::ActorDeactivated {
            reference: reference.clone(),
        }
    }
}

/// Errors raised while building an actor runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Runtime configuration is invalid.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors raised by the listener host.
///
/// Cloneable so every waiter on a host observes the same outcome.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    /// Binding (or rebinding) the endpoint failed. Fatal to the host.
    #[error("failed to bind endpoint {endpoint} on {addr}: {source}")]
    Bind {
        /// Logical endpoint name.
        endpoint: String,
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying socket error.
        source: Arc<std::io::Error>,
    },

    /// Serving connections failed.
    #[error("listener I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// The host has been shut down.
    #[error("listener host is not running")]
    NotRunning,
}

impl From<std::io::Error> for HostError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorIdentity, ActorReference};
    use serde_json::json;

    fn reference() -> ActorReference {
        ActorReference::new(ActorType::from_static("Test"), ActorIdentity::random())
    }

    #[test]
    fn test_fault_survives_serialization() {
        let fault = ActorError::InvocationFailed {
            reference: reference(),
            method: "CallMe".to_string(),
            payload: json!({"reason": "boom"}),
        };

        let encoded = serde_json::to_value(&fault).unwrap();
        assert_eq!(encoded["kind"], "invocation_failed");

        let decoded: ActorError = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, fault);
    }

    #[test]
    fn test_retryable_classification() {
        let r = reference();
        assert!(ActorError::deactivated(&r).is_retryable());
        assert!(ActorError::ActivationFailed {
            reference: r.clone(),
            reason: "nope".into()
        }
        .is_retryable());
        assert!(!ActorError::ReentrancyDetected {
            reference: r.clone(),
            chain: vec![r.clone()]
        }
        .is_retryable());
        assert!(!ActorError::UnknownReference {
            actor_type: ActorType::from_static("Missing")
        }
        .is_retryable());
    }

    #[test]
    fn test_codes_are_distinct() {
        let r = reference();
        let faults = [
            ActorError::deactivated(&r),
            ActorError::ReentrancyDetected {
                reference: r.clone(),
                chain: vec![],
            },
            ActorError::Timeout {
                reference: r.clone(),
                method: "Start".into(),
                millis: 10,
            },
        ];
        let codes: std::collections::HashSet<_> = faults.iter().map(|f| f.code()).collect();
        assert_eq!(codes.len(), faults.len());
    }
}
