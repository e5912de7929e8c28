//! Activation state machine and deactivation reasons.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one actor instance.
///
/// # State Transitions
///
/// ```text
/// Unactivated → Activating → Active → Deactivating → Deactivated
///                   ↓                                   ↑
///                   └──────── (activation failed) ──────┘
/// ```
///
/// # Invariants
///
/// - Calls are admitted only while `Active`
/// - An `Active` instance has completed `on_activate()` successfully
/// - `Deactivated` is terminal: the next resolve of the same reference
///   creates a fresh instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationState {
    /// Instance created, activation hook not started.
    Unactivated,

    /// `on_activate()` in progress.
    Activating,

    /// Admitting calls.
    Active,

    /// Refusing calls, finishing the running turn and `on_deactivate()`.
    Deactivating,

    /// Gone.
    Deactivated,
}

impl ActivationState {
    /// Check if transition to next state is valid.
    ///
    /// # Valid Transitions
    ///
    /// - Unactivated → Activating
    /// - Activating → Active (activation succeeded)
    /// - Activating → Deactivated (activation failed)
    /// - Active → Deactivating
    /// - Deactivating → Deactivated
    pub fn can_transition_to(&self, next: ActivationState) -> bool {
        use ActivationState::*;
        matches!(
            (self, next),
            (Unactivated, Activating)
                | (Activating, Active)
                | (Activating, Deactivated)
                | (Active, Deactivating)
                | (Deactivating, Deactivated)
        )
    }

    /// Check if calls are admitted in this state.
    pub fn accepts_calls(&self) -> bool {
        matches!(self, ActivationState::Active)
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActivationState::Deactivated)
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationState::Unactivated => "unactivated",
            ActivationState::Activating => "activating",
            ActivationState::Active => "active",
            ActivationState::Deactivating => "deactivating",
            ActivationState::Deactivated => "deactivated",
        };
        f.write_str(name)
    }
}

/// Reason why an actor is being deactivated.
///
/// Passed to `Actor::on_deactivate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeactivationReason {
    /// No turn ran for longer than the configured idle timeout.
    IdleTimeout,

    /// `ActorRuntime::deactivate` was called.
    ExplicitRequest,

    /// The runtime is shutting down.
    RuntimeShutdown,
}
