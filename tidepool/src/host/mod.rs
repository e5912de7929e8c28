//! Listener host: serves HTTP on a named endpoint and restarts it in place.
//!
//! # Restart protocol
//!
//! ```text
//! Stopped → Starting → Listening ⇄ Draining → Starting → Listening
//!                                      ↓
//!                                   Stopped (shutdown or failed rebind)
//! ```
//!
//! - `Draining`: no new connections are accepted; accepted requests finish
//! - `Starting`: the old listener is gone; the same address is bound again
//! - a restart requested while one is armed or running is a no-op

mod listener;
mod middleware;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

pub use listener::ListenerHost;

/// Default delay between arming a restart and draining.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(2);

/// Named address a host listens on.
///
/// The name is stable across restarts. An ephemeral port (`:0`) is resolved
/// at first bind and the resolved address is reused on every rebind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEndpoint {
    /// Logical endpoint name, e.g. `"http"`.
    pub name: String,
    /// Socket address to bind.
    pub addr: SocketAddr,
}

impl ListenerEndpoint {
    /// Create an endpoint.
    pub fn new(name: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            addr,
        }
    }
}

impl fmt::Display for ListenerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.addr)
    }
}

/// How and when the host restarts its listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Delay between `schedule_restart` and the start of the drain.
    pub delay: Duration,
    /// Arm a scheduled restart after every handled request.
    pub arm_on_request: bool,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RESTART_DELAY,
            arm_on_request: false,
        }
    }
}

impl RestartPolicy {
    /// Set the restart delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Enable or disable arming a restart after every request.
    pub fn with_arm_on_request(mut self, enabled: bool) -> Self {
        self.arm_on_request = enabled;
        self
    }
}

/// Listener lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// Not bound.
    Stopped,
    /// Binding.
    Starting,
    /// Accepting connections.
    Listening,
    /// Refusing new connections while accepted ones finish.
    Draining,
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostState::Stopped => "stopped",
            HostState::Starting => "starting",
            HostState::Listening => "listening",
            HostState::Draining => "draining",
        };
        f.write_str(name)
    }
}

/// Result of a restart request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The drain started immediately.
    Started,
    /// A timer was armed; the drain starts after the policy delay.
    Scheduled,
    /// A restart was already armed or running; nothing changed.
    AlreadyInProgress,
}
