//! # Tidepool
//!
//! Virtual actors with turn-serialized calls, hosted behind an HTTP listener
//! that can drain and rebind without dropping accepted work.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  host::ListenerHost        web::router                      │
//! │  • bind / drain / rebind   • GET /activity-actor/test       │
//! │  • restart coalescing      • GET /activity-actor/test/{id}  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  messaging::Dispatcher     contracts::{Test, Test2}         │
//! │  • reentrancy detection    • call / callback cycle          │
//! │  • call timeout, one-way   • typed proxies                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  directory::AddressDirectory  runtime::ActorRuntime         │
//! │  • single-flight activation   • turn loop per instance      │
//! │  • stale slot replacement     • idle deactivation           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use tidepool::prelude::*;
//!
//! let runtime = contracts::register(ActorRuntime::builder(), None).build()?;
//!
//! let test = TestRef::new(ActorReference::random(TEST), runtime.invoker());
//! test.start().await?;
//! ```

#![warn(missing_docs)]

pub mod actor;
pub mod config;
pub mod contracts;
pub mod directory;
pub mod error;
pub mod host;
pub mod messaging;
pub mod prelude;
pub mod runtime;
pub mod web;
