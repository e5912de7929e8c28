//! Actor identity, lifecycle and the traits contracts implement.

pub mod context;
pub mod factory;
pub mod lifecycle;
pub mod reference;
pub mod state;
pub mod traits;

pub use context::ActorContext;
pub use factory::ActorFactory;
pub use lifecycle::{ActivationState, DeactivationReason};
pub use reference::{ActorIdentity, ActorReference, ActorType};
pub use state::StateMap;
pub use traits::Actor;
