//! Actor factory for on-demand instantiation.
//!
//! The directory never constructs actors itself: it asks the factory
//! registered for the reference's type. Factories are the injection point for
//! whatever an actor needs from its host (shared journals, clients, config).
//!
//! # Example
//!
//! ```rust,ignore
//! let journal = CallJournal::default();
//! let runtime = ActorRuntime::builder()
//!     .register(TEST, {
//!         let journal = journal.clone();
//!         move |_: &ActorReference| Box::new(TestActor::with_journal(journal.clone())) as Box<dyn Actor>
//!     })
//!     .build()?;
//! ```

use crate::actor::{Actor, ActorReference};

/// Creates actor instances for one actor type.
///
/// Any `Fn(&ActorReference) -> Box<dyn Actor>` closure is a factory.
pub trait ActorFactory: Send + Sync + 'static {
    /// Build a new, not yet activated, actor for `reference`.
    fn create(&self, reference: &ActorReference) -> Box<dyn Actor>;
}

impl<F> ActorFactory for F
where
    F: Fn(&ActorReference) -> Box<dyn Actor> + Send + Sync + 'static,
{
    fn create(&self, reference: &ActorReference) -> Box<dyn Actor> {
        self(reference)
    }
}
