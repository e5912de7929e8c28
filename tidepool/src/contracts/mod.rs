//! The `Test` / `Test2` contracts and their call/callback cycle.
//!
//! # Protocol
//!
//! ```text
//! external ──Start──▶ T ──CallMe1(T)──▶ U          (T's turn held, awaiting U)
//!                     T ◀─────────────── U  ack    (T.Start completes)
//!                     T ◀─CallMeBack(U)─ U  post   (new chain, queued behind Start)
//! ```
//!
//! `U` sends `CallMeBack` one-way, so the cycle never re-enters `T` while its
//! `Start` turn is held.

pub mod journal;
pub mod test2_actor;
pub mod test_actor;

pub use journal::{CallJournal, JournalEntry};
pub use test2_actor::{Test2Actor, Test2Ref, TEST2};
pub use test_actor::{TestActor, TestRef, TEST};

use crate::actor::{Actor, ActorReference};
use crate::runtime::ActorRuntimeBuilder;

/// State key written once, with `0`, when either contract activates.
pub const COUNT: &str = "count";

/// Register both contracts on `builder`, recording calls into `journal` when
/// one is given.
pub fn register(builder: ActorRuntimeBuilder, journal: Option<&CallJournal>) -> ActorRuntimeBuilder {
    let test_journal = journal.cloned();
    let test2_journal = journal.cloned();

    builder
        .register(TEST, move |_: &ActorReference| {
            let actor = match &test_journal {
                Some(journal) => TestActor::with_journal(journal.clone()),
                None => TestActor::default(),
            };
            Box::new(actor) as Box<dyn Actor>
        })
        .register(TEST2, move |_: &ActorReference| {
            let actor = match &test2_journal {
                Some(journal) => Test2Actor::with_journal(journal.clone()),
                None => Test2Actor::default(),
            };
            Box::new(actor) as Box<dyn Actor>
        })
}
