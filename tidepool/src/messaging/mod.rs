//! Call routing between callers and actor instances.

pub mod call;
pub mod dispatcher;

pub use call::{reference_arg, Call, CallChain};
pub use dispatcher::{Dispatcher, Invoker};
