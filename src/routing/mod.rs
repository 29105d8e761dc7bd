//! Correlation of inbound events with suspended handlers

pub mod dispatcher;
pub mod waiter;

pub use dispatcher::{Dispatcher, WaiterHandle};
pub use waiter::{EventKind, Predicate, Scope, WaitOutcome, WaitSpec, WaiterId, WaiterInfo};
