//! Settle-once deferred values with promise-style chaining.
//!
//! A [`Promise`] is a container for the eventual result of an operation that
//! has not yet completed. It settles exactly once, to fulfilled or rejected,
//! and every continuation registered through [`Promise::then`] runs
//! asynchronously on an injected [`Timer`] — never inside the call that
//! registered it. Static combinators compose promises sequentially
//! ([`Promise::resolve`] adoption, chained [`Step`]s) and in parallel
//! ([`Promise::all`], [`Promise::race`]).
//!
//! There is no global state: the timer facility is an explicit handle passed
//! to every constructor, and its `run` loop is the single logical thread on
//! which all continuations dispatch.
//!
//! ```
//! use deferral::{Promise, Reason, Step, Timer};
//! use std::time::Duration;
//!
//! let timer = Timer::new();
//! let doubled = Promise::<u32, Reason>::resolve_delay(
//!     &timer,
//!     Step::Value(21),
//!     Duration::from_millis(5),
//! )
//! .then(|n| Step::Value(n * 2));
//! let outcome = doubled.waiter();
//! timer.run();
//! assert_eq!(futures::executor::block_on(outcome), Ok(42));
//! ```

use thiserror::Error;

mod combine;
mod promise;
mod state;
mod timer;
mod waiter;

pub use promise::{Promise, Step};
pub use state::{Settler, Status};
pub use timer::Timer;
pub use waiter::Waiter;

/// Stock rejection reason for promises that do not carry a custom error
/// type. Any `E: Clone` works as a reason; this one is for callers that
/// just need a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Reason(pub String);

impl From<&str> for Reason {
    fn from(message: &str) -> Self {
        Reason(message.to_owned())
    }
}

impl From<String> for Reason {
    fn from(message: String) -> Self {
        Reason(message)
    }
}
