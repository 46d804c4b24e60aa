//! Delivery attempts with retry and dead-lettering.
//!
//! [`coordinator::RetryCoordinator`] drives the attempt sequence for one
//! resolved message: exponential backoff between transient failures, no
//! retries after a permanent one, and a [`dlq::DeadLetterQueue`] entry for
//! anything that could not be delivered. Dead-lettered messages can be
//! inspected, discarded, or retried by queue entry id.

pub mod coordinator;
pub mod dlq;
pub mod error;

pub use {
    coordinator::{RetryCoordinator, RetryPolicy},
    dlq::{DeadLetterEntry, DeadLetterQueue, DeadLetterStatus},
    error::{Error, Result},
};
