//! Dispatch orchestration for the gateway.
//!
//! [`dispatcher::Dispatcher`] ties the pipeline together: the routing engine
//! resolves each message, the rate limiter gates admission (failing fast or
//! waiting, per config), the retry coordinator drives adapter delivery, and
//! every outcome is recorded to the registered [`sink::DeliverySink`]s.
//! [`dispatcher::spawn_scheduler`] wires a scheduler whose fired messages go
//! through the same pipeline.

pub mod dispatcher;
pub mod error;
pub mod sink;

pub use {
    dispatcher::{Dispatcher, spawn_scheduler},
    error::{Error, Result},
    sink::{DeliverySink, LogSink, MemorySink},
};
