//! Channel adapter contract consumed by the dispatch pipeline.
//!
//! Adapters are thin: one outbound call per send, reporting success or a
//! classified failure. Their HTTP/SMTP mechanics live outside the core; the
//! pipeline only sees [`AdapterResponse`] or a typed [`Error`].

pub mod adapter;
pub mod error;
pub mod mock;
pub mod registry;

pub use {
    adapter::{AdapterResponse, ChannelAdapter},
    error::{Error, Result},
    registry::AdapterRegistry,
};
