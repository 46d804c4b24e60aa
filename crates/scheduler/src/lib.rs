//! Deferred and recurring message dispatch.
//!
//! [`service::SchedulerService`] runs a timer loop over persisted
//! [`types::ScheduleEntry`] values and hands due messages to a dispatch
//! callback. One-shot entries fire once (`delay`, `at`); recurring entries
//! (`every`) fire until cancelled, each fire carrying a fresh message id.

pub mod error;
pub mod service;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod types;

pub use {
    error::{Error, Result},
    service::{DispatchFn, SchedulerService},
    store::ScheduleStore,
    store_file::FileStore,
    store_memory::InMemoryStore,
    types::{EntryStatus, FirePolicy, ScheduleEntry},
};
