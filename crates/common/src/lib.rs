//! Shared message model, error kinds, and time helpers used across all
//! omnigate crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::{ChannelType, ErrorKind, Message, SendResult, now_ms},
};
