//! Rule-based routing: resolve a message to a concrete
//! (channel, target, content) tuple before dispatch.
//!
//! Rules are configured at startup and read-only at dispatch time;
//! [`engine::RoutingEngine::route`] is a pure function over the message and
//! the rule set.

pub mod engine;
pub mod error;
pub mod rule;

pub use {
    engine::{RoutedMessage, RoutingEngine},
    error::{Error, Result},
    rule::{RouteCandidate, RoutingRule, RulePredicate},
};
