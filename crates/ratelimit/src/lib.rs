//! Per-channel token-bucket admission control.
//!
//! Tokens replenish lazily on each check based on elapsed time — there is no
//! background refill timer. Every bucket is keyed by channel (or
//! channel+target) and mutated only through the map entry for that key, so
//! concurrent callers serialize per bucket, never globally.

pub mod bucket;
pub mod limiter;

pub use {bucket::TokenBucket, limiter::RateLimiter};
