//! Configuration schema and loader for the gateway core: per-channel retry
//! budgets, token-bucket limits, rate-limit policy, dispatch timeout.

pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        BucketConfig, ChannelConfig, GatewayConfig, LimitMode, RateLimitPolicy, RetryConfig,
        SchedulerConfig,
    },
};
