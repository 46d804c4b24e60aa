//! Config schema types. Everything is default-able so a missing or partial
//! config file still yields a working gateway.

use std::collections::HashMap;

use {
    omnigate_common::ChannelType,
    serde::{Deserialize, Serialize},
};

/// Retry budget and backoff shape for one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempt budget (first attempt included).
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

/// Token bucket shape for one channel (or one channel+target).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BucketConfig {
    pub capacity: f64,
    /// Tokens replenished per second.
    pub refill_rate: f64,
    /// Cooldown applied after `denial_streak` consecutive denials, to avoid
    /// hot-spinning against an already rate-limited platform API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
    pub denial_streak: u32,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            capacity: 30.0,
            refill_rate: 1.0,
            cooldown_ms: None,
            denial_streak: 3,
        }
    }
}

impl BucketConfig {
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_cooldown(mut self, cooldown_ms: u64, denial_streak: u32) -> Self {
        self.cooldown_ms = Some(cooldown_ms);
        self.denial_streak = denial_streak;
        self
    }

    /// A usable bucket needs a positive finite capacity and a non-negative
    /// finite refill rate; anything else would break the token bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(format!("capacity must be a positive number, got {}", self.capacity));
        }
        if !self.refill_rate.is_finite() || self.refill_rate < 0.0 {
            return Err(format!(
                "refillRate must be a non-negative number, got {}",
                self.refill_rate
            ));
        }
        Ok(())
    }
}

/// Per-channel settings: retry budget + rate bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelConfig {
    pub retry: RetryConfig,
    pub bucket: BucketConfig,
}

/// What happens when the rate limiter denies a dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitMode {
    /// Wait up to `max_wait_ms` for tokens, then fail with `rateLimited`.
    #[default]
    Wait,
    /// Fail immediately with `rateLimited`.
    FailFast,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub mode: LimitMode,
    pub max_wait_ms: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            mode: LimitMode::Wait,
            max_wait_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Upper bound on timer-loop sleep when no entry is due sooner.
    pub poll_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
        }
    }
}

/// Root configuration consumed by the dispatch core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bound on a single adapter send attempt.
    pub dispatch_timeout_ms: u64,
    pub rate_limit: RateLimitPolicy,
    pub scheduler: SchedulerConfig,
    pub channels: HashMap<ChannelType, ChannelConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_ms: 30_000,
            rate_limit: RateLimitPolicy::default(),
            scheduler: SchedulerConfig::default(),
            channels: default_channel_configs(),
        }
    }
}

impl GatewayConfig {
    /// Settings for a channel, falling back to built-in defaults for
    /// channels absent from the config file.
    pub fn channel(&self, channel: ChannelType) -> ChannelConfig {
        self.channels.get(&channel).cloned().unwrap_or_default()
    }

    /// Check every per-channel bucket shape. Reports the first offending
    /// channel.
    pub fn validate(&self) -> Result<(), String> {
        for (channel, settings) in &self.channels {
            settings
                .bucket
                .validate()
                .map_err(|reason| format!("channels.{channel}.bucket: {reason}"))?;
        }
        Ok(())
    }
}

/// Built-in per-channel limits, sized to the platforms' published API rates.
pub fn default_channel_configs() -> HashMap<ChannelType, ChannelConfig> {
    let bucket = |b: BucketConfig| ChannelConfig {
        retry: RetryConfig::default(),
        bucket: b,
    };
    HashMap::from([
        (
            ChannelType::Telegram,
            bucket(BucketConfig::new(30.0, 1.0).with_cooldown(35, 3)),
        ),
        (
            ChannelType::Whatsapp,
            bucket(BucketConfig::new(80.0, 2.0).with_cooldown(50, 3)),
        ),
        (
            ChannelType::Discord,
            bucket(BucketConfig::new(5.0, 0.2).with_cooldown(500, 3)),
        ),
        (
            ChannelType::Slack,
            bucket(BucketConfig::new(1.0, 1.0).with_cooldown(1_000, 3)),
        ),
        (
            ChannelType::Email,
            bucket(BucketConfig::new(10.0, 0.5).with_cooldown(200, 3)),
        ),
        (
            ChannelType::Webhook,
            bucket(BucketConfig::new(100.0, 10.0).with_cooldown(10, 3)),
        ),
    ])
}
