use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use {
    dashmap::DashMap,
    omnigate_common::ChannelType,
    omnigate_config::{BucketConfig, GatewayConfig},
    tracing::debug,
};

use crate::bucket::TokenBucket;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    channel: ChannelType,
    /// `None` for the channel-level bucket, `Some` for channel+target.
    target: Option<String>,
}

/// Multi-bucket rate limiter: one bucket per channel, plus an optional
/// finer-grained bucket per (channel, target). A check must pass both levels.
///
/// Buckets are created on first use from the per-channel config. All state
/// for a bucket is mutated under its map entry, so callers contending on
/// different keys never serialize against each other.
pub struct RateLimiter {
    limits: HashMap<ChannelType, BucketConfig>,
    default_config: BucketConfig,
    buckets: DashMap<BucketKey, TokenBucket>,
}

impl RateLimiter {
    pub fn new(limits: HashMap<ChannelType, BucketConfig>) -> Self {
        Self {
            limits,
            default_config: BucketConfig::default(),
            buckets: DashMap::new(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let limits = config
            .channels
            .iter()
            .map(|(channel, settings)| (*channel, settings.bucket.clone()))
            .collect();
        Self::new(limits)
    }

    fn config_for(&self, channel: ChannelType) -> BucketConfig {
        self.limits
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }

    /// Admit or deny one send. Consumes one token from the channel bucket
    /// and, when a target is given, one from the channel+target bucket.
    pub fn check(&self, channel: ChannelType, target: Option<&str>) -> bool {
        self.check_at(channel, target, Instant::now())
    }

    pub fn check_at(&self, channel: ChannelType, target: Option<&str>, now: Instant) -> bool {
        if !self.consume(channel, None, now) {
            debug!(%channel, "rate limit denied at channel level");
            return false;
        }
        if let Some(target) = target
            && !self.consume(channel, Some(target), now)
        {
            debug!(%channel, target, "rate limit denied at target level");
            return false;
        }
        true
    }

    fn consume(&self, channel: ChannelType, target: Option<&str>, now: Instant) -> bool {
        let key = BucketKey {
            channel,
            target: target.map(str::to_string),
        };
        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new_at(self.config_for(channel), now));
        bucket.try_consume_at(now)
    }

    /// Estimated wait until the channel-level bucket admits one send.
    pub fn estimated_wait(&self, channel: ChannelType) -> Duration {
        self.estimated_wait_at(channel, Instant::now())
    }

    pub fn estimated_wait_at(&self, channel: ChannelType, now: Instant) -> Duration {
        let key = BucketKey {
            channel,
            target: None,
        };
        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new_at(self.config_for(channel), now));
        bucket.wait_time_at(now)
    }

    /// Drop bucket state for one channel (including its target buckets), or
    /// for everything.
    pub fn reset(&self, channel: Option<ChannelType>) {
        match channel {
            Some(channel) => self.buckets.retain(|key, _| key.channel != channel),
            None => self.buckets.clear(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn limiter_with(channel: ChannelType, config: BucketConfig) -> RateLimiter {
        RateLimiter::new(HashMap::from([(channel, config)]))
    }

    #[test]
    fn test_capacity_two_refill_one() {
        let limiter = limiter_with(ChannelType::Slack, BucketConfig::new(2.0, 1.0));
        let now = Instant::now();

        assert!(limiter.check_at(ChannelType::Slack, None, now));
        assert!(limiter.check_at(ChannelType::Slack, None, now));
        assert!(!limiter.check_at(ChannelType::Slack, None, now));
        assert!(limiter.check_at(ChannelType::Slack, None, now + Duration::from_secs(1)));
    }

    #[test]
    fn test_channels_are_independent() {
        let limiter = RateLimiter::new(HashMap::from([
            (ChannelType::Slack, BucketConfig::new(1.0, 1.0)),
            (ChannelType::Email, BucketConfig::new(1.0, 1.0)),
        ]));
        let now = Instant::now();

        assert!(limiter.check_at(ChannelType::Slack, None, now));
        assert!(!limiter.check_at(ChannelType::Slack, None, now));
        // Slack exhaustion does not affect email.
        assert!(limiter.check_at(ChannelType::Email, None, now));
    }

    #[test]
    fn test_target_level_bucket() {
        let limiter = limiter_with(ChannelType::Telegram, BucketConfig::new(10.0, 1.0));
        let now = Instant::now();

        // Both targets draw from the same channel bucket but have their own
        // target buckets.
        assert!(limiter.check_at(ChannelType::Telegram, Some("chat-a"), now));
        assert!(limiter.check_at(ChannelType::Telegram, Some("chat-b"), now));
    }

    #[test]
    fn test_estimated_wait_drained() {
        let limiter = limiter_with(ChannelType::Discord, BucketConfig::new(1.0, 2.0));
        let now = Instant::now();
        assert_eq!(limiter.estimated_wait_at(ChannelType::Discord, now), Duration::ZERO);

        assert!(limiter.check_at(ChannelType::Discord, None, now));
        let wait = limiter.estimated_wait_at(ChannelType::Discord, now);
        assert!(wait > Duration::ZERO && wait <= Duration::from_millis(500));
    }

    #[test]
    fn test_reset_single_channel() {
        let limiter = RateLimiter::new(HashMap::from([
            (ChannelType::Slack, BucketConfig::new(1.0, 0.0)),
            (ChannelType::Email, BucketConfig::new(1.0, 0.0)),
        ]));
        let now = Instant::now();

        assert!(limiter.check_at(ChannelType::Slack, None, now));
        assert!(limiter.check_at(ChannelType::Email, None, now));
        assert!(!limiter.check_at(ChannelType::Slack, None, now));

        limiter.reset(Some(ChannelType::Slack));
        // Slack bucket is fresh; email is still drained.
        assert!(limiter.check_at(ChannelType::Slack, None, now));
        assert!(!limiter.check_at(ChannelType::Email, None, now));
    }

    #[rstest]
    #[case(ChannelType::Slack, 1)]
    #[case(ChannelType::Discord, 5)]
    #[case(ChannelType::Telegram, 30)]
    fn test_default_config_capacities(#[case] channel: ChannelType, #[case] capacity: usize) {
        let limiter = RateLimiter::from_config(&GatewayConfig::default());
        let now = Instant::now();
        for _ in 0..capacity {
            assert!(limiter.check_at(channel, None, now));
        }
        assert!(!limiter.check_at(channel, None, now));
    }

    #[test]
    fn test_unknown_channel_uses_default_bucket() {
        let limiter = RateLimiter::new(HashMap::new());
        let now = Instant::now();
        // Default bucket has capacity 30.
        for _ in 0..30 {
            assert!(limiter.check_at(ChannelType::Webhook, None, now));
        }
        assert!(!limiter.check_at(ChannelType::Webhook, None, now));
    }
}
