use std::time::{Duration, Instant};

use omnigate_config::BucketConfig;

/// A single token bucket. Refills lazily, caps at `capacity`, and can enter
/// a cooldown after a streak of consecutive denials.
#[derive(Debug)]
pub struct TokenBucket {
    config: BucketConfig,
    tokens: f64,
    last_refill: Instant,
    cooldown_until: Option<Instant>,
    denials: u32,
}

impl TokenBucket {
    pub fn new(config: BucketConfig) -> Self {
        Self::new_at(config, Instant::now())
    }

    pub fn new_at(config: BucketConfig, now: Instant) -> Self {
        Self {
            tokens: config.capacity,
            config,
            last_refill: now,
            cooldown_until: None,
            denials: 0,
        }
    }

    fn refill_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        // A refill must never drain: 0 <= tokens <= capacity holds even for
        // a malformed negative rate that slipped past config validation.
        let rate = self.config.refill_rate.max(0.0);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate)
            .clamp(0.0, self.config.capacity.max(0.0));
        self.last_refill = now;
    }

    /// Try to consume one token. An unexpired cooldown denies unconditionally.
    pub fn try_consume_at(&mut self, now: Instant) -> bool {
        self.refill_at(now);

        if let Some(until) = self.cooldown_until {
            if now < until {
                return false;
            }
            // Cooldown expired; the streak restarts.
            self.cooldown_until = None;
            self.denials = 0;
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            self.denials = 0;
            return true;
        }

        self.denials += 1;
        if let Some(cooldown_ms) = self.config.cooldown_ms
            && self.denials >= self.config.denial_streak
        {
            self.cooldown_until = Some(now + Duration::from_millis(cooldown_ms));
        }
        false
    }

    /// Estimated wait until one token is available: the larger of the token
    /// deficit wait and any remaining cooldown.
    pub fn wait_time_at(&mut self, now: Instant) -> Duration {
        self.refill_at(now);

        let token_wait = if self.tokens >= 1.0 {
            Duration::ZERO
        } else if self.config.refill_rate > 0.0 {
            Duration::from_secs_f64((1.0 - self.tokens) / self.config.refill_rate)
        } else {
            Duration::MAX
        };

        let cooldown_wait = self
            .cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default();

        token_wait.max(cooldown_wait)
    }

    /// Currently available tokens, post-refill.
    pub fn available_at(&mut self, now: Instant) -> f64 {
        self.refill_at(now);
        self.tokens
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn config(capacity: f64, refill_rate: f64) -> BucketConfig {
        BucketConfig {
            capacity,
            refill_rate,
            cooldown_ms: None,
            denial_streak: 3,
        }
    }

    #[test]
    fn test_consume_until_empty_then_refill() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new_at(config(2.0, 1.0), now);

        assert!(bucket.try_consume_at(now));
        assert!(bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now));
        assert!(bucket.try_consume_at(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_tokens_never_exceed_capacity() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new_at(config(5.0, 100.0), now);
        // A long idle period must not overfill the bucket.
        let tokens = bucket.available_at(now + Duration::from_secs(3600));
        assert!(tokens <= 5.0);
        assert!(tokens >= 0.0);
    }

    #[test]
    fn test_tokens_never_negative() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new_at(config(1.0, 0.5), now);
        for _ in 0..10 {
            bucket.try_consume_at(now);
        }
        assert!(bucket.available_at(now) >= 0.0);
    }

    #[test]
    fn test_negative_refill_rate_never_drains() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new_at(config(2.0, -1.0), now);

        // The initial two tokens are still consumable.
        assert!(bucket.try_consume_at(now));
        assert!(bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now));

        // Elapsed time with a negative rate must not push tokens below zero.
        let tokens = bucket.available_at(now + Duration::from_secs(10));
        assert!((0.0..=2.0).contains(&tokens), "tokens out of bounds: {tokens}");
    }

    #[test]
    fn test_bounds_hold_across_mixed_sequence() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(config(3.0, 2.0), start);
        let mut now = start;
        for step in 0..200 {
            now += Duration::from_millis(97 * (step % 5));
            bucket.try_consume_at(now);
            let tokens = bucket.available_at(now);
            assert!((0.0..=3.0).contains(&tokens), "tokens out of bounds: {tokens}");
        }
    }

    #[test]
    fn test_denial_streak_triggers_cooldown() {
        let now = Instant::now();
        let cfg = config(1.0, 1.0).with_cooldown(5_000, 2);
        let mut bucket = TokenBucket::new_at(cfg, now);

        assert!(bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now)); // denial 1
        assert!(!bucket.try_consume_at(now)); // denial 2 — cooldown engages

        // Tokens have refilled, but the cooldown still denies.
        let later = now + Duration::from_secs(2);
        assert!(!bucket.try_consume_at(later));

        // After the cooldown expires, admission resumes.
        let after = now + Duration::from_secs(6);
        assert!(bucket.try_consume_at(after));
    }

    #[test]
    fn test_wait_time_token_deficit() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new_at(config(1.0, 2.0), now);
        assert_eq!(bucket.wait_time_at(now), Duration::ZERO);
        assert!(bucket.try_consume_at(now));
        // Deficit of one token at 2 tokens/sec -> 0.5s.
        let wait = bucket.wait_time_at(now);
        assert!(wait > Duration::from_millis(400) && wait <= Duration::from_millis(500));
    }

    #[test]
    fn test_wait_time_includes_cooldown() {
        let now = Instant::now();
        let cfg = config(1.0, 10.0).with_cooldown(3_000, 1);
        let mut bucket = TokenBucket::new_at(cfg, now);
        assert!(bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now)); // cooldown engages immediately

        // Token deficit clears in 0.1s but the cooldown dominates.
        let wait = bucket.wait_time_at(now);
        assert_eq!(wait, Duration::from_secs(3));
    }

    #[test]
    fn test_zero_refill_rate_waits_forever() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new_at(config(1.0, 0.0), now);
        assert!(bucket.try_consume_at(now));
        assert_eq!(bucket.wait_time_at(now), Duration::MAX);
    }
}
