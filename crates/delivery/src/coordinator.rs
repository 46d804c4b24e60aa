//! Retry coordination: runs the attempt sequence for one resolved message,
//! applying per-channel backoff, and dead-letters what cannot be delivered.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    omnigate_channels::ChannelAdapter,
    omnigate_common::{ChannelType, ErrorKind, Message, SendResult},
    omnigate_config::{GatewayConfig, RetryConfig},
    omnigate_routing::RoutedMessage,
    rand::Rng,
    tracing::{debug, info, warn},
};

use crate::{Result, dlq::DeadLetterQueue};

/// Attempt budget and backoff shape for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `attempt` failed: exponential from
    /// the base, capped, with optional +/-50% jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let raw = self.base_delay_ms.saturating_mul(1u64 << exp);
        let mut delay = raw.min(self.max_delay_ms);
        if self.jitter {
            let factor = rand::rng().random_range(0.5..1.5);
            delay = ((delay as f64) * factor) as u64;
            delay = delay.min(self.max_delay_ms);
        }
        Duration::from_millis(delay)
    }
}

/// Drives delivery attempts for resolved messages. One instance serves the
/// whole gateway; all state lives in the shared [`DeadLetterQueue`].
pub struct RetryCoordinator {
    policies: HashMap<ChannelType, RetryPolicy>,
    dispatch_timeout: Duration,
    default_policy: RetryPolicy,
    dlq: Arc<DeadLetterQueue>,
}

impl RetryCoordinator {
    pub fn from_config(config: &GatewayConfig, dlq: Arc<DeadLetterQueue>) -> Self {
        let policies = config
            .channels
            .iter()
            .map(|(channel, settings)| (*channel, RetryPolicy::from(&settings.retry)))
            .collect();
        Self {
            policies,
            dispatch_timeout: Duration::from_millis(config.dispatch_timeout_ms),
            default_policy: RetryPolicy::from(&RetryConfig::default()),
            dlq,
        }
    }

    pub fn dlq(&self) -> &Arc<DeadLetterQueue> {
        &self.dlq
    }

    fn policy(&self, channel: ChannelType) -> &RetryPolicy {
        self.policies.get(&channel).unwrap_or(&self.default_policy)
    }

    /// Deliver a routed message, retrying transient failures per the
    /// channel's policy. Exhausted or permanently failed messages are
    /// dead-lettered before the failed result is returned.
    pub async fn deliver(
        &self,
        routed: &RoutedMessage,
        adapter: &dyn ChannelAdapter,
    ) -> SendResult {
        let result = self.run_attempts(&routed.message, adapter).await;
        if !result.success {
            let kind = result.error_kind.unwrap_or(ErrorKind::Unknown);
            self.dlq
                .push(routed.message.clone(), kind, result.attempt_count);
        }
        result
    }

    /// Re-deliver a dead-lettered message by queue entry id. The entry is
    /// claimed up front; a failed retry returns it to pending with the new
    /// failure recorded.
    pub async fn retry_dead_letter(
        &self,
        entry_id: &str,
        adapter: &dyn ChannelAdapter,
    ) -> Result<SendResult> {
        let message = self.dlq.begin_retry(entry_id)?;
        info!(entry_id, message_id = %message.id, "retrying dead-lettered message");
        let result = self.run_attempts(&message, adapter).await;
        let outcome = match result.error_kind {
            None => Ok(()),
            Some(kind) => Err(kind),
        };
        self.dlq
            .complete_retry(entry_id, outcome, result.attempt_count)?;
        Ok(result)
    }

    async fn run_attempts(&self, message: &Message, adapter: &dyn ChannelAdapter) -> SendResult {
        let policy = self.policy(message.to_channel);
        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let send = adapter.send(&message.target, &message.content, &message.metadata);
            let kind = match tokio::time::timeout(self.dispatch_timeout, send).await {
                Err(_) => ErrorKind::Timeout,
                Ok(Err(err)) => {
                    warn!(
                        message_id = %message.id,
                        channel = %message.to_channel,
                        error = %err,
                        "adapter error"
                    );
                    ErrorKind::Unknown
                },
                Ok(Ok(response)) if response.success => {
                    let latency = started.elapsed().as_millis() as u64;
                    if attempt > 1 {
                        info!(
                            message_id = %message.id,
                            channel = %message.to_channel,
                            attempt,
                            "delivered after retry"
                        );
                    }
                    return SendResult::ok(message, attempt, latency);
                },
                Ok(Ok(response)) => response.error_kind.unwrap_or(ErrorKind::Unknown),
            };

            if kind.is_permanent() || attempt >= policy.max_retries {
                let latency = started.elapsed().as_millis() as u64;
                warn!(
                    message_id = %message.id,
                    channel = %message.to_channel,
                    error_kind = ?kind,
                    attempt,
                    "delivery failed"
                );
                return SendResult::failed(message, kind, attempt, latency);
            }

            let delay = policy.backoff_delay(attempt);
            debug!(
                message_id = %message.id,
                error_kind = ?kind,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "transient failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
