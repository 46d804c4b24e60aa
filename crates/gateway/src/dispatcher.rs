//! Dispatch orchestrator: route, rate-limit, deliver, record.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    futures::future::join_all,
    omnigate_channels::AdapterRegistry,
    omnigate_common::{ChannelType, ErrorKind, Message, SendResult},
    omnigate_config::{GatewayConfig, LimitMode, RateLimitPolicy, SchedulerConfig},
    omnigate_delivery::{DeadLetterQueue, RetryCoordinator},
    omnigate_ratelimit::RateLimiter,
    omnigate_routing::RoutingEngine,
    omnigate_scheduler::{DispatchFn, ScheduleStore, SchedulerService},
    tracing::{debug, warn},
};

use crate::{Error, Result, sink::DeliverySink};

/// Floor for admission-wait sleeps, so a near-zero estimate cannot busy-loop.
const MIN_WAIT_POLL: Duration = Duration::from_millis(5);

/// The dispatch pipeline: route → rate-limit gate → adapter delivery with
/// retry → result recording. One instance serves all channels.
pub struct Dispatcher {
    engine: RoutingEngine,
    limiter: RateLimiter,
    coordinator: RetryCoordinator,
    registry: AdapterRegistry,
    rate_policy: RateLimitPolicy,
    sinks: Vec<Arc<dyn DeliverySink>>,
}

impl Dispatcher {
    pub fn new(config: &GatewayConfig, engine: RoutingEngine, registry: AdapterRegistry) -> Self {
        let dlq = Arc::new(DeadLetterQueue::new());
        Self {
            engine,
            limiter: RateLimiter::from_config(config),
            coordinator: RetryCoordinator::from_config(config, dlq),
            registry,
            rate_policy: config.rate_limit.clone(),
            sinks: Vec::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Arc<dyn DeliverySink>) {
        self.sinks.push(sink);
    }

    pub fn dlq(&self) -> &Arc<DeadLetterQueue> {
        self.coordinator.dlq()
    }

    /// Dispatch one message through the full pipeline. Routing failures and
    /// missing adapters are errors; delivery failures (including rate-limit
    /// denials) come back as unsuccessful [`SendResult`]s.
    pub async fn send(&self, message: Message) -> Result<SendResult> {
        let routed = self.engine.route(&message)?;
        debug!(
            message_id = %routed.message.id,
            channel = %routed.channel,
            target = %routed.target,
            "message routed"
        );

        if !self.admit(routed.channel, &routed.target).await {
            // Denied sends are recorded but never dead-lettered: nothing
            // was attempted.
            let result = SendResult::failed(&routed.message, ErrorKind::RateLimited, 0, 0);
            self.record(&result);
            return Ok(result);
        }

        let adapter = self
            .registry
            .get(routed.channel)
            .ok_or(Error::AdapterMissing {
                channel: routed.channel,
            })?;
        let result = self.coordinator.deliver(&routed, adapter.as_ref()).await;
        self.record(&result);
        Ok(result)
    }

    /// Dispatch one payload to many targets concurrently. Each target gets
    /// its own message (fresh id); results come back aligned with `targets`.
    /// Per-target errors are folded into failed results.
    pub async fn broadcast(&self, message: &Message, targets: &[String]) -> Vec<SendResult> {
        let sends = targets.iter().map(|target| {
            let msg = message.renewed().with_target(target);
            async move {
                match self.send(msg.clone()).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(message_id = %msg.id, target = %msg.target, error = %e, "broadcast target failed");
                        SendResult::failed(&msg, ErrorKind::NoChannelResolved, 0, 0)
                    },
                }
            }
        });
        join_all(sends).await
    }

    /// Re-deliver a dead-lettered message by queue entry id.
    pub async fn retry_dead_letter(&self, entry_id: &str) -> Result<SendResult> {
        let entry = self
            .dlq()
            .get(entry_id)
            .ok_or_else(|| omnigate_delivery::Error::entry_not_found(entry_id))?;
        let channel = entry.message.to_channel;
        let adapter = self
            .registry
            .get(channel)
            .ok_or(Error::AdapterMissing { channel })?;
        let result = self
            .coordinator
            .retry_dead_letter(entry_id, adapter.as_ref())
            .await?;
        self.record(&result);
        Ok(result)
    }

    async fn admit(&self, channel: ChannelType, target: &str) -> bool {
        if self.limiter.check(channel, Some(target)) {
            return true;
        }
        match self.rate_policy.mode {
            LimitMode::FailFast => false,
            LimitMode::Wait => {
                let deadline =
                    Instant::now() + Duration::from_millis(self.rate_policy.max_wait_ms);
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    let wait = self
                        .limiter
                        .estimated_wait(channel)
                        .max(MIN_WAIT_POLL)
                        .min(remaining);
                    tokio::time::sleep(wait).await;
                    if self.limiter.check(channel, Some(target)) {
                        return true;
                    }
                }
            },
        }
    }

    /// Hand the outcome to every sink, fire-and-forget. Sink failures are
    /// logged and never reach the caller.
    fn record(&self, result: &SendResult) {
        for sink in &self.sinks {
            let sink = Arc::clone(sink);
            let result = result.clone();
            tokio::spawn(async move {
                if let Err(e) = sink.record(&result).await {
                    warn!(message_id = %result.message_id, error = %e, "delivery sink failed");
                }
            });
        }
    }
}

/// Build a scheduler whose fired messages go through `dispatcher.send`.
/// The returned service still needs `start()`.
pub fn spawn_scheduler(
    dispatcher: Arc<Dispatcher>,
    store: Arc<dyn ScheduleStore>,
    config: &SchedulerConfig,
) -> Arc<SchedulerService> {
    let dispatch: DispatchFn = Arc::new(move |message| {
        let dispatcher = Arc::clone(&dispatcher);
        Box::pin(async move {
            let message_id = message.id.clone();
            match dispatcher.send(message).await {
                Ok(result) if result.success => {
                    debug!(message_id = %message_id, "scheduled message delivered");
                },
                Ok(result) => {
                    warn!(
                        message_id = %message_id,
                        error_kind = ?result.error_kind,
                        "scheduled message failed"
                    );
                },
                Err(e) => {
                    warn!(message_id = %message_id, error = %e, "scheduled dispatch error");
                },
            }
        })
    });
    SchedulerService::new(store, config, dispatch)
}
