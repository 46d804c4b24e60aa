//! Delivery result sinks: where completed dispatch outcomes go.

use std::sync::Mutex;

use {
    anyhow::Result,
    async_trait::async_trait,
    omnigate_common::SendResult,
    tracing::{info, warn},
};

/// Receives every completed dispatch outcome. Recording is fire-and-forget
/// from the dispatcher's viewpoint; a failing sink never affects delivery.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn record(&self, result: &SendResult) -> Result<()>;
}

/// Sink that logs each outcome through `tracing`.
pub struct LogSink;

#[async_trait]
impl DeliverySink for LogSink {
    async fn record(&self, result: &SendResult) -> Result<()> {
        if result.success {
            info!(
                message_id = %result.message_id,
                channel = %result.channel,
                target = %result.target,
                attempt_count = result.attempt_count,
                latency_ms = result.latency_ms,
                "message delivered"
            );
        } else {
            warn!(
                message_id = %result.message_id,
                channel = %result.channel,
                target = %result.target,
                attempt_count = result.attempt_count,
                error_kind = ?result.error_kind,
                "message not delivered"
            );
        }
        Ok(())
    }
}

/// Sink that keeps every outcome in memory, for tests and inspection.
#[derive(Default)]
pub struct MemorySink {
    results: Mutex<Vec<SendResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<SendResult> {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.results.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

#[async_trait]
impl DeliverySink for MemorySink {
    async fn record(&self, result: &SendResult) -> Result<()> {
        let mut results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        results.push(result.clone());
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use omnigate_common::{ChannelType, ErrorKind, Message};

    use super::*;

    #[tokio::test]
    async fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        let msg = Message::new(ChannelType::Slack, "#ops", "hi");
        sink.record(&SendResult::ok(&msg, 1, 5)).await.unwrap();
        sink.record(&SendResult::failed(&msg, ErrorKind::Timeout, 3, 90))
            .await
            .unwrap();

        let results = sink.results();
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[1].error_kind, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_log_sink_is_infallible() {
        let msg = Message::new(ChannelType::Email, "a@b.c", "hi");
        assert!(LogSink.record(&SendResult::ok(&msg, 1, 1)).await.is_ok());
    }
}
