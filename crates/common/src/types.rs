//! Core data types shared by every stage of the dispatch pipeline.

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A target messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Telegram,
    Whatsapp,
    Discord,
    Slack,
    Email,
    Webhook,
}

impl ChannelType {
    /// All supported channels, in declaration order.
    pub const ALL: [ChannelType; 6] = [
        Self::Telegram,
        Self::Whatsapp,
        Self::Discord,
        Self::Slack,
        Self::Email,
        Self::Webhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Whatsapp => "whatsapp",
            Self::Discord => "discord",
            Self::Slack => "slack",
            Self::Email => "email",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telegram" => Ok(Self::Telegram),
            "whatsapp" => Ok(Self::Whatsapp),
            "discord" => Ok(Self::Discord),
            "slack" => Ok(Self::Slack),
            "email" => Ok(Self::Email),
            "webhook" => Ok(Self::Webhook),
            other => Err(crate::Error::unknown_channel(other)),
        }
    }
}

/// An outbound message. Immutable once created — transforms produce a new
/// derived message via the `with_*` builders, keeping the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_channel: Option<ChannelType>,
    pub to_channel: ChannelType,
    /// Channel-specific address (chat id / phone / email / webhook url).
    pub target: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    pub created_at_ms: u64,
}

impl Message {
    pub fn new(
        to_channel: ChannelType,
        target: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from_channel: None,
            to_channel,
            target: target.into(),
            content: content.into(),
            metadata: HashMap::new(),
            created_at_ms: now_ms(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_from_channel(mut self, from: ChannelType) -> Self {
        self.from_channel = Some(from);
        self
    }

    /// Derived copy with new content. Same id — still the same logical send.
    #[must_use]
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        let mut msg = self.clone();
        msg.content = content.into();
        msg
    }

    /// Derived copy with a new target. Same id.
    #[must_use]
    pub fn with_target(&self, target: impl Into<String>) -> Self {
        let mut msg = self.clone();
        msg.target = target.into();
        msg
    }

    /// Derived copy with a new destination channel. Same id.
    #[must_use]
    pub fn with_to_channel(&self, to_channel: ChannelType) -> Self {
        let mut msg = self.clone();
        msg.to_channel = to_channel;
        msg
    }

    /// A fresh logical send request carrying the same payload: new id, new
    /// `created_at_ms`. Used for recurring schedule fires and per-target
    /// broadcast copies — ids are never reused across sends.
    #[must_use]
    pub fn renewed(&self) -> Self {
        let mut msg = self.clone();
        msg.id = uuid::Uuid::new_v4().to_string();
        msg.created_at_ms = now_ms();
        msg
    }
}

/// Classified delivery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Attempt exceeded the dispatch timeout.
    Timeout,
    /// Network-level failure reaching the platform.
    Network,
    /// Platform returned a 5xx-class error.
    Server,
    /// Platform reported rate limiting, or the local limiter denied.
    RateLimited,
    /// Target address is invalid for the channel.
    InvalidTarget,
    /// Credentials rejected by the platform.
    InvalidCredentials,
    /// Platform rejected the request (4xx, non-retryable).
    Rejected,
    /// No routing rule or default resolved a channel/target.
    NoChannelResolved,
    /// Unclassified adapter fault. Treated as transient so nothing is
    /// silently dropped.
    Unknown,
}

impl ErrorKind {
    /// Transient failures are retried per backoff policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Network | Self::Server | Self::RateLimited | Self::Unknown
        )
    }

    /// Permanent failures skip retries and go straight to the DLQ.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget | Self::InvalidCredentials | Self::Rejected
        )
    }
}

/// Outcome of one completed dispatch attempt sequence (not one low-level
/// attempt).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub success: bool,
    pub message_id: String,
    pub channel: ChannelType,
    pub target: String,
    pub attempt_count: u32,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub timestamp_ms: u64,
}

impl SendResult {
    pub fn ok(message: &Message, attempt_count: u32, latency_ms: u64) -> Self {
        Self {
            success: true,
            message_id: message.id.clone(),
            channel: message.to_channel,
            target: message.target.clone(),
            attempt_count,
            latency_ms,
            error_kind: None,
            timestamp_ms: now_ms(),
        }
    }

    pub fn failed(
        message: &Message,
        kind: ErrorKind,
        attempt_count: u32,
        latency_ms: u64,
    ) -> Self {
        Self {
            success: false,
            message_id: message.id.clone(),
            channel: message.to_channel,
            target: message.target.clone(),
            attempt_count,
            latency_ms,
            error_kind: Some(kind),
            timestamp_ms: now_ms(),
        }
    }
}
