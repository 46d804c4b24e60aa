use std::{fmt, sync::Arc};

use {
    omnigate_common::{ChannelType, Message},
    regex::Regex,
};

use crate::{Error, Result};

/// The mutable part of a route while rules fold over it: destination
/// channel, target address, and content.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    pub channel: ChannelType,
    pub target: String,
    pub content: String,
}

impl RouteCandidate {
    pub fn from_message(message: &Message) -> Self {
        Self {
            channel: message.to_channel,
            target: message.target.clone(),
            content: message.content.clone(),
        }
    }
}

/// Pure transform applied by a matching rule. Receives the current candidate
/// and returns the next one.
pub type TransformFn = Arc<dyn Fn(RouteCandidate) -> RouteCandidate + Send + Sync>;

/// Conjunction of match conditions; every condition that is set must hold.
/// An empty predicate matches everything.
#[derive(Default, Clone)]
pub struct RulePredicate {
    channel: Option<ChannelType>,
    metadata: Vec<(String, String)>,
    content_pattern: Option<Regex>,
}

impl RulePredicate {
    pub fn any() -> Self {
        Self::default()
    }

    /// Match messages destined for `channel`.
    #[must_use]
    pub fn for_channel(mut self, channel: ChannelType) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Match messages whose metadata contains `key` = `value`.
    #[must_use]
    pub fn metadata_eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Match messages whose content matches the regex `pattern`.
    pub fn content_matches(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.content_pattern = Some(regex);
        Ok(self)
    }

    /// Evaluate against the evolving candidate and the message's immutable
    /// metadata.
    pub fn matches(&self, candidate: &RouteCandidate, message: &Message) -> bool {
        if let Some(channel) = self.channel
            && candidate.channel != channel
        {
            return false;
        }
        for (key, value) in &self.metadata {
            if message.metadata.get(key) != Some(value) {
                return false;
            }
        }
        if let Some(pattern) = &self.content_pattern
            && !pattern.is_match(&candidate.content)
        {
            return false;
        }
        true
    }
}

impl fmt::Debug for RulePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulePredicate")
            .field("channel", &self.channel)
            .field("metadata", &self.metadata)
            .field(
                "content_pattern",
                &self.content_pattern.as_ref().map(Regex::as_str),
            )
            .finish()
    }
}

/// One routing rule: predicate, priority, optional channel override,
/// optional transform, terminal flag.
#[derive(Clone)]
pub struct RoutingRule {
    pub name: String,
    pub predicate: RulePredicate,
    /// Lower values are evaluated first; ties break by declaration order.
    pub priority: i32,
    /// Redirect matching messages to this channel.
    pub channel: Option<ChannelType>,
    pub transform: Option<TransformFn>,
    /// Stop evaluating further rules once this one matched.
    pub terminal: bool,
}

impl RoutingRule {
    pub fn new(name: impl Into<String>, predicate: RulePredicate) -> Self {
        Self {
            name: name.into(),
            predicate,
            priority: 0,
            channel: None,
            transform: None,
            terminal: false,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn redirect_to(mut self, channel: ChannelType) -> Self {
        self.channel = Some(channel);
        self
    }

    #[must_use]
    pub fn with_transform(
        mut self,
        transform: impl Fn(RouteCandidate) -> RouteCandidate + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    #[must_use]
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }
}

impl fmt::Debug for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingRule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("channel", &self.channel)
            .field("terminal", &self.terminal)
            .field("has_transform", &self.transform.is_some())
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message::new(ChannelType::Email, "user@x.com", "alert: disk full")
            .with_metadata("priority", "high")
    }

    #[test]
    fn test_empty_predicate_matches_all() {
        let msg = message();
        let candidate = RouteCandidate::from_message(&msg);
        assert!(RulePredicate::any().matches(&candidate, &msg));
    }

    #[test]
    fn test_channel_predicate() {
        let msg = message();
        let candidate = RouteCandidate::from_message(&msg);
        assert!(
            RulePredicate::any()
                .for_channel(ChannelType::Email)
                .matches(&candidate, &msg)
        );
        assert!(
            !RulePredicate::any()
                .for_channel(ChannelType::Slack)
                .matches(&candidate, &msg)
        );
    }

    #[test]
    fn test_metadata_predicate() {
        let msg = message();
        let candidate = RouteCandidate::from_message(&msg);
        assert!(
            RulePredicate::any()
                .metadata_eq("priority", "high")
                .matches(&candidate, &msg)
        );
        assert!(
            !RulePredicate::any()
                .metadata_eq("priority", "low")
                .matches(&candidate, &msg)
        );
        assert!(
            !RulePredicate::any()
                .metadata_eq("missing", "x")
                .matches(&candidate, &msg)
        );
    }

    #[test]
    fn test_content_predicate() {
        let msg = message();
        let candidate = RouteCandidate::from_message(&msg);
        assert!(
            RulePredicate::any()
                .content_matches("^alert:")
                .unwrap()
                .matches(&candidate, &msg)
        );
        assert!(
            !RulePredicate::any()
                .content_matches("heartbeat")
                .unwrap()
                .matches(&candidate, &msg)
        );
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(matches!(
            RulePredicate::any().content_matches("(unclosed"),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_conjunction() {
        let msg = message();
        let candidate = RouteCandidate::from_message(&msg);
        let predicate = RulePredicate::any()
            .for_channel(ChannelType::Email)
            .metadata_eq("priority", "high")
            .content_matches("alert")
            .unwrap();
        assert!(predicate.matches(&candidate, &msg));

        let wrong_channel = predicate.clone().for_channel(ChannelType::Slack);
        assert!(!wrong_channel.matches(&candidate, &msg));
    }
}
