use {
    omnigate_common::{ChannelType, Message},
    tracing::debug,
};

use crate::{
    Error, Result,
    rule::{RouteCandidate, RoutingRule},
};

/// A message resolved to a concrete channel and target, ready for dispatch.
/// `message` carries the post-transform content/target under the same id.
#[derive(Debug, Clone)]
pub struct RoutedMessage {
    pub message: Message,
    pub channel: ChannelType,
    pub target: String,
}

impl RoutedMessage {
    /// Reconstruct from an already-resolved message (e.g. a DLQ entry).
    pub fn from_resolved(message: Message) -> Self {
        Self {
            channel: message.to_channel,
            target: message.target.clone(),
            message,
        }
    }
}

/// Ordered rule set. Rules are added at startup; `route` never mutates.
#[derive(Default)]
pub struct RoutingEngine {
    rules: Vec<RoutingRule>,
}

impl RoutingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, keeping ascending priority order. Equal priorities
    /// keep declaration order.
    pub fn add_rule(&mut self, rule: RoutingRule) {
        debug!(rule = %rule.name, priority = rule.priority, "added routing rule");
        self.rules.push(rule);
        // Stable sort: insertion order survives within a priority class.
        self.rules.sort_by_key(|r| r.priority);
    }

    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name != name);
        self.rules.len() < before
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Resolve a message to a (channel, target, content) tuple by folding
    /// every matching rule's transform in priority order. A terminal rule
    /// stops evaluation; no match leaves the message's own destination
    /// untouched.
    pub fn route(&self, message: &Message) -> Result<RoutedMessage> {
        let mut candidate = RouteCandidate::from_message(message);

        for rule in &self.rules {
            if !rule.predicate.matches(&candidate, message) {
                continue;
            }
            debug!(message_id = %message.id, rule = %rule.name, "rule matched");
            if let Some(channel) = rule.channel {
                candidate.channel = channel;
            }
            if let Some(transform) = &rule.transform {
                candidate = transform(candidate);
            }
            if rule.terminal {
                break;
            }
        }

        if candidate.target.is_empty() {
            return Err(Error::no_channel_resolved(&message.id));
        }

        let resolved = message
            .with_to_channel(candidate.channel)
            .with_target(&candidate.target)
            .with_content(&candidate.content);

        Ok(RoutedMessage {
            channel: candidate.channel,
            target: candidate.target,
            message: resolved,
        })
    }
}
