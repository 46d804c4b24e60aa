//! Schedule entry types and fire-time arithmetic.

use {
    omnigate_common::Message,
    serde::{Deserialize, Serialize},
};

use crate::{Error, Result};

/// When a scheduled message fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FirePolicy {
    /// Fire once, `delay_ms` after scheduling.
    Delay { delay_ms: u64 },
    /// Fire once at an absolute epoch-ms instant. An instant already in the
    /// past fires immediately, once.
    At { at_ms: u64 },
    /// Fire repeatedly every `every_ms`, starting with the next poll, until
    /// cancelled.
    Every { every_ms: u64 },
}

impl FirePolicy {
    /// First fire time for an entry scheduled at `now`. Rejects zero-length
    /// recurring intervals.
    pub fn initial_fire_at(&self, now: u64) -> Result<u64> {
        match self {
            Self::Delay { delay_ms } => Ok(now.saturating_add(*delay_ms)),
            Self::At { at_ms } => Ok(*at_ms),
            Self::Every { every_ms } => {
                if *every_ms == 0 {
                    return Err(Error::invalid_policy("everyMs must be > 0"));
                }
                Ok(now)
            },
        }
    }

    /// Fire time after a fire at `now`. `None` for one-shot policies.
    pub fn next_fire_after(&self, now: u64) -> Option<u64> {
        match self {
            Self::Every { every_ms } => Some(now.saturating_add(*every_ms)),
            Self::Delay { .. } | Self::At { .. } => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Self::Every { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryStatus {
    Pending,
    /// One-shot entry that has fired.
    Fired,
    Cancelled,
}

/// One scheduled message, persisted across restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    pub message: Message,
    pub policy: FirePolicy,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_at_ms: Option<u64>,
    pub fire_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fired_at_ms: Option<u64>,
    pub created_at_ms: u64,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use omnigate_common::ChannelType;

    use super::*;

    #[test]
    fn test_initial_fire_times() {
        assert_eq!(
            FirePolicy::Delay { delay_ms: 500 }.initial_fire_at(1_000).unwrap(),
            1_500
        );
        assert_eq!(
            FirePolicy::At { at_ms: 9_999 }.initial_fire_at(1_000).unwrap(),
            9_999
        );
        // Recurring entries are due on the first poll.
        assert_eq!(
            FirePolicy::Every { every_ms: 100 }.initial_fire_at(1_000).unwrap(),
            1_000
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            FirePolicy::Every { every_ms: 0 }.initial_fire_at(0),
            Err(Error::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn test_next_fire_only_for_recurring() {
        assert_eq!(
            FirePolicy::Every { every_ms: 100 }.next_fire_after(1_000),
            Some(1_100)
        );
        assert_eq!(FirePolicy::Delay { delay_ms: 1 }.next_fire_after(1_000), None);
        assert_eq!(FirePolicy::At { at_ms: 1 }.next_fire_after(1_000), None);
    }

    #[test]
    fn test_policy_serde_tagging() {
        let json = serde_json::to_value(FirePolicy::Every { every_ms: 250 }).unwrap();
        assert_eq!(json["kind"], "every");
        assert_eq!(json["everyMs"], 250);
        let back: FirePolicy = serde_json::from_value(json).unwrap();
        assert_eq!(back, FirePolicy::Every { every_ms: 250 });
    }

    #[test]
    fn test_entry_serde_roundtrip() {
        let entry = ScheduleEntry {
            id: "e1".into(),
            message: Message::new(ChannelType::Slack, "#ops", "later"),
            policy: FirePolicy::Delay { delay_ms: 100 },
            status: EntryStatus::Pending,
            next_fire_at_ms: Some(2_000),
            fire_count: 0,
            last_fired_at_ms: None,
            created_at_ms: 1_900,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: ScheduleEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
