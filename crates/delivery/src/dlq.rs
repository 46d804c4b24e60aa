//! Dead letter queue: messages whose delivery exhausted its retry budget or
//! failed permanently.
//!
//! Entries are kept in memory behind a mutex. State transitions happen under
//! the lock, so `begin_retry` doubles as an in-flight claim: two concurrent
//! retries of the same entry cannot both proceed.

use std::{
    fmt,
    sync::{Mutex, MutexGuard},
};

use {
    omnigate_common::{ErrorKind, Message, now_ms},
    serde::{Deserialize, Serialize},
    tracing::info,
};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeadLetterStatus {
    /// Awaiting operator action.
    Pending,
    /// Claimed by an in-flight retry. A successful retry removes the entry;
    /// a failed one returns it to pending with updated failure details.
    Retried,
    /// Operator gave up on this message.
    Discarded,
}

impl fmt::Display for DeadLetterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Retried => "retried",
            Self::Discarded => "discarded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterEntry {
    /// Queue entry id, distinct from the message id.
    pub id: String,
    pub message: Message,
    pub last_error_kind: ErrorKind,
    /// Total delivery attempts made across all retry rounds.
    pub attempt_count: u32,
    pub first_failed_at_ms: u64,
    pub last_failed_at_ms: u64,
    pub status: DeadLetterStatus,
}

#[derive(Default)]
pub struct DeadLetterQueue {
    entries: Mutex<Vec<DeadLetterEntry>>,
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<DeadLetterEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an exhausted or permanently failed message. Returns the new
    /// entry id.
    pub fn push(&self, message: Message, kind: ErrorKind, attempt_count: u32) -> String {
        let now = now_ms();
        let entry = DeadLetterEntry {
            id: uuid::Uuid::new_v4().to_string(),
            message,
            last_error_kind: kind,
            attempt_count,
            first_failed_at_ms: now,
            last_failed_at_ms: now,
            status: DeadLetterStatus::Pending,
        };
        let id = entry.id.clone();
        info!(
            entry_id = %id,
            message_id = %entry.message.id,
            channel = %entry.message.to_channel,
            error_kind = ?kind,
            attempt_count,
            "message dead-lettered"
        );
        self.entries().push(entry);
        id
    }

    /// Entries, newest last, optionally filtered by status.
    pub fn list(&self, status: Option<DeadLetterStatus>) -> Vec<DeadLetterEntry> {
        self.entries()
            .iter()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<DeadLetterEntry> {
        self.entries().iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Remove one entry, or every entry when `id` is `None`. Returns how
    /// many were removed.
    pub fn purge(&self, id: Option<&str>) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        match id {
            Some(id) => entries.retain(|e| e.id != id),
            None => entries.clear(),
        }
        before - entries.len()
    }

    /// Mark a pending entry as discarded.
    pub fn discard(&self, id: &str) -> Result<()> {
        let mut entries = self.entries();
        let entry = find_mut(&mut entries, id)?;
        expect_status(entry, DeadLetterStatus::Pending)?;
        entry.status = DeadLetterStatus::Discarded;
        Ok(())
    }

    /// Claim a pending entry for retry. Flips it to `retried` under the
    /// lock and hands back the message to redeliver.
    pub fn begin_retry(&self, id: &str) -> Result<Message> {
        let mut entries = self.entries();
        let entry = find_mut(&mut entries, id)?;
        expect_status(entry, DeadLetterStatus::Pending)?;
        entry.status = DeadLetterStatus::Retried;
        Ok(entry.message.clone())
    }

    /// Report the outcome of a retry started with [`begin_retry`]. Success
    /// removes the entry; failure returns it to `pending` with the new
    /// attempt sequence's details.
    ///
    /// [`begin_retry`]: Self::begin_retry
    pub fn complete_retry(
        &self,
        id: &str,
        outcome: std::result::Result<(), ErrorKind>,
        attempts: u32,
    ) -> Result<()> {
        let mut entries = self.entries();
        let pos = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::entry_not_found(id))?;
        expect_status(&entries[pos], DeadLetterStatus::Retried)?;
        match outcome {
            Ok(()) => {
                info!(entry_id = %id, "dead letter entry retried successfully");
                entries.remove(pos);
            },
            Err(kind) => {
                let entry = &mut entries[pos];
                entry.last_error_kind = kind;
                entry.attempt_count = attempts;
                entry.last_failed_at_ms = now_ms();
                entry.status = DeadLetterStatus::Pending;
            },
        }
        Ok(())
    }
}

fn find_mut<'a>(
    entries: &'a mut [DeadLetterEntry],
    id: &str,
) -> Result<&'a mut DeadLetterEntry> {
    entries
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| Error::entry_not_found(id))
}

fn expect_status(entry: &DeadLetterEntry, expected: DeadLetterStatus) -> Result<()> {
    if entry.status != expected {
        return Err(Error::InvalidState {
            id: entry.id.clone(),
            status: entry.status.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use omnigate_common::ChannelType;

    use super::*;

    fn sample() -> Message {
        Message::new(ChannelType::Slack, "#ops", "hi")
    }

    #[test]
    fn test_push_and_list() {
        let dlq = DeadLetterQueue::new();
        assert!(dlq.is_empty());
        let id = dlq.push(sample(), ErrorKind::Network, 3);
        assert_eq!(dlq.len(), 1);
        let entry = dlq.get(&id).unwrap();
        assert_eq!(entry.status, DeadLetterStatus::Pending);
        assert_eq!(entry.attempt_count, 3);
        assert_eq!(entry.last_error_kind, ErrorKind::Network);
        assert_eq!(entry.first_failed_at_ms, entry.last_failed_at_ms);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let dlq = DeadLetterQueue::new();
        let a = dlq.push(sample(), ErrorKind::Timeout, 1);
        let b = dlq.push(sample(), ErrorKind::Network, 2);
        let c = dlq.push(sample(), ErrorKind::Server, 3);
        let ids: Vec<String> = dlq.list(None).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_list_filters_by_status() {
        let dlq = DeadLetterQueue::new();
        let a = dlq.push(sample(), ErrorKind::Timeout, 3);
        dlq.push(sample(), ErrorKind::Server, 3);
        dlq.discard(&a).unwrap();
        assert_eq!(dlq.list(None).len(), 2);
        assert_eq!(dlq.list(Some(DeadLetterStatus::Pending)).len(), 1);
        assert_eq!(dlq.list(Some(DeadLetterStatus::Discarded)).len(), 1);
    }

    #[test]
    fn test_purge_one_and_all() {
        let dlq = DeadLetterQueue::new();
        let a = dlq.push(sample(), ErrorKind::Timeout, 1);
        dlq.push(sample(), ErrorKind::Timeout, 1);
        assert_eq!(dlq.purge(Some(&a)), 1);
        assert_eq!(dlq.purge(Some("missing")), 0);
        assert_eq!(dlq.purge(None), 1);
        assert!(dlq.is_empty());
    }

    #[test]
    fn test_discard_requires_pending() {
        let dlq = DeadLetterQueue::new();
        let id = dlq.push(sample(), ErrorKind::Timeout, 1);
        dlq.discard(&id).unwrap();
        assert!(matches!(
            dlq.discard(&id),
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(
            dlq.discard("missing"),
            Err(Error::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_begin_retry_claims_entry() {
        let dlq = DeadLetterQueue::new();
        let id = dlq.push(sample(), ErrorKind::Network, 3);
        let msg = dlq.begin_retry(&id).unwrap();
        assert_eq!(msg.content, "hi");
        // Second claim fails: the entry is already in flight.
        assert!(matches!(
            dlq.begin_retry(&id),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_successful_retry_removes_entry() {
        let dlq = DeadLetterQueue::new();
        let id = dlq.push(sample(), ErrorKind::Network, 3);
        dlq.begin_retry(&id).unwrap();
        dlq.complete_retry(&id, Ok(()), 1).unwrap();
        assert!(dlq.get(&id).is_none());
        assert!(dlq.is_empty());
    }

    #[test]
    fn test_failed_retry_returns_to_pending() {
        let dlq = DeadLetterQueue::new();
        let id = dlq.push(sample(), ErrorKind::Network, 3);
        let first_failed = dlq.get(&id).unwrap().first_failed_at_ms;
        dlq.begin_retry(&id).unwrap();
        dlq.complete_retry(&id, Err(ErrorKind::Timeout), 3).unwrap();
        let entry = dlq.get(&id).unwrap();
        assert_eq!(entry.status, DeadLetterStatus::Pending);
        assert_eq!(entry.last_error_kind, ErrorKind::Timeout);
        // Attempt count reflects the latest attempt sequence.
        assert_eq!(entry.attempt_count, 3);
        assert_eq!(entry.first_failed_at_ms, first_failed);
        // Retryable again.
        assert!(dlq.begin_retry(&id).is_ok());
    }

    #[test]
    fn test_entry_serde() {
        let dlq = DeadLetterQueue::new();
        let id = dlq.push(sample(), ErrorKind::InvalidTarget, 1);
        let entry = dlq.get(&id).unwrap();
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["status"], "pending");
        assert_eq!(v["lastErrorKind"], "invalidTarget");
        let back: DeadLetterEntry = serde_json::from_value(v).unwrap();
        assert_eq!(back, entry);
    }
}
