//! In-memory store for testing.

use std::{collections::HashMap, sync::Mutex};

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
};

use crate::{store::ScheduleStore, types::ScheduleEntry};

/// In-memory store backed by `HashMap`. No persistence — for tests only.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, ScheduleEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn load_entries(&self) -> Result<Vec<ScheduleEntry>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.values().cloned().collect())
    }

    async fn save_entry(&self, entry: &ScheduleEntry) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn update_entry(&self, entry: &ScheduleEntry) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(&entry.id) {
            bail!("schedule entry not found: {}", entry.id);
        }
        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn delete_entry(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.remove(id).is_none() {
            bail!("schedule entry not found: {id}");
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use omnigate_common::{ChannelType, Message};

    use {
        super::*,
        crate::types::{EntryStatus, FirePolicy},
    };

    fn make_entry(id: &str) -> ScheduleEntry {
        ScheduleEntry {
            id: id.into(),
            message: Message::new(ChannelType::Slack, "#ops", "later"),
            policy: FirePolicy::Delay { delay_ms: 100 },
            status: EntryStatus::Pending,
            next_fire_at_ms: Some(2_000),
            fire_count: 0,
            last_fired_at_ms: None,
            created_at_ms: 1_900,
        }
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = InMemoryStore::new();
        store.save_entry(&make_entry("1")).await.unwrap();
        let entries = store.load_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "1");
    }

    #[tokio::test]
    async fn test_update() {
        let store = InMemoryStore::new();
        let mut entry = make_entry("1");
        store.save_entry(&entry).await.unwrap();
        entry.status = EntryStatus::Fired;
        store.update_entry(&entry).await.unwrap();
        assert_eq!(store.load_entries().await.unwrap()[0].status, EntryStatus::Fired);
    }

    #[tokio::test]
    async fn test_update_not_found() {
        let store = InMemoryStore::new();
        assert!(store.update_entry(&make_entry("1")).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        store.save_entry(&make_entry("1")).await.unwrap();
        store.delete_entry("1").await.unwrap();
        assert!(store.load_entries().await.unwrap().is_empty());
        assert!(store.delete_entry("1").await.is_err());
    }
}
