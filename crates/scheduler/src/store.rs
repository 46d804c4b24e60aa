//! Persistence trait for schedule entries.

use {anyhow::Result, async_trait::async_trait};

use crate::types::ScheduleEntry;

/// Persistence backend for schedule entries.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn load_entries(&self) -> Result<Vec<ScheduleEntry>>;
    async fn save_entry(&self, entry: &ScheduleEntry) -> Result<()>;
    async fn update_entry(&self, entry: &ScheduleEntry) -> Result<()>;
    async fn delete_entry(&self, id: &str) -> Result<()>;
}
