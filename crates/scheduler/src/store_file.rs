//! JSON file-backed schedule store with atomic writes.

use std::path::PathBuf;

use {
    anyhow::{Context, Result, anyhow, bail},
    async_trait::async_trait,
    tokio::fs,
};

use crate::{store::ScheduleStore, types::ScheduleEntry};

/// File-backed store. All entries live in one JSON file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn atomic_write(&self, entries: &[ScheduleEntry]) -> Result<()> {
        self.ensure_dir().await?;
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, json.as_bytes()).await?;

        // Backup existing file.
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::rename(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for FileStore {
    async fn load_entries(&self) -> Result<Vec<ScheduleEntry>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        let entries: Vec<ScheduleEntry> =
            serde_json::from_str(&data).context("failed to parse schedules.json")?;
        Ok(entries)
    }

    async fn save_entry(&self, entry: &ScheduleEntry) -> Result<()> {
        let mut entries = self.load_entries().await?;
        // Replace existing or append.
        if let Some(pos) = entries.iter().position(|e| e.id == entry.id) {
            entries[pos] = entry.clone();
        } else {
            entries.push(entry.clone());
        }
        self.atomic_write(&entries).await
    }

    async fn update_entry(&self, entry: &ScheduleEntry) -> Result<()> {
        let mut entries = self.load_entries().await?;
        let pos = entries
            .iter()
            .position(|e| e.id == entry.id)
            .ok_or_else(|| anyhow!("schedule entry not found: {}", entry.id))?;
        entries[pos] = entry.clone();
        self.atomic_write(&entries).await
    }

    async fn delete_entry(&self, id: &str) -> Result<()> {
        let mut entries = self.load_entries().await?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            bail!("schedule entry not found: {id}");
        }
        self.atomic_write(&entries).await
    }
}
