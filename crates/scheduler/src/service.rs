//! Scheduler service: timer loop, due-entry dispatch, CRUD operations.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use {
    omnigate_common::{Message, now_ms},
    omnigate_config::SchedulerConfig,
    tokio::{
        sync::{Mutex, Notify, RwLock},
        task::JoinHandle,
    },
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    store::ScheduleStore,
    types::{EntryStatus, FirePolicy, ScheduleEntry},
};

/// Callback invoked for each fired entry. Dispatch outcome handling (logging,
/// sinks) lives inside the callback; the scheduler only fires.
pub type DispatchFn =
    Arc<dyn Fn(Message) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Deferred and recurring message dispatch.
///
/// Entries are held in memory and mirrored to a [`ScheduleStore`]; the timer
/// loop sleeps until the earliest pending fire (bounded by the configured
/// poll interval) and is woken early by schedule/cancel calls.
pub struct SchedulerService {
    store: Arc<dyn ScheduleStore>,
    entries: RwLock<Vec<ScheduleEntry>>,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    wake_notify: Arc<Notify>,
    running: RwLock<bool>,
    poll_interval_ms: u64,
    on_dispatch: DispatchFn,
}

impl SchedulerService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        config: &SchedulerConfig,
        on_dispatch: DispatchFn,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            entries: RwLock::new(Vec::new()),
            timer_handle: Mutex::new(None),
            wake_notify: Arc::new(Notify::new()),
            running: RwLock::new(false),
            poll_interval_ms: config.poll_interval_ms.max(1),
            on_dispatch,
        })
    }

    /// Load pending entries from the store and start the timer loop. Fired
    /// and cancelled entries stay in the store but are not rehydrated.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let loaded = self.store.load_entries().await?;
        let pending: Vec<ScheduleEntry> = loaded
            .into_iter()
            .filter(|e| e.status == EntryStatus::Pending)
            .collect();
        info!(count = pending.len(), "loaded pending schedule entries");

        {
            let mut entries = self.entries.write().await;
            *entries = pending;
        }

        *self.running.write().await = true;

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop().await;
        });

        *self.timer_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the timer loop. In-flight dispatch tasks complete on their own.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.wake_notify.notify_one();

        let mut handle = self.timer_handle.lock().await;
        if let Some(h) = handle.take() {
            h.abort();
        }
        info!("scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Schedule a message for deferred or recurring dispatch.
    pub async fn schedule(&self, message: Message, policy: FirePolicy) -> Result<ScheduleEntry> {
        let now = now_ms();
        let next_fire = policy.initial_fire_at(now)?;
        let entry = ScheduleEntry {
            id: uuid::Uuid::new_v4().to_string(),
            message,
            policy,
            status: EntryStatus::Pending,
            next_fire_at_ms: Some(next_fire),
            fire_count: 0,
            last_fired_at_ms: None,
            created_at_ms: now,
        };

        self.store.save_entry(&entry).await?;

        {
            let mut entries = self.entries.write().await;
            entries.push(entry.clone());
        }

        self.wake_notify.notify_one();
        info!(
            id = %entry.id,
            message_id = %entry.message.id,
            policy = ?entry.policy,
            next_fire_at_ms = next_fire,
            "message scheduled"
        );
        Ok(entry)
    }

    /// Cancel a pending entry. Returns `false` for unknown ids and entries
    /// that already fired or were cancelled. A fire already in flight is not
    /// interrupted.
    pub async fn cancel(&self, id: &str) -> bool {
        let cancelled = {
            let mut entries = self.entries.write().await;
            match entries
                .iter_mut()
                .find(|e| e.id == id && e.status == EntryStatus::Pending)
            {
                Some(entry) => {
                    entry.status = EntryStatus::Cancelled;
                    entry.next_fire_at_ms = None;
                    Some(entry.clone())
                },
                None => None,
            }
        };

        match cancelled {
            Some(entry) => {
                if let Err(e) = self.store.update_entry(&entry).await {
                    warn!(id, error = %e, "failed to persist cancelled entry");
                }
                self.wake_notify.notify_one();
                info!(id, "schedule entry cancelled");
                true
            },
            None => false,
        }
    }

    /// Entries known to this service, sorted by next fire time (entries
    /// without one last), optionally filtered by status.
    pub async fn list(&self, status: Option<EntryStatus>) -> Vec<ScheduleEntry> {
        let entries = self.entries.read().await;
        let mut listed: Vec<ScheduleEntry> = entries
            .iter()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect();
        listed.sort_by_key(|e| e.next_fire_at_ms.unwrap_or(u64::MAX));
        listed
    }

    pub async fn get(&self, id: &str) -> Option<ScheduleEntry> {
        let entries = self.entries.read().await;
        entries.iter().find(|e| e.id == id).cloned()
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: &Arc<Self>) {
        loop {
            if !*self.running.read().await {
                break;
            }

            let sleep_ms = self.ms_until_next_wake().await;

            if sleep_ms > 0 {
                let notify = Arc::clone(&self.wake_notify);
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {},
                    () = notify.notified() => {
                        debug!("timer loop woken by notify");
                        continue;
                    },
                }
            }

            if !*self.running.read().await {
                break;
            }

            self.process_due_entries().await;
        }
    }

    async fn ms_until_next_wake(&self) -> u64 {
        let entries = self.entries.read().await;
        let now = now_ms();
        entries
            .iter()
            .filter(|e| e.status == EntryStatus::Pending)
            .filter_map(|e| e.next_fire_at_ms)
            .map(|t| t.saturating_sub(now))
            .min()
            .unwrap_or(self.poll_interval_ms)
            .min(self.poll_interval_ms)
    }

    async fn process_due_entries(self: &Arc<Self>) {
        let now = now_ms();
        // Advance entries under the write lock BEFORE spawning, so the next
        // tick cannot fire the same entry again and a cancel that lost the
        // race sees the updated state.
        let fired: Vec<(String, Message)> = {
            let mut entries = self.entries.write().await;
            let mut fired = Vec::new();
            for entry in entries.iter_mut() {
                if entry.status != EntryStatus::Pending
                    || !entry.next_fire_at_ms.is_some_and(|t| t <= now)
                {
                    continue;
                }
                entry.fire_count += 1;
                entry.last_fired_at_ms = Some(now);
                let message = match entry.policy.next_fire_after(now) {
                    Some(next) => {
                        entry.next_fire_at_ms = Some(next);
                        // Each recurring fire is its own logical send.
                        entry.message.renewed()
                    },
                    None => {
                        entry.status = EntryStatus::Fired;
                        entry.next_fire_at_ms = None;
                        entry.message.clone()
                    },
                };
                fired.push((entry.id.clone(), message));
            }
            fired
        };

        for (entry_id, message) in fired {
            if let Some(entry) = self.get(&entry_id).await
                && let Err(e) = self.store.update_entry(&entry).await
            {
                warn!(id = %entry_id, error = %e, "failed to persist fired entry");
            }

            debug!(id = %entry_id, message_id = %message.id, "firing scheduled message");
            let dispatch = Arc::clone(&self.on_dispatch);
            tokio::spawn(async move {
                dispatch(message).await;
            });
        }
    }
}
