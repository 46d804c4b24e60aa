use std::{collections::HashMap, sync::Arc};

use {omnigate_common::ChannelType, tracing::info};

use crate::adapter::ChannelAdapter;

/// Registry of channel adapters, keyed by channel. The dispatcher selects an
/// adapter with the router's resolved channel value.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<ChannelType, Arc<dyn ChannelAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        let channel = adapter.channel();
        self.adapters.insert(channel, adapter);
        info!(%channel, "registered channel adapter");
    }

    pub fn get(&self, channel: ChannelType) -> Option<Arc<dyn ChannelAdapter>> {
        self.adapters.get(&channel).cloned()
    }

    pub fn list(&self) -> Vec<ChannelType> {
        self.adapters.keys().copied().collect()
    }
}
