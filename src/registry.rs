//! Process-wide bot registry: the only cross-bot shared mutable state.

use crate::bot::Bot;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent `{bot_name -> Bot}` map. Insert-if-absent and remove are
/// atomic; iteration (`snapshot`) is consistent but may miss entries
/// inserted concurrently with the snapshot, matching `DashMap`'s shard-level
/// consistency.
pub struct BotRegistry {
    bots: DashMap<String, Arc<Bot>>,
}

impl BotRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { bots: DashMap::new() })
    }

    /// Insert `bot` under `name` unless an entry already exists. Returns
    /// `true` if the insert happened.
    pub fn insert_if_absent(&self, name: String, bot: Arc<Bot>) -> bool {
        match self.bots.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(bot);
                true
            }
        }
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Bot>> {
        self.bots.remove(name).map(|(_, bot)| bot)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Bot>> {
        self.bots.get(name).map(|entry| entry.value().clone())
    }

    pub fn snapshot(&self) -> Vec<(String, Arc<Bot>)> {
        self.bots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.bots.len()
    }

    /// Shut every current entry down concurrently and await all of them.
    pub async fn shutdown_all(&self) {
        let bots: Vec<Arc<Bot>> = self.bots.iter().map(|entry| entry.value().clone()).collect();
        let shutdowns = bots.iter().map(|bot| bot.shutdown());
        futures_util::future::join_all(shutdowns).await;
        self.bots.clear();
    }
}

impl Default for BotRegistry {
    fn default() -> Self {
        Self { bots: DashMap::new() }
    }
}
