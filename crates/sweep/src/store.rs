//! 🗄️ The ResultStore — a HashMap with a bouncer.
//!
//! Every enrichment worker writes here. A `HashMap` does not like being written
//! to by ten tasks at once, so it lives behind an `Arc<Mutex<...>>` and takes
//! visitors one at a time.
//!
//! 🔒 `put` is fine to call from anywhere, any time.
//! 📸 `snapshot` is only a consistent picture once every writer has gone home,
//! i.e. after the coordinator has joined all workers. Before that it's a
//! candid shot, and people may be blinking.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::common::EnrichmentResult;

/// 🗄️ `identity → EnrichmentResult`, shared by every worker. Clone it freely,
/// every clone points at the same map.
#[derive(Debug, Default, Clone)]
pub struct ResultStore {
    entries: Arc<Mutex<HashMap<String, EnrichmentResult>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📥 Store the result for `identity`. Last write wins; the loser is returned.
    pub async fn put(
        &self,
        identity: impl Into<String>,
        result: EnrichmentResult,
    ) -> Option<EnrichmentResult> {
        self.entries.lock().await.insert(identity.into(), result)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// 📸 A copy of everything, ordered by identity so reports (and tests) are stable.
    pub async fn snapshot(&self) -> BTreeMap<String, EnrichmentResult> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(identity, result)| (identity.clone(), result.clone()))
            .collect()
    }
}
