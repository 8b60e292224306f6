//! 🔍 The EnrichmentWorker — patient, tireless, and deeply unbothered by the
//! chaos happening upstream.
//!
//! Receive an item. Ask both lookups about it. Write both answers to the store.
//! Receive the next one. When the queue is closed and empty, go home.
//!
//! ⚠️ Lookup failures never leave this loop. They're already summaries by the
//! time we see them. The only way out is the queue running dry.

use std::sync::Arc;

use anyhow::Result;
use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Worker;
use crate::common::WorkItem;
use crate::lookups::Enricher;
use crate::progress::PipelineProgress;
use crate::store::ResultStore;

#[derive(Debug)]
pub(crate) struct EnrichmentWorker {
    worker_id: usize,
    rx: Receiver<WorkItem>,
    enricher: Arc<Enricher>,
    store: ResultStore,
    progress: PipelineProgress,
}

impl EnrichmentWorker {
    pub(crate) fn new(
        worker_id: usize,
        rx: Receiver<WorkItem>,
        enricher: Arc<Enricher>,
        store: ResultStore,
        progress: PipelineProgress,
    ) -> Self {
        Self {
            worker_id,
            rx,
            enricher,
            store,
            progress,
        }
    }
}

impl Worker for EnrichmentWorker {
    /// 🔢 How many items this worker enriched.
    type Output = usize;

    fn start(self) -> JoinHandle<Result<usize>> {
        tokio::spawn(async move {
            debug!(worker_id = self.worker_id, "📥 enrichment worker started draining the queue");
            let mut processed = 0usize;
            loop {
                match self.rx.recv().await {
                    Ok(item) => {
                        debug!(
                            worker_id = self.worker_id,
                            identity = item.identity(),
                            alternate_id = item.alternate_id(),
                            "🔍 enriching"
                        );
                        let result = self.enricher.enrich(&item).await;
                        self.progress.record(&result);
                        self.store.put(item.identity(), result).await;
                        processed += 1;
                    }
                    Err(_) => {
                        // Channel is empty and closed
                        debug!(
                            worker_id = self.worker_id,
                            processed, "🏁 queue drained, worker going home"
                        );
                        return Ok(processed);
                    }
                }
            }
        })
    }
}
