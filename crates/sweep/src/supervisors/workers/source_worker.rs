//! 🚰 The SourceWorker — turns one catalog page into a stream of work items.
//!
//! It fetches, it sends, it drops its sender, it leaves. If the fetch fails
//! it logs the failure and leaves anyway, and the queue closes with whatever
//! made it in (which, for a single page, is nothing). Nobody retries. Nobody
//! gets paged. The report will just be short.

use anyhow::Result;
use async_channel::Sender;
use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::Worker;
use crate::catalog::CatalogClient;
use crate::common::WorkItem;

#[derive(Debug)]
pub(crate) struct SourceWorker {
    tx: Sender<WorkItem>,
    catalog: CatalogClient,
    since: NaiveDate,
}

impl SourceWorker {
    pub(crate) fn new(tx: Sender<WorkItem>, catalog: CatalogClient, since: NaiveDate) -> Self {
        Self { tx, catalog, since }
    }
}

impl Worker for SourceWorker {
    /// 🔢 How many items made it onto the queue.
    type Output = usize;

    fn start(self) -> JoinHandle<Result<usize>> {
        tokio::spawn(async move {
            let page = match self.catalog.fetch_page(self.since).await {
                Ok(page) => page,
                Err(err) => {
                    // -- 💀 enumeration is over before it started. tx drops on return, queue closes empty.
                    error!("💀 catalog enumeration since {} failed: {err:#}", self.since);
                    return Ok(0);
                }
            };

            info!(
                "📚 catalog loaded: {} found since {}, {} on this page (offset {})",
                page.num_found,
                self.since,
                page.items.len(),
                page.offset
            );
            if page.is_truncated() {
                warn!(
                    "⚠️ catalog has {} items but only the first page of {} is processed",
                    page.num_found,
                    page.items.len()
                );
            }

            let mut sent = 0usize;
            for item in page.items {
                if self.tx.send(item).await.is_err() {
                    // -- 🏚️ every receiver is gone. nobody is left to hand things to.
                    warn!("⚠️ all enrichment workers are gone, stopped enumerating after {sent} items");
                    break;
                }
                sent += 1;
            }

            // -- 🏁 the only end-of-stream signal workers will ever get
            drop(self.tx);
            Ok(sent)
        })
    }
}
