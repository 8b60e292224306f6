//! 🧵 Workers: the ones who actually do the work while the Supervisor takes
//! all the credit in the sprint retro.
//!
//! 🚀 Two kinds live here:
//! - [`SourceWorker`] — asks the catalog for one page and feeds the queue. One of these per run.
//! - [`EnrichmentWorker`] — drains the queue, asks both lookups, writes the store. N of these.
//!
//! The queue between them is an `async_channel`. When the source worker drops
//! its sender, the channel closes; once it's also empty, every `recv()` errors
//! out and the enrichment workers go home. No sentinels, no poison pills.

use anyhow::Result;
use tokio::task::JoinHandle;

mod enrichment_worker;
mod source_worker;

pub(crate) use enrichment_worker::EnrichmentWorker;
pub(crate) use source_worker::SourceWorker;

/// 🏗️ A background worker, that does work. duh.
///
/// `start` consumes the worker and spawns it. The handle resolves to whatever
/// the worker counted while it was alive.
pub(crate) trait Worker {
    type Output: Send + 'static;

    fn start(self) -> JoinHandle<Result<Self::Output>>;
}
