//! 🔭 sweep — page through the catalog, ask two services about everyone on
//! the page, write down what they said.
//!
//! 🧠 Knowledge graph:
//! - `catalog` → one page of [`WorkItem`]s, fetched by the source worker
//! - `async_channel` → the only hand-off between the source worker and the enrichment workers
//! - `lookups` → people API + profile page, both asked per item, concurrently
//! - [`ResultStore`] → `identity → EnrichmentResult`, shared by every worker
//! - `supervisors` → starts everyone, joins everyone, reports

pub mod app_config;
pub mod catalog;
pub mod common;
mod lookups;
pub mod progress;
pub mod store;
mod supervisors;

use anyhow::Result;

pub use app_config::{AppConfig, load_config, yesterday};
pub use common::{EnrichmentResult, LookupOutcome, Service, Summary, WorkItem};
pub use lookups::people::PeopleRecord;
pub use store::ResultStore;
pub use supervisors::{PipelineReport, PipelineRequest, PipelineRun};

/// 🚀 Run the pipeline once, start to drain, and hand back the report.
pub async fn run(app_config: AppConfig, request: PipelineRequest) -> Result<PipelineReport> {
    supervisors::Supervisor::new(app_config).run(request).await
}
