//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where workers toil endlessly..."
//! 🎬 "One supervisor dared to wait for all of them."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor is the pipeline coordinator. It wires the queue, starts
//! one source worker and N enrichment workers, joins every last one of them,
//! and only then looks at the result store and the clock.
//!
//! ⚠️ There is no cancellation and no deadline. A remote call that never
//! answers stalls its worker, and the join below waits for it. Forever, if
//! it comes to that.
//!
//! 🔒 Workers are the supervisor's private little minions. `mod workers` stays private.

mod workers;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, info};

use crate::app_config::{AppConfig, yesterday};
use crate::catalog::CatalogClient;
use crate::common::{EnrichmentResult, WorkItem};
use crate::lookups::Enricher;
use crate::progress::PipelineProgress;
use crate::store::ResultStore;
use workers::{EnrichmentWorker, SourceWorker, Worker};

/// 🎯 What the caller wants from this run. `None` means "use the default".
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    /// 🗓️ Defaults to yesterday.
    pub since: Option<NaiveDate>,
    /// 👷 Defaults to `runtime.worker_count` from the config (10 unless told otherwise).
    pub worker_count: Option<usize>,
}

/// ⏱️ Start, end, count. Finalized once, after every worker has joined.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub elapsed: Duration,
    pub item_count: usize,
}

impl PipelineRun {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// 🧾 Everything a finished run has to say for itself.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run: PipelineRun,
    pub since: NaiveDate,
    pub worker_count: usize,
    /// 🔢 Items the source worker put on the queue.
    pub enumerated: usize,
    /// 📸 The store snapshot, ordered by identity.
    pub results: BTreeMap<String, EnrichmentResult>,
}

/// 📦 The Supervisor: because even async tasks need someone hovering over them
/// asking "is it done yet?"
pub(crate) struct Supervisor {
    app_config: AppConfig,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    /// 🚀 Run the whole pipeline to completion and report.
    ///
    /// 💀 Errors only for setup problems (bad URLs, zero workers) or a worker
    /// that panicked. Remote failures never make it this far.
    pub(crate) async fn run(&self, request: PipelineRequest) -> Result<PipelineReport> {
        let since = request.since.unwrap_or_else(yesterday);
        let worker_count = request
            .worker_count
            .unwrap_or(self.app_config.runtime.worker_count);
        if worker_count == 0 {
            anyhow::bail!("💀 Zero workers requested. The queue would fill up and nobody would ever come. Ask for at least one.");
        }
        if self.app_config.runtime.queue_capacity == Some(0) {
            anyhow::bail!("💀 runtime.queue_capacity is 0. A queue that holds nothing holds nothing. Leave it unset for unbounded, or pick at least 1.");
        }

        let client = reqwest::Client::builder()
            .build()
            .context("💀 The HTTP client refused to be born. Probably a TLS thing. It's always a TLS thing.")?;
        let catalog = CatalogClient::new(client.clone(), &self.app_config.widgets)?;
        let enricher = Arc::new(Enricher::new(client, &self.app_config)?);
        let store = ResultStore::new();
        let progress = if self.app_config.runtime.show_progress {
            PipelineProgress::new()
        } else {
            PipelineProgress::hidden()
        };

        let (tx, rx) = match self.app_config.runtime.queue_capacity {
            Some(capacity) => async_channel::bounded::<WorkItem>(capacity),
            None => async_channel::unbounded::<WorkItem>(),
        };

        info!("🚀 sweeping changes since {since} with {worker_count} workers");
        let started_at = Local::now();
        let clock = Instant::now();

        let source_handle = SourceWorker::new(tx, catalog, since).start();
        let worker_handles: Vec<_> = (0..worker_count)
            .map(|worker_id| {
                EnrichmentWorker::new(
                    worker_id,
                    rx.clone(),
                    enricher.clone(),
                    store.clone(),
                    progress.clone(),
                )
                .start()
            })
            .collect();
        // -- 🗑️ the workers hold their own receivers. ours would just keep the channel alive for nobody.
        drop(rx);

        let mut processed = 0usize;
        for joined in futures::future::join_all(worker_handles).await {
            processed += joined.context("💀 An enrichment worker panicked. The store may be missing its last item.")??;
        }
        let enumerated = source_handle
            .await
            .context("💀 The source worker panicked")??;

        let elapsed = clock.elapsed();
        let finished_at = Local::now();
        progress.finish();

        let results = store.snapshot().await;
        debug!(
            "📊 {} enumerated, {} processed, {} counted, {} stored",
            enumerated,
            processed,
            progress.items(),
            results.len()
        );
        info!("✅ {} items enriched in {} ms", results.len(), elapsed.as_millis());

        Ok(PipelineReport {
            run: PipelineRun {
                started_at,
                finished_at,
                elapsed,
                item_count: results.len(),
            },
            since,
            worker_count,
            enumerated,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    const SINCE: &str = "2024-03-14";

    fn since() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).expect("pi day exists")
    }

    fn identity(n: usize) -> String {
        format!("https://host/individual/{n}")
    }

    /// 🎭 People API: even-numbered people have photos, odd ones are unknown (`null`).
    struct PeopleResponder;

    impl Respond for PeopleResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let uri = request
                .url
                .query_pairs()
                .find(|(key, _)| key == "uri")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            let n: usize = uri.rsplit('/').next().and_then(|n| n.parse().ok()).unwrap_or(1);
            if n % 2 == 0 {
                ResponseTemplate::new(200).set_body_json(json!({
                    "uri": uri,
                    "label": format!("Person {n}"),
                    "attributes": {"imageUri": format!("{n}.png")}
                }))
            } else {
                ResponseTemplate::new(200).set_body_string("null")
            }
        }
    }

    /// 🎭 Profile pages: multiples of three show a photo.
    struct ProfileResponder;

    impl Respond for ProfileResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let n: usize = request
                .url
                .path()
                .rsplit('/')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(1);
            if n % 3 == 0 {
                ResponseTemplate::new(200)
                    .set_body_string(r#"<img class="individual-photo" src="p.png">"#)
            } else {
                ResponseTemplate::new(200).set_body_string("<html>no photo</html>")
            }
        }
    }

    async fn mount_catalog(server: &MockServer, count: usize) {
        let items: Vec<_> = (0..count)
            .map(|n| json!({"uri": identity(n), "alternateId": format!("alt{n}")}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/search/modified.json"))
            .and(query_param("since", SINCE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numFound": count,
                "offset": 0,
                "items": items
            })))
            .mount(server)
            .await;
    }

    async fn mount_lookups(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/people/complete/all.json"))
            .respond_with(PeopleResponder)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::path_regex(r"^/display/\d+$"))
            .respond_with(ProfileResponder)
            .mount(server)
            .await;
    }

    fn config_for(server: &MockServer) -> AppConfig {
        let mut config = AppConfig::with_base_url(server.uri());
        config.profiles.strip_prefix = "https://host".to_string();
        config.runtime.show_progress = false;
        config
    }

    async fn run_with(server: &MockServer, workers: usize) -> Result<PipelineReport> {
        Supervisor::new(config_for(server))
            .run(PipelineRequest {
                since: Some(since()),
                worker_count: Some(workers),
            })
            .await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn the_one_where_every_item_gets_exactly_two_summaries() -> Result<()> {
        let server = MockServer::start().await;
        mount_catalog(&server, 25).await;
        mount_lookups(&server).await;

        let report = run_with(&server, 10).await?;

        assert_eq!(report.enumerated, 25);
        assert_eq!(report.run.item_count, 25);
        assert_eq!(report.results.len(), 25);
        for n in 0..25 {
            let result = &report.results[&identity(n)];
            let [people, profile] = result.lines();
            if n % 2 == 0 {
                assert_eq!(people, format!("serviceA:imageUri={n}.png true"));
            } else {
                assert_eq!(people, "serviceA:null false");
            }
            assert_eq!(profile, format!("serviceB:/display/{n} {}", n % 3 == 0));
        }
        assert!(report.run.finished_at >= report.run.started_at);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn the_one_where_one_worker_and_ten_workers_agree() -> Result<()> {
        let server = MockServer::start().await;
        mount_catalog(&server, 30).await;
        mount_lookups(&server).await;

        let solo = run_with(&server, 1).await?;
        let crowd = run_with(&server, 10).await?;

        assert_eq!(solo.results, crowd.results);
        assert_eq!(solo.worker_count, 1);
        assert_eq!(crowd.worker_count, 10);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_running_it_twice_changes_nothing() -> Result<()> {
        let server = MockServer::start().await;
        mount_catalog(&server, 6).await;
        mount_lookups(&server).await;

        let first = run_with(&server, 3).await?;
        let second = run_with(&server, 3).await?;

        assert_eq!(first.results, second.results);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_catalog_is_empty_and_everyone_goes_home() -> Result<()> {
        let server = MockServer::start().await;
        mount_catalog(&server, 0).await;
        mount_lookups(&server).await;

        let report = run_with(&server, 10).await?;

        assert!(report.results.is_empty());
        assert_eq!(report.enumerated, 0);
        assert_eq!(report.run.item_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_catalog_is_down_and_the_pipeline_shrugs() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/modified.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_lookups(&server).await;

        let report = run_with(&server, 4).await?;

        assert!(report.results.is_empty());
        assert_eq!(report.enumerated, 0);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_service_a_breaks_and_service_b_does_not_care() -> Result<()> {
        let server = MockServer::start().await;
        mount_catalog(&server, 3).await;
        // 🧪 person 0's record request blows up; the others go through the normal responder
        Mock::given(method("GET"))
            .and(path("/people/complete/all.json"))
            .and(query_param("uri", identity(0)))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_lookups(&server).await;

        let report = run_with(&server, 2).await?;

        assert_eq!(report.results.len(), 3);
        let broken = &report.results[&identity(0)];
        assert_eq!(broken.people.to_string(), "serviceA:null false");
        assert_eq!(broken.profile.to_string(), "serviceB:/display/0 true");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_service_b_breaks_and_service_a_does_not_care() -> Result<()> {
        let server = MockServer::start().await;
        mount_catalog(&server, 3).await;
        // 🧪 person 0's profile page is on fire; the others go through the normal responder
        Mock::given(method("GET"))
            .and(path("/display/0"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_lookups(&server).await;

        let report = run_with(&server, 2).await?;

        assert_eq!(report.results.len(), 3);
        let broken = &report.results[&identity(0)];
        assert_eq!(broken.people.to_string(), "serviceA:imageUri=0.png true");
        assert_eq!(broken.profile.to_string(), "serviceB:/display/0 false");
        let fine = &report.results[&identity(2)];
        assert_eq!(fine.people.to_string(), "serviceA:imageUri=2.png true");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_profile_host_is_not_even_there() -> Result<()> {
        let server = MockServer::start().await;
        mount_catalog(&server, 4).await;
        mount_lookups(&server).await;

        // 🔌 profile pages point at a port nobody is listening on
        let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let mut config = config_for(&server);
        config.profiles.url = Some(format!("http://127.0.0.1:{port}"));
        let report = Supervisor::new(config)
            .run(PipelineRequest {
                since: Some(since()),
                worker_count: Some(2),
            })
            .await?;

        assert_eq!(report.results.len(), 4);
        for n in 0..4 {
            let result = &report.results[&identity(n)];
            assert_eq!(result.profile.to_string(), format!("serviceB:/display/{n} false"));
            if n % 2 == 0 {
                assert_eq!(result.people.to_string(), format!("serviceA:imageUri={n}.png true"));
            } else {
                assert_eq!(result.people.to_string(), "serviceA:null false");
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_catalog_offset_is_absurd() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/modified.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numFound": 1,
                "offset": u64::MAX,
                "items": [{"uri": identity(3), "alternateId": "alt3"}]
            })))
            .mount(&server)
            .await;
        mount_lookups(&server).await;

        let report = run_with(&server, 2).await?;

        assert_eq!(report.enumerated, 1);
        assert_eq!(report.results[&identity(3)].profile.to_string(), "serviceB:/display/3 true");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_tiny_queue_still_loses_nothing() -> Result<()> {
        let server = MockServer::start().await;
        mount_catalog(&server, 12).await;
        mount_lookups(&server).await;

        let mut config = config_for(&server);
        config.runtime.queue_capacity = Some(1);
        let report = Supervisor::new(config)
            .run(PipelineRequest {
                since: Some(since()),
                worker_count: Some(2),
            })
            .await?;

        assert_eq!(report.results.len(), 12);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_queue_has_no_room_at_all() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.runtime.queue_capacity = Some(0);

        let err = Supervisor::new(config)
            .run(PipelineRequest {
                since: Some(since()),
                worker_count: Some(2),
            })
            .await
            .expect_err("a zero-capacity queue must be rejected");
        assert!(err.to_string().contains("queue_capacity"));
    }

    #[tokio::test]
    async fn the_one_where_nobody_shows_up_to_work() {
        let server = MockServer::start().await;
        let err = run_with(&server, 0).await.expect_err("zero workers must be rejected");
        assert!(err.to_string().contains("Zero workers"));
    }
}
