//! 👤 People lookup — `GET {base}{people_path}?uri=<identity>`.
//!
//! The widgets API answers with a record (`uri`, `label`, a bag of string
//! attributes) or with a bare `null` when it has never heard of you.
//! We only care about one attribute: the image one.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::warn;

use super::Lookup;
use crate::app_config::WidgetsConfig;
use crate::common::{LookupOutcome, Service, Summary, WorkItem, endpoint};

/// 📦 What the people API says about someone.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct PeopleRecord {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub(crate) struct PeopleLookup {
    client: reqwest::Client,
    endpoint: Url,
    image_attribute: String,
}

impl PeopleLookup {
    pub(crate) fn new(client: reqwest::Client, config: &WidgetsConfig) -> Result<Self> {
        let endpoint = endpoint(&config.url, &config.people_path)
            .context("💀 Couldn't build the people lookup URL")?;
        Ok(Self {
            client,
            endpoint,
            image_attribute: config.image_attribute.clone(),
        })
    }

    /// 📡 `Ok(None)` is "the API answered, and the answer was null".
    pub(crate) async fn fetch(&self, identity: &str) -> Result<Option<PeopleRecord>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("uri", identity);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("💀 The people API request went out and nothing useful came back")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("💀 The people API said '{status}' about '{identity}'");
        }

        let body = response
            .text()
            .await
            .context("💀 The people API response body evaporated mid-read")?;
        serde_json::from_str(&body)
            .with_context(|| format!("💀 The people API record for '{identity}' wasn't JSON we recognize"))
    }
}

/// 📝 Fold a people outcome into the slot-0 summary.
///
/// - record with the attribute → `imageUri=<value> true`
/// - record without it → `imageUri=null false`
/// - `null` record or any failure → `null false`
pub(crate) fn summarize(outcome: &LookupOutcome<Option<PeopleRecord>>, image_attribute: &str) -> Summary {
    match outcome {
        LookupOutcome::Success(Some(record)) => match record.attributes.get(image_attribute) {
            Some(value) => Summary::new(Service::People, format!("{image_attribute}={value}"), true),
            None => Summary::new(Service::People, format!("{image_attribute}=null"), false),
        },
        LookupOutcome::Success(None) | LookupOutcome::Failure(_) => {
            Summary::new(Service::People, "null", false)
        }
    }
}

#[async_trait]
impl Lookup for PeopleLookup {
    async fn lookup(&self, item: &WorkItem) -> Summary {
        let outcome = LookupOutcome::from(self.fetch(item.identity()).await);
        if let LookupOutcome::Failure(err) = &outcome {
            warn!(identity = item.identity(), "⚠️ people lookup failed: {err:#}");
        }
        summarize(&outcome, &self.image_attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IDENTITY: &str = "https://host/individual/42";

    async fn lookup_against(server: &MockServer) -> Result<PeopleLookup> {
        let config = AppConfig::with_base_url(server.uri());
        PeopleLookup::new(reqwest::Client::new(), &config.widgets)
    }

    #[tokio::test]
    async fn the_one_where_the_photo_is_on_file() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/people/complete/all.json"))
            .and(query_param("uri", IDENTITY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uri": IDENTITY,
                "label": "Doe, Jane",
                "attributes": {"imageUri": "x.png", "title": "Professor"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = lookup_against(&server).await?.lookup(&WorkItem::new(IDENTITY, "j1")).await;

        assert_eq!(summary.to_string(), "serviceA:imageUri=x.png true");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_api_has_never_heard_of_you() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/people/complete/all.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let summary = lookup_against(&server).await?.lookup(&WorkItem::new(IDENTITY, "j1")).await;

        assert_eq!(summary.to_string(), "serviceA:null false");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_record_exists_but_the_photo_does_not() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uri": IDENTITY,
                "label": "Doe, Jane",
                "attributes": {"title": "Professor"}
            })))
            .mount(&server)
            .await;

        let summary = lookup_against(&server).await?.lookup(&WorkItem::new(IDENTITY, "j1")).await;

        assert_eq!(summary.to_string(), "serviceA:imageUri=null false");
        assert!(!summary.success);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_api_falls_over() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let lookup = lookup_against(&server).await?;
        assert!(lookup.fetch(IDENTITY).await.is_err());

        let summary = lookup.lookup(&WorkItem::new(IDENTITY, "j1")).await;
        assert_eq!(summary.to_string(), "serviceA:null false");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_nobody_is_listening() -> Result<()> {
        // 🔌 grab a free port, then let it go. connecting to it gets refused.
        let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let config = AppConfig::with_base_url(format!("http://127.0.0.1:{port}"));
        let lookup = PeopleLookup::new(reqwest::Client::new(), &config.widgets)?;

        assert!(lookup.fetch(IDENTITY).await.is_err());
        let summary = lookup.lookup(&WorkItem::new(IDENTITY, "j1")).await;
        assert_eq!(summary.to_string(), "serviceA:null false");
        Ok(())
    }
}
