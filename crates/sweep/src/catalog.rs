//! # 📚 THE CATALOG
//!
//! 🎬 COLD OPEN — INT. SEARCH ENDPOINT — THE MORNING AFTER
//!
//! "Who changed since yesterday?" we ask. The catalog answers with a number,
//! an offset, and a list. The number is how many there are. The list is how
//! many it felt like sending. These are not always the same number.
//!
//! This module asks the question exactly once per run. One page. No follow-up
//! pages, no retries, no hard feelings. If the page says `numFound` is bigger
//! than what it handed over, we log a warning and carry on with what we got.
//!
//! 🦆

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Url;
use serde::Deserialize;
use tracing::trace;

use crate::app_config::WidgetsConfig;
use crate::common::{WorkItem, endpoint};

/// 📄 One page of catalog results, straight off the wire.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    /// 🔢 How many items match in total. Not how many are on this page.
    #[serde(default)]
    pub num_found: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub items: Vec<WorkItem>,
}

impl CatalogPage {
    /// ⚠️ True when the catalog has more than this page carries.
    ///
    /// `offset` comes off the wire, so the sum saturates instead of overflowing.
    pub fn is_truncated(&self) -> bool {
        let carried = u64::try_from(self.items.len()).unwrap_or(u64::MAX);
        self.num_found > self.offset.saturating_add(carried)
    }
}

/// 📡 Thin client for `GET {base}{catalog_path}?since=YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub(crate) struct CatalogClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl CatalogClient {
    pub(crate) fn new(client: reqwest::Client, config: &WidgetsConfig) -> Result<Self> {
        let endpoint = endpoint(&config.url, &config.catalog_path)
            .context("💀 Couldn't build the catalog search URL")?;
        Ok(Self { client, endpoint })
    }

    /// 📄 Fetch the first (and only) page of items modified since `since`.
    ///
    /// 💀 Transport errors, non-2xx statuses and unparseable bodies all come back
    /// as `Err`. What to do about it is the enumerator's call, not ours.
    pub(crate) async fn fetch_page(&self, since: NaiveDate) -> Result<CatalogPage> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("since", &since.format("%Y-%m-%d").to_string());
        trace!("📡 asking the catalog: {url}");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("💀 The catalog request to '{url}' never came back with an answer. Connection refused, DNS sulking, or the host is just gone."))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 The catalog answered '{}' instead of a page. It said: '{}'",
                status,
                body
            );
        }

        let body = response
            .text()
            .await
            .context("💀 The catalog started talking and then trailed off mid-body")?;
        serde_json::from_str(&body)
            .context("💀 The catalog sent something, but it wasn't a page of items we could read")
    }
}
