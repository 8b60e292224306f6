//! 🖼️ Profile page lookup — fetch the public page, squint at the HTML.
//!
//! The page path is derived from the identity: strip the public host, swap
//! `/individual/` for `/display/`. Then we grab the raw text and look for the
//! photo marker. No HTML parser, no DOM, just `contains`. It has worked so far.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use super::Lookup;
use crate::app_config::ProfilesConfig;
use crate::common::{LookupOutcome, Service, Summary, WorkItem};

#[derive(Debug, Clone)]
pub(crate) struct ProfilePageLookup {
    client: reqwest::Client,
    base_url: String,
    config: ProfilesConfig,
}

impl ProfilePageLookup {
    pub(crate) fn new(client: reqwest::Client, base_url: &str, config: ProfilesConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    /// 🔀 `https://scholars.duke.edu/individual/42` → `/display/42`.
    ///
    /// Identities from some other host keep their host, and come out absolute.
    /// An empty `individual_segment` matches nowhere, so the path is left alone.
    pub(crate) fn derive_path(&self, identity: &str) -> String {
        let stripped = identity
            .strip_prefix(self.config.strip_prefix.as_str())
            .unwrap_or(identity);
        if self.config.individual_segment.is_empty() {
            return stripped.to_string();
        }
        stripped.replacen(
            self.config.individual_segment.as_str(),
            self.config.display_segment.as_str(),
            1,
        )
    }

    /// 📡 Relative paths hang off `base_url`. Absolute ones go straight out.
    fn resolve(&self, derived: &str) -> String {
        if derived.starts_with('/') {
            format!("{}{}", self.base_url, derived)
        } else {
            derived.to_string()
        }
    }

    pub(crate) async fn fetch(&self, target: &str) -> Result<String> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .with_context(|| format!("💀 The profile page '{target}' never showed up"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("💀 The profile page '{target}' answered '{status}'");
        }

        response
            .text()
            .await
            .with_context(|| format!("💀 The profile page '{target}' stopped halfway through"))
    }
}

/// 📝 Fold a profile page outcome into the slot-1 summary.
pub(crate) fn summarize(outcome: &LookupOutcome<String>, derived: &str, marker: &str) -> Summary {
    let has_photo = match outcome {
        LookupOutcome::Success(html) => html.contains(marker),
        LookupOutcome::Failure(_) => false,
    };
    Summary::new(Service::Profile, derived, has_photo)
}

#[async_trait]
impl Lookup for ProfilePageLookup {
    async fn lookup(&self, item: &WorkItem) -> Summary {
        let derived = self.derive_path(item.identity());
        let outcome = LookupOutcome::from(self.fetch(&self.resolve(&derived)).await);
        if let LookupOutcome::Failure(err) = &outcome {
            warn!(identity = item.identity(), "⚠️ profile page lookup failed: {err:#}");
        }
        summarize(&outcome, &derived, &self.config.photo_marker)
    }
}
