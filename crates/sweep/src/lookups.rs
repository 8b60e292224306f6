//! 🔍 Lookups — the two questions every work item gets asked.
//!
//! 👤 "Does the people API have a photo on file for you?"
//! 🖼️ "Does your public profile page actually show one?"
//!
//! Two services, two answers, zero guarantees they agree. Each lookup turns
//! whatever happened on the wire (a record, a page, a 500, a timeout that
//! never times out) into a [`Summary`]. Failures stay in their own slot.
//! One service falling over never stops the other from being asked.
//!
//! 🦆 (the duck looked up both. the duck has a photo. the duck is smug about it.)

use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::AppConfig;
use crate::common::{EnrichmentResult, Summary, WorkItem};

pub(crate) mod people;
pub(crate) mod profile_page;

pub(crate) use people::PeopleLookup;
pub(crate) use profile_page::ProfilePageLookup;

/// 🔍 One remote question about one item, answered with one [`Summary`].
///
/// # Contract 📜
/// - Never returns an error. Whatever goes wrong becomes a failure-flavored summary.
/// - No retries, no timeouts. It waits for whatever the remote eventually says.
#[async_trait]
pub(crate) trait Lookup: std::fmt::Debug + Send + Sync {
    async fn lookup(&self, item: &WorkItem) -> Summary;
}

/// 🧾 Asks both lookups about an item and staples the answers together.
#[derive(Debug, Clone)]
pub(crate) struct Enricher {
    people: PeopleLookup,
    profile: ProfilePageLookup,
}

impl Enricher {
    pub(crate) fn new(client: reqwest::Client, config: &AppConfig) -> Result<Self> {
        Ok(Self {
            people: PeopleLookup::new(client.clone(), &config.widgets)?,
            profile: ProfilePageLookup::new(
                client,
                config.profiles_base_url(),
                config.profiles.clone(),
            ),
        })
    }

    /// 🚀 Both lookups in flight at once. Both slots filled before we return.
    pub(crate) async fn enrich(&self, item: &WorkItem) -> EnrichmentResult {
        let (people, profile) =
            futures::join!(self.people.lookup(item), self.profile.lookup(item));
        EnrichmentResult { people, profile }
    }
}
