//! 📦 Common data structures — the building blocks of sweep
//!
//! ---
//!
//! 🎬 COLD OPEN — INT. FACULTY DIRECTORY — 11:58 PM
//!
//! A catalog page arrives. A thousand people, give or take, each one a URI with
//! a second name tucked behind it. Somebody, somewhere, wants to know which of
//! them still have a profile photo. Nobody wants to click through a thousand
//! pages by hand. And so: the structs below were born.
//!
//! 🦆
//!
//! This module holds the humble types that ferry a person from the catalog to
//! the result store: the [`WorkItem`] that goes in, the [`Summary`] pair that
//! comes out, and the [`LookupOutcome`] that sits in between deciding whether
//! today is a good day.

use std::fmt;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// 🎯 A single catalog entry waiting to be enriched.
///
/// Born in the catalog enumerator, handed by value into the work queue, and
/// never touched again except to be read. The fields are private so nobody
/// downstream gets creative with someone's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    /// 🔑 Canonical URI of the person. The key everything else hangs off.
    #[serde(alias = "uri")]
    identity: String,
    /// 🏷️ The other name. Lookups never use it. It rides along in the per-item logs.
    #[serde(rename = "alternateId", default)]
    alternate_id: String,
}

impl WorkItem {
    pub fn new(identity: impl Into<String>, alternate_id: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            alternate_id: alternate_id.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn alternate_id(&self) -> &str {
        &self.alternate_id
    }
}

/// 📡 The two remote services every item gets asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// 👤 The people API — structured record with attributes.
    People,
    /// 🖼️ The public profile page — raw HTML, sniffed for a photo.
    Profile,
}

impl Service {
    /// 🏷️ The prefix each summary line starts with.
    pub fn label(&self) -> &'static str {
        match self {
            Service::People => "serviceA",
            Service::Profile => "serviceB",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 🎭 Either the remote call gave us something, or it gave us grief.
///
/// Lookups never bubble their errors out of the worker. They land here, get
/// folded into a failure-flavored [`Summary`], and the worker moves on with its life.
#[derive(Debug)]
pub enum LookupOutcome<T> {
    Success(T),
    Failure(anyhow::Error),
}

impl<T> LookupOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, LookupOutcome::Success(_))
    }
}

impl<T> From<Result<T>> for LookupOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => LookupOutcome::Success(value),
            Err(err) => LookupOutcome::Failure(err),
        }
    }
}

/// 📝 One service's verdict on one item.
///
/// Renders as `"<label>:<detail> <success>"`, e.g. `serviceA:imageUri=x.png true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub service: Service,
    pub detail: String,
    pub success: bool,
}

impl Summary {
    pub fn new(service: Service, detail: impl Into<String>, success: bool) -> Self {
        Self {
            service,
            detail: detail.into(),
            success,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.service, self.detail, self.success)
    }
}

/// 🧾 Both verdicts for one item, in slot order: people first, profile second.
///
/// Always complete. A failed lookup still fills its slot, just with bad news.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub people: Summary,
    pub profile: Summary,
}

impl EnrichmentResult {
    /// 📋 The two summary lines, slot 0 then slot 1.
    pub fn lines(&self) -> [String; 2] {
        [self.people.to_string(), self.profile.to_string()]
    }
}

/// 🔗 Glue a base URL and a path together and make sure the result is actually a URL.
///
/// Plain concatenation on purpose: bases like `https://host/widgets` keep their
/// path prefix, which `Url::join` would happily throw away.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).with_context(|| {
        format!("💀 '{joined}' is not a URL. Check the base url in the config, it's probably missing a scheme.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_catalog_speaks_two_dialects() -> Result<()> {
        // 🧪 the catalog says "uri" in the wild and "identity" in the docs. we accept both.
        let from_uri: WorkItem =
            serde_json::from_str(r#"{"uri":"https://host/individual/1","alternateId":"a1"}"#)?;
        let from_identity: WorkItem =
            serde_json::from_str(r#"{"identity":"https://host/individual/1","alternateId":"a1"}"#)?;

        assert_eq!(from_uri, from_identity);
        assert_eq!(from_uri.identity(), "https://host/individual/1");
        assert_eq!(from_uri.alternate_id(), "a1");
        Ok(())
    }

    #[test]
    fn the_one_where_summaries_render_like_the_report_expects() {
        let summary = Summary::new(Service::People, "imageUri=x.png", true);
        assert_eq!(summary.to_string(), "serviceA:imageUri=x.png true");

        let summary = Summary::new(Service::Profile, "/display/42", false);
        assert_eq!(summary.to_string(), "serviceB:/display/42 false");
    }

    #[test]
    fn the_one_where_errors_become_outcomes_not_panics() {
        let outcome: LookupOutcome<u8> = Err(anyhow::anyhow!("nope")).into();
        assert!(!outcome.is_success());
        let outcome: LookupOutcome<u8> = Ok(7).into();
        assert!(outcome.is_success());
    }

    #[test]
    fn the_one_where_endpoints_keep_their_path_prefix() -> Result<()> {
        let url = endpoint("http://localhost:8080/widgets/", "/search/modified.json")?;
        assert_eq!(url.as_str(), "http://localhost:8080/widgets/search/modified.json");
        assert!(endpoint("not a url", "/x").is_err());
        Ok(())
    }
}
