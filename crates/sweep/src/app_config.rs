//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the configuration directory. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment. Env vars (`SWEEP_*`, nested with `__`) form the base
//! layer, and `<configuration directory>/sweep.toml` is merged on top of them.
//! The resulting [`AppConfig`] is built once in `main()` and handed down by value.
//! Nobody reaches for a global. There is no global. We checked.

use std::path::Path;

use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

/// 📁 The file we look for inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "sweep.toml";

/// 🏷️ Every env var we care about starts with this. Everything else is someone else's problem.
pub const ENV_PREFIX: &str = "SWEEP_";

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 👤 The widgets API: catalog search and people records live here.
    pub widgets: WidgetsConfig,
    /// 🖼️ Where profile pages live and how we sniff them for photos.
    #[serde(default)]
    pub profiles: ProfilesConfig,
    /// 🧵 Worker pool and queue knobs.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 👤 Widgets API settings. `url` is the one thing you cannot skip.
#[derive(Debug, Deserialize, Clone)]
pub struct WidgetsConfig {
    /// 📡 Base URL, scheme and all. Paths below get glued onto it.
    pub url: String,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default = "default_people_path")]
    pub people_path: String,
    /// 🔑 The attribute whose presence means "this person has a photo".
    #[serde(default = "default_image_attribute")]
    pub image_attribute: String,
}

fn default_catalog_path() -> String {
    "/search/modified.json".to_string()
}

fn default_people_path() -> String {
    "/people/complete/all.json".to_string()
}

fn default_image_attribute() -> String {
    "imageUri".to_string()
}

/// 🖼️ Profile page settings.
///
/// An identity like `https://scholars.duke.edu/individual/42` becomes the page
/// path `/display/42`: strip the prefix, swap the segment, fetch it from `url`.
#[derive(Debug, Deserialize, Clone)]
pub struct ProfilesConfig {
    /// 📡 Base URL for profile pages. `None` means "same place as the widgets API".
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: String,
    #[serde(default = "default_individual_segment")]
    pub individual_segment: String,
    #[serde(default = "default_display_segment")]
    pub display_segment: String,
    /// 🔍 If the page contains this, there's a photo on it. Probably.
    #[serde(default = "default_photo_marker")]
    pub photo_marker: String,
}

fn default_strip_prefix() -> String {
    "https://scholars.duke.edu".to_string()
}

fn default_individual_segment() -> String {
    "/individual/".to_string()
}

fn default_display_segment() -> String {
    "/display/".to_string()
}

fn default_photo_marker() -> String {
    r#"img class="individual-photo""#.to_string()
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            url: None,
            strip_prefix: default_strip_prefix(),
            individual_segment: default_individual_segment(),
            display_segment: default_display_segment(),
            photo_marker: default_photo_marker(),
        }
    }
}

/// 🧵 Runtime knobs for the worker pool.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// 👷 How many enrichment workers drain the queue. The CLI can override it.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// 📬 `None` = unbounded queue, the enumerator never waits on slow workers.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    /// 📊 Spinner on stderr while the pipeline runs.
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

// 👷 10 workers. The same number of fingers you'll be crossing while it runs.
fn default_worker_count() -> usize {
    10
}

fn default_show_progress() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: None,
            show_progress: default_show_progress(),
        }
    }
}

impl AppConfig {
    /// 🏗️ Config with nothing but a base URL and defaults everywhere else.
    pub fn with_base_url(url: impl Into<String>) -> Self {
        Self {
            widgets: WidgetsConfig {
                url: url.into(),
                catalog_path: default_catalog_path(),
                people_path: default_people_path(),
                image_attribute: default_image_attribute(),
            },
            profiles: ProfilesConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// 📡 Profile pages default to the widgets host when no separate base is set.
    pub fn profiles_base_url(&self) -> &str {
        self.profiles.url.as_deref().unwrap_or(&self.widgets.url)
    }
}

/// 🗓️ Yesterday, local time. The default answer to "modified since when?"
pub fn yesterday() -> NaiveDate {
    let today = Local::now().date_naive();
    // -- 📅 there is always a yesterday. except on 0001-01-01, and we're not running then.
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

/// 🚀 Load the config from env vars and, if a directory is given, `<directory>/sweep.toml`.
///
/// 📐 Layering:
///   - `directory` is None → env vars only. `SWEEP_WIDGETS__URL` had better be set.
///   - `directory` is Some → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 A directory that doesn't exist is an error before any parsing happens,
/// so the message points at the directory and not at some missing field.
pub fn load_config(directory: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration from directory: {:#?}",
        directory.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config = match directory {
        Some(dir) => {
            let is_dir = dir.try_exists().with_context(|| {
                format!("💀 Couldn't even ask the filesystem about '{}'.", dir.display())
            })? && dir.is_dir();
            if !is_dir {
                anyhow::bail!(
                    "💀 Configuration directory '{}' does not exist, or is not a directory. Relative paths are relative to wherever you ran this from, which may not be where you think.",
                    dir.display()
                );
            }
            config.merge(Toml::file(dir.join(CONFIG_FILE_NAME)))
        }
        None => config,
    };

    let context_msg = match directory {
        Some(dir) => format!(
            "💀 Failed to parse configuration from '{}' and environment variables ({ENV_PREFIX}*). Is widgets.url set?",
            dir.join(CONFIG_FILE_NAME).display()
        ),
        None => format!(
            "💀 Failed to parse configuration from environment variables ({ENV_PREFIX}*). No directory was provided, so this one's all on the environment. Is {ENV_PREFIX}WIDGETS__URL set?"
        ),
    };

    config.extract().context(context_msg)
}
