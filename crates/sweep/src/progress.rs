//! 📊 progress.rs — "Are we there yet?" — every pipeline, every time, forever.
//!
//! 🚀 Two jobs here. While the run is going, a spinner on stderr counts items
//! and how many came back with photos. When the run is done, [`render_tally`]
//! turns the final report into a table so comfy it has lumbar support.
//!
//! ⚠️  Warning: Watching this spinner will not make the remote services go faster.
//!
//! 🦆 The duck has nothing to do with this module. It's just vibing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

use crate::common::EnrichmentResult;
use crate::supervisors::PipelineReport;

/// 🔢 Formats a number with commas. "1000000 items" → "1,000,000 items" — you're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if the catalog was having a big day.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📦 The counters behind the spinner.
struct ProgressMetrics {
    items: u64,
    people_hits: u64,
    profile_hits: u64,
    /// 🔄 sliding window of (timestamp, items) for the items/s rate
    rate_samples: VecDeque<(Instant, u64)>,
    start_time: Instant,
}

impl ProgressMetrics {
    fn new() -> Self {
        let start_time = Instant::now();
        // -- 🔄 seed the window with t=0 so we don't divide by zero like animals
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64));
        Self {
            items: 0,
            people_hits: 0,
            profile_hits: 0,
            rate_samples,
            start_time,
        }
    }

    /// 📈 items/s over the last 5 seconds, so one slow profile page doesn't look like the apocalypse.
    fn items_per_sec(&mut self) -> f64 {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples.push_back((now, self.items));

        match self.rate_samples.front() {
            Some(&(oldest_time, oldest_items)) => {
                let elapsed = now.duration_since(oldest_time).as_secs_f64();
                if elapsed > 0.0 {
                    self.items.saturating_sub(oldest_items) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }
}

/// 📊 Shared handle to the spinner. Every worker gets a clone; they all count into the same box.
#[derive(Clone)]
pub(crate) struct PipelineProgress {
    progress_bar: ProgressBar,
    metrics: Arc<Mutex<ProgressMetrics>>,
}

impl std::fmt::Debug for PipelineProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't do Debug
        f.debug_struct("PipelineProgress").finish_non_exhaustive()
    }
}

impl PipelineProgress {
    /// 🚀 A spinner on stderr. indicatif hides it on its own when stderr isn't a terminal.
    pub(crate) fn new() -> Self {
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        Self::with_bar(progress_bar)
    }

    /// 🙈 Counts everything, draws nothing. For tests and `--no-progress`.
    pub(crate) fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(progress_bar: ProgressBar) -> Self {
        Self {
            progress_bar,
            metrics: Arc::new(Mutex::new(ProgressMetrics::new())),
        }
    }

    /// 🔄 One more item done. Update the counters, redraw the message.
    pub(crate) fn record(&self, result: &EnrichmentResult) {
        // -- 🔒 a poisoned lock only means some other worker panicked mid-count. the count can be wrong then.
        let Ok(mut metrics) = self.metrics.lock() else {
            return;
        };
        metrics.items += 1;
        metrics.people_hits += u64::from(result.people.success);
        metrics.profile_hits += u64::from(result.profile.success);
        let rate = metrics.items_per_sec();
        self.progress_bar.set_message(format!(
            "{} items ({:.1}/s) | 👤 {} with photo | 🖼️ {} with photo | {} running",
            format_number(metrics.items),
            rate,
            format_number(metrics.people_hits),
            format_number(metrics.profile_hits),
            format_duration(metrics.start_time.elapsed()),
        ));
    }

    pub(crate) fn items(&self) -> u64 {
        self.metrics.lock().map(|metrics| metrics.items).unwrap_or(0)
    }

    /// ✅ Done. Clear the spinner so stdout gets a clean stage.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}

/// 🍽️ The end-of-run tally: items, per-service hits and misses, elapsed time.
///
/// ```text
///   items      since        workers   elapsed
///   serviceA   <hits> ✅    <misses> 💀
///   serviceB   <hits> ✅    <misses> 💀
/// ```
pub fn render_tally(report: &PipelineReport) -> Table {
    let people_hits = report.results.values().filter(|r| r.people.success).count() as u64;
    let profile_hits = report.results.values().filter(|r| r.profile.success).count() as u64;
    let total = report.results.len() as u64;

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new(format!("{} items", format_number(total))).set_alignment(CellAlignment::Right),
        Cell::new(format!("since {}", report.since)).set_alignment(CellAlignment::Right),
        Cell::new(format!("{} workers", report.worker_count)).set_alignment(CellAlignment::Right),
        Cell::new(format!("{} elapsed", format_duration(report.run.elapsed)))
            .set_alignment(CellAlignment::Right),
    ]);
    for (label, hits) in [("serviceA", people_hits), ("serviceB", profile_hits)] {
        table.add_row(vec![
            Cell::new(label).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} ✅", format_number(hits))).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} 💀", format_number(total - hits)))
                .set_alignment(CellAlignment::Right),
            Cell::new(""),
        ]);
    }
    if report.enumerated != report.results.len() {
        // -- ⚠️ duplicate identities on the page collapse into one entry. surface it.
        table.add_row(vec![
            Cell::new(format!("{} enumerated", format_number(report.enumerated as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
        ]);
    }
    table
}
