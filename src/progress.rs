//! Per-pass progress reporting and log-only mode.
//!
//! Each pass gets an indicatif bar whose message carries the running match
//! count. With `--log-only` the bars are hidden and the same counts go
//! through `log` every [`LOG_INTERVAL`] clusters.

use crate::models::MatchPass;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Clusters between progress lines in log-only mode.
pub const LOG_INTERVAL: u64 = 10_000;

const PASS_TEMPLATE: &str =
    "{prefix:>28} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Global flag for log-only mode (set from args in main)
static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// "Pass first (full match)"
pub fn pass_title(pass: MatchPass) -> String {
    format!("Pass {} ({})", pass.label(), pass.description())
}

fn matched_message(matched: u64, checked: u64) -> String {
    format!("{} of {} matched", matched, checked)
}

// ============================================================================
// Pass Progress
// ============================================================================

/// Progress of one pass over its candidate clusters. Shared across rayon
/// workers, so counters are atomic.
pub struct PassProgress {
    pass: MatchPass,
    total: u64,
    checked: AtomicU64,
    matched: AtomicU64,
    bar: ProgressBar,
}

impl PassProgress {
    pub fn start(pass: MatchPass, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        if is_log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
            log::info!("[{}] checking {} clusters", pass_title(pass), total);
        } else if let Ok(style) = ProgressStyle::default_bar().template(PASS_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(pass_title(pass));
        bar.set_message(matched_message(0, 0));
        Self {
            pass,
            total,
            checked: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            bar,
        }
    }

    /// Count one checked cluster.
    pub fn record(&self, is_match: bool) {
        let matched = if is_match {
            self.matched.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.matched.load(Ordering::Relaxed)
        };
        let checked = self.checked.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.inc(1);

        if is_log_only() {
            if checked % LOG_INTERVAL == 0 || checked == self.total {
                log::info!(
                    "[{}] {}/{}, {}",
                    pass_title(self.pass),
                    checked,
                    self.total,
                    matched_message(matched, checked)
                );
            }
        } else if is_match {
            self.bar.set_message(matched_message(matched, checked));
        }
    }

    pub fn checked(&self) -> u64 {
        self.checked.load(Ordering::Relaxed)
    }

    pub fn matched(&self) -> u64 {
        self.matched.load(Ordering::Relaxed)
    }

    /// Close the bar with the number of clusters the pass actually resolved.
    pub fn finish(&self, resolved: usize) {
        self.bar
            .finish_with_message(format!("{} clusters resolved", resolved));
        log::info!("{}_pass_match_count: {}", self.pass.label(), resolved);
    }
}

/// Spinner for table reads and writes; hidden in log-only mode.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}
