//! 📊 progress.rs: "Are we there yet?" asked once per comic, forever.
//!
//! 🚀 One tick per finished fetch attempt, success or failure. The bar knows the
//! total up front because the ID plan does. Unlike some data sources we could name.
//!
//! ⚠️ Watching this progress bar will not make xkcd.com answer faster.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

const FETCH_TEMPLATE: &str =
    "{spinner} [{bar:40.cyan/blue}] {pos}/{len} comics ({per_sec}) {msg}";

/// 🔢 "1000000" → "1,000,000". You're welcome, eyes.
pub(crate) fn format_number(n: u64) -> String {
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

/// ⏱️ MM:SS, or HH:MM:SS if you should probably call your mom.
pub(crate) fn format_duration(duration: Duration) -> String {
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

/// 📊 Fetch-completion tracker shared by every fetch task.
///
/// Cheap to clone: the bar and the failure counter are both behind `Arc`s,
/// so each spawned task gets its own handle to the same display.
#[derive(Clone)]
pub struct FetchProgress {
    bar: ProgressBar,
    failed: Arc<AtomicU64>,
    started: Instant,
}

impl std::fmt::Debug for FetchProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("FetchProgress")
            .field("position", &self.bar.position())
            .field("length", &self.bar.length())
            .field("failed", &self.failed())
            .finish()
    }
}

impl FetchProgress {
    /// 🚀 A bar sized to `total` comics. `visible = false` keeps the terminal quiet.
    pub fn new(total: u64, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        };
        bar.set_length(total);
        // -- 🎨 the template is a constant; if indicatif ever rejects it we keep the default style
        if let Ok(style) = ProgressStyle::with_template(FETCH_TEMPLATE) {
            bar.set_style(style.progress_chars("=>-"));
        }

        Self {
            bar,
            failed: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
        }
    }

    pub fn hidden() -> Self {
        Self::new(0, false)
    }

    pub fn record_success(&self) {
        self.bar.inc(1);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.bar.inc(1);
        self.bar
            .set_message(format!("💀 {} failed", format_number(self.failed())));
    }

    /// 🔢 Attempts finished so far, good or bad.
    pub fn completed(&self) -> u64 {
        self.bar.position()
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// ✅ Ring the bell. Leaves a one-line summary where the bar used to be.
    pub fn finish(&self) {
        let done = self.completed();
        let failed = self.failed();
        self.bar.finish_with_message(format!(
            "✅ {} fetched, 💀 {} failed in {}",
            format_number(done.saturating_sub(failed)),
            format_number(failed),
            format_duration(self.started.elapsed())
        ));
    }
}
