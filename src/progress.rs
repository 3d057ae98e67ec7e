//! Progress reporting for long-running batch stages.

use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A stage of per-project work that reports progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Reading image headers and pasting images onto the strip.
    Merge,
    /// Classifying rows and saving segments.
    Split,
    /// Concatenating segments into bundles.
    Repack,
    /// Encoding pages into the PDF.
    Pdf,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Merge => "Merging",
            Stage::Split => "Splitting",
            Stage::Repack => "Repacking",
            Stage::Pdf => "Writing PDF",
        }
    }
}

/// Trait for reporting batch progress.
///
/// The CLI implements it with indicatif bars; library callers and tests
/// use [`SilentReporter`]. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    fn on_batch_start(&self, _total_items: usize) {}
    fn on_item_start(&self, _index: usize, _total: usize, _name: &str) {}
    fn on_stage_start(&self, _stage: Stage, _total_steps: usize) {}
    fn on_stage_progress(&self, _stage: Stage, _done: usize) {}
    fn on_stage_complete(&self, _stage: Stage) {}
    fn on_item_complete(&self, _name: &str, _succeeded: bool) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// CLI progress reporter using indicatif progress bars.
///
/// One bar per stage; it is cleared when the stage completes so log
/// lines stay readable.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: false,
        }
    }

    /// A reporter that never draws (used with `--quiet`).
    pub fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: true,
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "  {spinner:.cyan} {prefix:<12} [{bar:30.cyan/dim}] {pos}/{len} ({eta} remaining)",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }
}

/// Check or cross for a finished item. Colour is dropped when stderr is
/// not a terminal.
fn status_mark(succeeded: bool) -> String {
    let mark = if succeeded {
        style("✓").green()
    } else {
        style("✗").red()
    };
    mark.for_stderr().to_string()
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CliReporter {
    fn on_item_start(&self, index: usize, total: usize, name: &str) {
        if !self.hidden {
            let line = format!("==> [{}/{}] {}", index + 1, total, name);
            eprintln!("{}", style(line).for_stderr().bold());
        }
    }

    fn on_stage_start(&self, stage: Stage, total_steps: usize) {
        let pb = ProgressBar::new(total_steps as u64);
        if self.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(Self::stage_style());
        pb.set_prefix(stage.label());
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_stage_progress(&self, _stage: Stage, done: usize) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(done as u64);
            }
        }
    }

    fn on_stage_complete(&self, _stage: Stage) {
        self.finish_bar();
    }

    fn on_item_complete(&self, name: &str, succeeded: bool) {
        self.finish_bar();
        if self.hidden {
            return;
        }
        eprintln!("  {} {name}", status_mark(succeeded));
    }
}
