//! Progress indicators for repository synchronization
//!
//! Thin wrappers over `indicatif` with consistent styling. One spinner is
//! shown per repository while `vcsync sync` runs; the VCS progress chunks
//! delivered by the runner's callback become the spinner message.
//!
//! # Environment Variables
//!
//! - `VCSYNC_NO_PROGRESS`: set to any value to hide all progress indicators
//!
//! ```rust
//! use vcsync::utils::progress::MultiProgress;
//!
//! let multi = MultiProgress::hidden();
//! let spinner = multi.add_spinner("libvcs");
//! spinner.set_message("Receiving objects:  42% (420/1000)");
//! spinner.finish_with_message("up to date");
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::constants::NO_PROGRESS_ENV_VAR;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV_VAR).is_ok()
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

/// A spinner with consistent styling.
///
/// Cloning shares the underlying bar, so a clone can be moved into a
/// progress callback while the original is finished by the caller.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a spinner, hidden when progress is disabled.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            inner: bar,
        }
    }

    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Show the last complete status line of a raw progress chunk.
    ///
    /// Git terminates progress updates with `\r` and finished lines with
    /// `\n`; the most recent nonempty segment is the one worth showing.
    pub fn set_chunk(&self, chunk: &str) {
        if let Some(line) =
            chunk.rsplit(['\r', '\n']).map(str::trim).find(|segment| !segment.is_empty())
        {
            self.inner.set_message(line.to_string());
        }
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.inner.message()
    }
}

/// A container stacking one spinner per concurrent operation.
pub struct MultiProgress {
    inner: indicatif::MultiProgress,
}

impl MultiProgress {
    pub fn new() -> Self {
        let inner = indicatif::MultiProgress::new();
        if is_progress_disabled() {
            inner.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self {
            inner,
        }
    }

    /// A container that never draws, used with `--no-progress` and in tests.
    pub fn hidden() -> Self {
        Self {
            inner: indicatif::MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    /// Adds a spinner labelled with `prefix`.
    pub fn add_spinner(&self, prefix: impl Into<String>) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        bar.set_prefix(prefix);
        ProgressBar {
            inner: self.inner.add(bar.inner),
        }
    }
}

impl Default for MultiProgress {
    fn default() -> Self {
        Self::new()
    }
}
