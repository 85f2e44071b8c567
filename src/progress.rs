// src/progress.rs

//! Progress reporting for the build scheduler.
//!
//! [`scheduler::build_packages_with_progress`] reports against one
//! [`ProgressTracker`]: the length is set to the number of recipes scheduled
//! across every build level, the message is set to the recipe currently
//! building, and the position is incremented by one per completed recipe.
//! `packages build`/`packages update` use [`LogProgress`] so a long-running
//! build leaves a trail in the logs; `build_packages` (no progress argument)
//! uses [`SilentProgress`] for callers that don't care.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::info;

/// Core trait for progress tracking.
///
/// Implementations must be thread-safe: the scheduler currently drives one
/// tracker from a single thread, but nothing prevents a future parallel
/// scheduler from sharing it across worker threads.
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message (e.g. the recipe now building).
    fn set_message(&self, message: &str);

    /// Increment progress by the given amount (recipes completed).
    fn increment(&self, amount: u64);

    /// Set progress to a specific position.
    fn set_position(&self, position: u64);

    /// Set the total number of recipes scheduled for this run.
    fn set_length(&self, length: u64);

    /// Current position.
    fn position(&self) -> u64;

    /// Total length.
    fn length(&self) -> u64;

    /// Finish successfully with a message.
    fn finish_with_message(&self, message: &str);

    /// Finish early because a build failed.
    fn finish_with_error(&self, message: &str);

    /// Whether `finish_with_message`/`finish_with_error` has been called.
    fn is_finished(&self) -> bool;
}

/// No-op tracker for quiet mode and for [`scheduler::build_packages`]'s
/// default, which callers use when they don't want output.
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Logs each status change and every 10% of progress through `tracing`.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
    /// Log an update every `log_interval` recipes, to avoid spamming on a
    /// build with hundreds of scheduled recipes.
    log_interval: u64,
}

impl LogProgress {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length: AtomicU64::new(length),
            finished: AtomicBool::new(false),
            log_interval: std::cmp::max(1, length / 10),
        }
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn increment(&self, amount: u64) {
        let old_pos = self.position.fetch_add(amount, Ordering::Relaxed);
        let new_pos = old_pos + amount;
        let length = self.length.load(Ordering::Relaxed);

        if length > 0 && self.log_interval > 0 {
            let old_interval = old_pos / self.log_interval;
            let new_interval = new_pos / self.log_interval;
            if new_interval > old_interval {
                let percent = (new_pos * 100) / length;
                info!("{}: {}% ({}/{})", self.name, percent, new_pos, length);
            }
        }
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: ERROR - {}", self.name, message);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_progress_tracks_position_without_logging() {
        let progress = SilentProgress::new();
        progress.set_length(100);

        progress.set_message("building foo");
        progress.increment(10);
        assert_eq!(progress.position(), 10);

        progress.set_position(50);
        assert_eq!(progress.position(), 50);

        assert!(!progress.is_finished());
        progress.finish_with_message("built 1 package(s)");
        assert!(progress.is_finished());
    }

    #[test]
    fn log_progress_accumulates_across_recipes() {
        let progress = LogProgress::new("packages build", 4);

        progress.set_message("building main/hello");
        progress.increment(1);
        assert_eq!(progress.position(), 1);

        progress.set_message("building main/world");
        progress.increment(1);
        assert_eq!(progress.position(), 2);

        progress.finish_with_message("built 2 package(s)");
        assert!(progress.is_finished());
    }

    #[test]
    fn log_progress_reports_failure_without_completing_length() {
        let progress = LogProgress::new("packages build", 10);
        progress.increment(3);

        progress.finish_with_error("main/broken failed: build failed for recipe main/broken");
        assert!(progress.is_finished());
        assert_eq!(progress.position(), 3);
        assert_ne!(progress.position(), progress.length());
    }
}
