//! RAII timing for snapshot operations.
//!
//! ```rust,ignore
//! use deploysnap_util::TimingGuard;
//!
//! fn capture(store: &SnapshotStore) {
//!     let _timing = TimingGuard::capture(store.project_path().display().to_string());
//!     // ... stage and commit ...
//!     // duration is logged when _timing is dropped
//! }
//! ```

use std::time::Instant;
use tracing::{debug, info, warn};

const INFO_THRESHOLD_MS: u128 = 100;
const WARN_THRESHOLD_MS: u128 = 5000;

/// Logs the elapsed time of an operation when dropped.
///
/// Fast operations are logged at debug level, slower ones at info, and
/// anything past the warn threshold at warn. Large working trees can make
/// status queries and staging slow, so the warn line is the usual hint that
/// a project directory has grown too big to snapshot comfortably.
pub struct TimingGuard {
    operation: &'static str,
    path: String,
    start: Instant,
}

impl TimingGuard {
    /// Start timing `operation` on `path`, usually a project directory.
    pub fn new(operation: &'static str, path: impl Into<String>) -> Self {
        let path = path.into();
        debug!(operation, path = %path, "Starting operation");
        Self {
            operation,
            path,
            start: Instant::now(),
        }
    }

    /// Guard for a snapshot capture.
    pub fn capture(path: impl Into<String>) -> Self {
        Self::new("capture", path)
    }

    /// Guard for a working-tree status query.
    pub fn status(path: impl Into<String>) -> Self {
        Self::new("status", path)
    }

    /// Guard for store initialization.
    pub fn init(path: impl Into<String>) -> Self {
        Self::new("init", path)
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration_ms = self.elapsed_ms();
        let duration = format_duration(duration_ms);

        if duration_ms >= WARN_THRESHOLD_MS {
            warn!(
                operation = self.operation,
                path = %self.path,
                duration_ms = duration_ms as u64,
                duration = %duration,
                "Slow operation completed"
            );
        } else if duration_ms >= INFO_THRESHOLD_MS {
            info!(
                operation = self.operation,
                path = %self.path,
                duration_ms = duration_ms as u64,
                duration = %duration,
                "Operation completed"
            );
        } else {
            debug!(
                operation = self.operation,
                path = %self.path,
                duration_ms = duration_ms as u64,
                duration = %duration,
                "Operation completed"
            );
        }
    }
}

/// Render milliseconds as `850ms`, `2.50s` or `3m 12.0s`.
pub fn format_duration(duration_ms: u128) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms}ms")
    } else if duration_ms < 60_000 {
        format!("{:.2}s", duration_ms as f64 / 1000.0)
    } else {
        let mins = duration_ms / 60_000;
        let secs = (duration_ms % 60_000) as f64 / 1000.0;
        format!("{mins}m {secs:.1}s")
    }
}
