//! Export progress as seen by a poller.
//!
//! The reporter never talks to the pipeline. It reads the last fully
//! written year from the session cache, so it can run from any task while
//! an export is in flight and sees whatever marker was last committed.

use serde::{Deserialize, Serialize};
use station_common::{SessionId, YearWindow};
use storage::{CacheNamespace, SessionCache};
use tracing::warn;

/// Progress of an export for a requested year window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Percent complete, within `[0, 100]`.
    pub percent: f64,
    /// `"NN% Completed"`, or empty when nothing has been written yet.
    pub label: String,
    /// True once the last year is written; pollers stop here.
    pub complete: bool,
}

impl ProgressReport {
    pub fn idle() -> Self {
        Self {
            percent: 0.0,
            label: String::new(),
            complete: false,
        }
    }

    /// Progress for a marker within a window.
    ///
    /// No window, no marker or an inverted window report 0% with an empty
    /// label. A single-year window also reports 0%, but is `complete` once
    /// its year is written. The percentage is clamped to `[0, 100]`.
    pub fn compute(marker: Option<i32>, window: Option<YearWindow>) -> Self {
        let (Some(year), Some(window)) = (marker, window) else {
            return Self::idle();
        };
        if window.end <= window.begin {
            return Self {
                complete: window.end == window.begin && year >= window.end,
                ..Self::idle()
            };
        }

        // Caller-supplied bounds: widen before subtracting.
        let span = f64::from(window.end) - f64::from(window.begin);
        let done = f64::from(year) - f64::from(window.begin);
        let percent = (done / span * 100.0).clamp(0.0, 100.0);

        Self {
            percent,
            label: format!("{:.0}% Completed", percent),
            complete: percent >= 100.0,
        }
    }
}

/// Reads export progress from the session cache.
#[derive(Clone)]
pub struct ProgressReporter {
    cache: SessionCache,
}

impl ProgressReporter {
    pub fn new(cache: SessionCache) -> Self {
        Self { cache }
    }

    /// Current progress of `session` over `window`. Never fails: cache errors
    /// are logged and reported as no progress.
    pub async fn progress(&self, session: SessionId, window: Option<YearWindow>) -> ProgressReport {
        let marker = match self.cache.get::<i32>(CacheNamespace::DownloadYear, session).await {
            Ok(marker) => marker,
            Err(e) => {
                warn!(session = %session, error = %e, "Unreadable progress marker");
                None
            }
        };

        ProgressReport::compute(marker, window)
    }
}
