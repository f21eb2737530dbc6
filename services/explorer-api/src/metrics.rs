//! Application metrics collection and reporting.

use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Metrics collector for the explorer API.
#[derive(Debug)]
pub struct MetricsCollector {
    /// Trigger dispatch
    pub triggers: AtomicU64,
    pub handlers_computed: AtomicU64,
    pub handlers_skipped: AtomicU64,

    /// Exports
    pub exports_started: AtomicU64,
    pub exports_completed: AtomicU64,
    pub exports_failed: AtomicU64,
    pub exports_rejected: AtomicU64,
    pub exported_records: AtomicU64,

    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            triggers: AtomicU64::new(0),
            handlers_computed: AtomicU64::new(0),
            handlers_skipped: AtomicU64::new(0),
            exports_started: AtomicU64::new(0),
            exports_completed: AtomicU64::new(0),
            exports_failed: AtomicU64::new(0),
            exports_rejected: AtomicU64::new(0),
            exported_records: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one dispatched trigger and how long its handlers took.
    pub fn record_trigger(&self, trigger: &'static str, duration_us: u64) {
        self.triggers.fetch_add(1, Ordering::Relaxed);
        counter!("explorer_triggers_total", "trigger" => trigger).increment(1);
        histogram!("explorer_trigger_duration_ms").record(duration_us as f64 / 1000.0);
    }

    /// Record a handler outcome.
    pub fn record_handler(&self, handler: &'static str, computed: bool) {
        if computed {
            self.handlers_computed.fetch_add(1, Ordering::Relaxed);
            counter!("explorer_handlers_computed_total", "handler" => handler).increment(1);
        } else {
            self.handlers_skipped.fetch_add(1, Ordering::Relaxed);
            counter!("explorer_handlers_skipped_total", "handler" => handler).increment(1);
        }
    }

    pub fn record_export_started(&self) {
        self.exports_started.fetch_add(1, Ordering::Relaxed);
        counter!("explorer_exports_started_total").increment(1);
    }

    /// A start refused because the session already has an export running.
    pub fn record_export_rejected(&self) {
        self.exports_rejected.fetch_add(1, Ordering::Relaxed);
        counter!("explorer_exports_rejected_total").increment(1);
    }

    pub fn record_export_finished(&self, records: Option<u64>, duration_ms: f64) {
        match records {
            Some(records) => {
                self.exports_completed.fetch_add(1, Ordering::Relaxed);
                self.exported_records.fetch_add(records, Ordering::Relaxed);
                counter!("explorer_exports_completed_total").increment(1);
                counter!("explorer_exported_records_total").increment(records);
            }
            None => {
                self.exports_failed.fetch_add(1, Ordering::Relaxed);
                counter!("explorer_exports_failed_total").increment(1);
            }
        }
        histogram!("explorer_export_duration_ms").record(duration_ms);
    }

    /// Publish the number of exports in flight.
    pub fn record_active_exports(&self, active: usize) {
        gauge!("explorer_exports_active").set(active as f64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            triggers: self.triggers.load(Ordering::Relaxed),
            handlers_computed: self.handlers_computed.load(Ordering::Relaxed),
            handlers_skipped: self.handlers_skipped.load(Ordering::Relaxed),
            exports_started: self.exports_started.load(Ordering::Relaxed),
            exports_completed: self.exports_completed.load(Ordering::Relaxed),
            exports_failed: self.exports_failed.load(Ordering::Relaxed),
            exports_rejected: self.exports_rejected.load(Ordering::Relaxed),
            exported_records: self.exported_records.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters, served as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub triggers: u64,
    pub handlers_computed: u64,
    pub handlers_skipped: u64,
    pub exports_started: u64,
    pub exports_completed: u64,
    pub exports_failed: u64,
    pub exports_rejected: u64,
    pub exported_records: u64,
}

/// Simple timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_micros() as f64 / 1000.0
    }
}
