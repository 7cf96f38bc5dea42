//! Sweep counters and span names.
//!
//! Every decay sweep run by the [`ForgettingScheduler`](crate::scheduler::ForgettingScheduler)
//! bumps a set of lock-free `AtomicU64` counters that can be read at any
//! time or exported as Prometheus text for a host dashboard.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::scheduler::TaskReport;

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Cumulative outcome counters across all sweeps.
#[derive(Debug)]
pub struct SweepCounters {
    /// Sweeps completed.
    pub sweeps: AtomicU64,
    /// Records evaluated successfully.
    pub processed: AtomicU64,
    /// Evaluations that flagged archival.
    pub archived: AtomicU64,
    /// Evaluations that flagged deletion.
    pub deleted: AtomicU64,
    /// Records that could not be evaluated.
    pub errors: AtomicU64,
    /// Wall-clock duration of the most recent sweep in microseconds.
    pub last_sweep_us: AtomicU64,
}

impl SweepCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sweeps: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            archived: AtomicU64::new(0),
            deleted: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            last_sweep_us: AtomicU64::new(0),
        }
    }

    /// Fold one sweep's report into the totals.
    pub fn record(&self, report: &TaskReport, elapsed_us: u64) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(report.processed as u64, Ordering::Relaxed);
        self.archived.fetch_add(report.archived as u64, Ordering::Relaxed);
        self.deleted.fetch_add(report.deleted as u64, Ordering::Relaxed);
        self.errors.fetch_add(report.errors as u64, Ordering::Relaxed);
        self.last_sweep_us.store(elapsed_us, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> SweepSnapshot {
        SweepSnapshot {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            archived: self.archived.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_sweep_us: self.last_sweep_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for SweepCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSnapshot {
    /// Sweeps completed.
    pub sweeps: u64,
    /// Records evaluated.
    pub processed: u64,
    /// Archival signals raised.
    pub archived: u64,
    /// Deletion signals raised.
    pub deleted: u64,
    /// Records skipped on error.
    pub errors: u64,
    /// Duration of the last sweep (μs).
    pub last_sweep_us: u64,
}

impl SweepSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP lethe_sweeps_total Decay sweeps completed\n\
             # TYPE lethe_sweeps_total counter\n\
             lethe_sweeps_total {}\n\
             # HELP lethe_records_processed_total Records evaluated by sweeps\n\
             # TYPE lethe_records_processed_total counter\n\
             lethe_records_processed_total {}\n\
             # HELP lethe_archive_signals_total Sweep results flagged for archival\n\
             # TYPE lethe_archive_signals_total counter\n\
             lethe_archive_signals_total {}\n\
             # HELP lethe_delete_signals_total Sweep results flagged for deletion\n\
             # TYPE lethe_delete_signals_total counter\n\
             lethe_delete_signals_total {}\n\
             # HELP lethe_sweep_errors_total Records skipped by sweeps\n\
             # TYPE lethe_sweep_errors_total counter\n\
             lethe_sweep_errors_total {}\n\
             # HELP lethe_last_sweep_microseconds Duration of the most recent sweep\n\
             # TYPE lethe_last_sweep_microseconds gauge\n\
             lethe_last_sweep_microseconds {}\n",
            self.sweeps,
            self.processed,
            self.archived,
            self.deleted,
            self.errors,
            self.last_sweep_us,
        )
    }
}

// ---------------------------------------------------------------------------
// Tracing Span Names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::span!`.
pub mod spans {
    /// One full decay sweep.
    pub const SWEEP: &str = "lethe::sweep";
    /// The scheduler's timer loop.
    pub const SCHEDULER: &str = "lethe::scheduler";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_default_zero() {
        let snap = SweepCounters::new().snapshot();
        assert_eq!(snap, SweepSnapshot::default());
    }

    #[test]
    fn record_accumulates() {
        let c = SweepCounters::new();
        let report = TaskReport {
            processed: 10,
            archived: 2,
            deleted: 1,
            errors: 0,
        };
        c.record(&report, 120);
        c.record(&report, 80);

        let snap = c.snapshot();
        assert_eq!(snap.sweeps, 2);
        assert_eq!(snap.processed, 20);
        assert_eq!(snap.archived, 4);
        assert_eq!(snap.deleted, 2);
        assert_eq!(snap.last_sweep_us, 80, "gauge keeps only the latest sweep");
    }

    #[test]
    fn prometheus_format_valid() {
        let c = SweepCounters::new();
        c.processed.fetch_add(42, Ordering::Relaxed);
        let prom = c.snapshot().to_prometheus();
        assert!(prom.contains("lethe_records_processed_total 42"));
        assert!(prom.contains("# TYPE lethe_last_sweep_microseconds gauge"));
        assert!(prom.contains("# HELP"));
    }
}
