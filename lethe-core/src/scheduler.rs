//! Periodic driver for full decay sweeps.
//!
//! `start` runs one sweep right away on the caller's thread, then spawns a
//! tokio task that sweeps again every interval until `stop`. The task is a
//! single sequential loop, so sweeps never overlap: if one overruns the
//! interval the missed ticks are skipped rather than queued.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, info, info_span, warn};

use crate::config::SchedulerConfig;
use crate::engine::ForgettingEngine;
use crate::error::{LetheError, Result};
use crate::metrics::{SweepCounters, spans};
use crate::types::BatchDecay;

/// Aggregate outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Records evaluated successfully.
    pub processed: usize,
    /// Of those, how many were flagged for archival.
    pub archived: usize,
    /// Of those, how many were flagged for deletion.
    pub deleted: usize,
    /// Records that could not be evaluated (e.g. cleared mid-sweep).
    pub errors: usize,
}

impl From<&BatchDecay> for TaskReport {
    fn from(batch: &BatchDecay) -> Self {
        Self {
            processed: batch.results.len(),
            archived: batch.archived().count(),
            deleted: batch.deleted().count(),
            errors: batch.failures.len(),
        }
    }
}

/// Runs [`ForgettingEngine::apply_decay_batch`] on a fixed interval.
///
/// Dropping the scheduler stops its timer.
#[derive(Debug)]
pub struct ForgettingScheduler {
    engine: Arc<ForgettingEngine>,
    counters: Arc<SweepCounters>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ForgettingScheduler {
    /// Wrap an engine. Nothing runs until [`start`](Self::start).
    #[must_use]
    pub fn new(engine: Arc<ForgettingEngine>) -> Self {
        Self {
            engine,
            counters: Arc::new(SweepCounters::new()),
            task: Mutex::new(None),
        }
    }

    /// The engine being swept.
    #[must_use]
    pub fn engine(&self) -> &Arc<ForgettingEngine> {
        &self.engine
    }

    /// Shared sweep counters.
    #[must_use]
    pub fn counters(&self) -> Arc<SweepCounters> {
        Arc::clone(&self.counters)
    }

    /// Sweep now, then every `interval`.
    ///
    /// Starting a scheduler that is already running logs a warning and
    /// does nothing. The first sweep runs without holding the task lock.
    ///
    /// # Errors
    /// `LetheError::Config` for a zero interval or one too large to
    /// schedule, `LetheError::NoRuntime` when called outside a tokio runtime.
    pub fn start(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(LetheError::Config("scheduler interval must be non-zero".into()));
        }
        if self.is_active() {
            warn!("Forgetting scheduler already running; start ignored");
            return Ok(());
        }
        let runtime = Handle::try_current().map_err(|_| LetheError::NoRuntime)?;
        let first_tick = |from: tokio::time::Instant| {
            from.checked_add(interval).ok_or_else(|| {
                LetheError::Config(format!("scheduler interval {interval:?} is too large"))
            })
        };
        first_tick(tokio::time::Instant::now())?;

        run_sweep(&self.engine, &self.counters);

        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!("Forgetting scheduler started concurrently; start ignored");
            return Ok(());
        }

        let engine = Arc::clone(&self.engine);
        let counters = Arc::clone(&self.counters);
        let span = info_span!(spans::SCHEDULER, interval_secs = interval.as_secs());
        let first = first_tick(tokio::time::Instant::now())?;
        *task = Some(runtime.spawn(
            async move {
                let mut ticker = tokio::time::interval_at(first, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    run_sweep(&engine, &counters);
                }
            }
            .instrument(span),
        ));

        info!(interval_secs = interval.as_secs(), "Forgetting scheduler started");
        Ok(())
    }

    /// [`start`](Self::start) with the interval from `config`.
    ///
    /// # Errors
    /// As for [`start`](Self::start).
    pub fn start_with_config(&self, config: &SchedulerConfig) -> Result<()> {
        self.start(config.interval())
    }

    /// Cancel the timer. Safe to call repeatedly.
    ///
    /// A sweep already executing runs to completion.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            info!("Forgetting scheduler stopped");
        }
    }

    /// Whether the timer task is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Run one sweep immediately, bypassing the timer.
    pub fn run_task(&self) -> TaskReport {
        run_sweep(&self.engine, &self.counters)
    }
}

impl Drop for ForgettingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_sweep(engine: &ForgettingEngine, counters: &SweepCounters) -> TaskReport {
    let _span = info_span!(spans::SWEEP).entered();
    let started = Instant::now();

    let batch = engine.apply_decay_batch();
    let report = TaskReport::from(&batch);

    let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    counters.record(&report, elapsed_us);

    info!(
        processed = report.processed,
        archived = report.archived,
        deleted = report.deleted,
        errors = report.errors,
        elapsed_us,
        "Decay sweep complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn scheduler() -> ForgettingScheduler {
        ForgettingScheduler::new(Arc::new(ForgettingEngine::default()))
    }

    #[test]
    fn run_task_reports_counts() {
        let s = scheduler();
        let engine = s.engine();
        engine.register_default("fresh");
        engine.register_default("stale");
        engine
            .set_last_access_time("stale", Utc::now() - ChronoDuration::days(100))
            .expect("set");

        let report = s.run_task();
        assert_eq!(report.processed, 2);
        assert_eq!(report.archived, 1);
        assert_eq!(report.deleted, 0, "auto-delete is off by default");
        assert_eq!(report.errors, 0);
        assert_eq!(s.counters().snapshot().sweeps, 1);
    }

    #[test]
    fn run_task_on_empty_engine() {
        assert_eq!(scheduler().run_task(), TaskReport::default());
    }

    #[test]
    fn start_outside_runtime_fails() {
        let s = scheduler();
        assert!(matches!(s.start(Duration::from_secs(60)), Err(LetheError::NoRuntime)));
        assert!(!s.is_active());
        assert_eq!(s.counters().snapshot().sweeps, 0, "no sweep without a runtime");
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(matches!(
            scheduler().start(Duration::ZERO),
            Err(LetheError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unschedulable_interval_rejected_before_sweeping() {
        let s = scheduler();
        s.engine().register_default("m");
        let config = SchedulerConfig {
            enabled: true,
            interval_hours: u64::MAX,
        };

        assert!(matches!(s.start_with_config(&config), Err(LetheError::Config(_))));
        assert!(!s.is_active());
        assert_eq!(s.counters().snapshot().sweeps, 0, "no sweep for a rejected interval");
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let s = scheduler();
        s.stop();
        s.stop();
        assert!(!s.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn start_sweeps_immediately_then_on_interval() {
        let s = scheduler();
        s.engine().register_default("m");

        s.start(Duration::from_secs(3600)).expect("start");
        assert!(s.is_active());
        assert_eq!(s.counters().snapshot().sweeps, 1);

        tokio::time::sleep(Duration::from_secs(3600) + Duration::from_millis(1)).await;
        assert_eq!(s.counters().snapshot().sweeps, 2);

        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        assert_eq!(s.counters().snapshot().sweeps, 4);
        s.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_ignored() {
        let s = scheduler();
        s.start(Duration::from_secs(60)).expect("start");
        s.start(Duration::from_secs(1)).expect("second start is a no-op");
        assert_eq!(s.counters().snapshot().sweeps, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(s.counters().snapshot().sweeps, 1, "the 1s interval was never installed");
        s.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_future_sweeps() {
        let s = scheduler();
        s.start_with_config(&SchedulerConfig {
            enabled: true,
            interval_hours: 1,
        })
        .expect("start");
        s.stop();
        assert!(!s.is_active());

        tokio::time::sleep(Duration::from_secs(5 * 3600)).await;
        assert_eq!(s.counters().snapshot().sweeps, 1);

        s.start(Duration::from_secs(3600)).expect("restart");
        assert!(s.is_active());
        assert_eq!(s.counters().snapshot().sweeps, 2);
    }
}
