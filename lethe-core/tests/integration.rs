//! Integration Tests — End-to-End Forgetting Flows
//!
//! These tests walk records through complete lifecycles: register → idle →
//! decay → dormancy → paid reactivation, batch sweeps driven by the
//! scheduler, and snapshot/restore round trips through an external layer.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, Utc};

use lethe_core::config::{ForgettingConfigPatch, LetheConfig};
use lethe_core::{ForgettingEngine, ForgettingScheduler, LetheError, Tier};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

// ---------------------------------------------------------------------------
// Warm after ten idle days
// ---------------------------------------------------------------------------

#[test]
fn ten_idle_days_turns_warm() {
    let engine = ForgettingEngine::default();
    engine.register("m1", 100.0);
    engine
        .set_last_access_time("m1", Utc::now() - Duration::days(10))
        .expect("rewind");

    let result = engine.apply_decay("m1").expect("decay");
    assert_eq!(result.old_tier, Tier::Hot);
    assert_eq!(result.new_tier, Tier::Warm);
    assert!(
        (85.0..100.0).contains(&result.new_energy),
        "energy {} outside [85, 100)",
        result.new_energy
    );
    assert!(!result.should_archive);
}

// ---------------------------------------------------------------------------
// Frozen and drained after a hundred idle days
// ---------------------------------------------------------------------------

#[test]
fn hundred_idle_days_freezes_and_archives() {
    let engine = ForgettingEngine::default();
    engine.register("m2", 100.0);
    engine
        .set_last_access_time("m2", Utc::now() - Duration::days(100))
        .expect("rewind");

    let result = engine.apply_decay("m2").expect("decay");
    assert_eq!(result.new_tier, Tier::Frozen);
    assert_eq!(result.new_energy, 0.0);
    assert!(result.should_archive);
    assert!(result.is_dormant);
    assert!(!result.should_delete, "auto-delete is off by default");
}

// ---------------------------------------------------------------------------
// Dormancy → underpaid → paid reactivation
// ---------------------------------------------------------------------------

#[test]
fn dormant_memory_reactivation_flow() {
    let engine = ForgettingEngine::default();
    engine.register_at("m3", 10.0, t0());
    let later = t0() + Duration::days(200);

    let decayed = engine.apply_decay_at("m3", later).expect("decay");
    assert!(decayed.is_dormant);
    assert_eq!(engine.dormant_memories().len(), 1);

    let underpaid = engine.reactivate_at("m3", 1.0, later);
    assert!(!underpaid.success);
    assert!(underpaid.message.contains("Insufficient"), "{}", underpaid.message);
    assert!(engine.status("m3").expect("exists").is_dormant, "no mutation on failure");

    let paid = engine.reactivate_at("m3", 1_000.0, later);
    assert!(paid.success, "{}", paid.message);
    assert!(paid.energy_restored <= 80.0);
    // 200 days → 6 whole months → 10 × 1.5⁶
    assert!((paid.cost_paid - 113.906_25).abs() < 1e-6);

    let record = engine.status("m3").expect("exists");
    assert!(!record.is_dormant);
    assert_eq!(record.tier, Tier::Hot);
    assert!(record.energy_value <= 100.0);
    assert!(engine.dormant_memories().is_empty());

    // Awake again, so a second payment is refused.
    assert!(!engine.reactivate_at("m3", 1_000.0, later).success);
}

#[test]
fn access_unknown_raises_not_found() {
    let engine = ForgettingEngine::default();
    match engine.access_default("missing") {
        Err(LetheError::NotFound(id)) => assert_eq!(id.as_str(), "missing"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Repeated decay charges elapsed time again
// ---------------------------------------------------------------------------

#[test]
fn decay_is_not_incremental_between_evaluations() {
    let engine = ForgettingEngine::default();
    engine.register_at("m", 100.0, t0());

    // Evaluating at day 10 and again at day 20 charges 10 + 20 warm days,
    // not 10 + 10.
    let day10 = engine.apply_decay_at("m", t0() + Duration::days(10)).expect("day 10");
    let day20 = engine.apply_decay_at("m", t0() + Duration::days(20)).expect("day 20");
    assert!((day10.new_energy - 90.0).abs() < 1e-9);
    assert!((day20.new_energy - 70.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Auto-delete signal
// ---------------------------------------------------------------------------

#[test]
fn auto_delete_signals_only_when_enabled() {
    let engine = ForgettingEngine::default();
    engine.register_at("old", 100.0, t0());
    let much_later = t0() + Duration::days(365);

    let result = engine.apply_decay_at("old", much_later).expect("decay");
    assert!(!result.should_delete);

    engine
        .update_config(&ForgettingConfigPatch {
            auto_delete_enabled: Some(true),
            ..ForgettingConfigPatch::default()
        })
        .expect("enable auto-delete");
    let result = engine.apply_decay_at("old", much_later).expect("decay");
    assert!(result.should_delete);
    assert!(engine.contains("old"), "the engine only signals deletion");
}

// ---------------------------------------------------------------------------
// Config loaded from TOML drives the engine
// ---------------------------------------------------------------------------

#[test]
fn toml_config_changes_tiering() {
    let config = LetheConfig::from_toml(
        "[forgetting]\nwarm_threshold_days = 1.0\ncold_threshold_days = 2.0\nfrozen_threshold_days = 3.0\n",
    )
    .expect("parse");
    let engine = ForgettingEngine::new(config.forgetting).expect("valid");
    engine.register_at("m", 100.0, t0());

    let result = engine
        .apply_decay_at("m", t0() + Duration::hours(60))
        .expect("decay");
    assert_eq!(result.new_tier, Tier::Cold);
}

// ---------------------------------------------------------------------------
// Scheduler sweeps a shared engine
// ---------------------------------------------------------------------------

#[test]
fn scheduler_run_task_matches_engine_state() {
    let engine = Arc::new(ForgettingEngine::default());
    let scheduler = ForgettingScheduler::new(Arc::clone(&engine));

    for i in 0..10 {
        let id = format!("m{i}");
        engine.register(id.as_str(), 100.0);
        engine
            .set_last_access_time(&id, Utc::now() - Duration::days(i64::from(i) * 20))
            .expect("rewind");
    }

    let report = scheduler.run_task();
    assert_eq!(report.processed, 10);
    assert_eq!(report.errors, 0);

    let stats = engine.stats();
    assert_eq!(stats.total, 10);
    assert_eq!(report.archived, stats.frozen, "every frozen record here is drained");
    assert_eq!(
        stats.hot + stats.warm + stats.cold + stats.frozen,
        stats.total
    );
}

#[tokio::test]
async fn scheduler_start_stop_in_runtime() {
    let engine = Arc::new(ForgettingEngine::default());
    engine.register_default("m");
    let scheduler = ForgettingScheduler::new(Arc::clone(&engine));

    scheduler.start(std::time::Duration::from_secs(3600)).expect("start");
    assert!(scheduler.is_active());
    assert_eq!(scheduler.counters().snapshot().processed, 1);

    scheduler.stop();
    assert!(!scheduler.is_active());
}

// ---------------------------------------------------------------------------
// Concurrent reactivation charges exactly once
// ---------------------------------------------------------------------------

#[test]
fn concurrent_reactivation_succeeds_once() {
    let engine = Arc::new(ForgettingEngine::default());
    engine.register_at("m", 0.0, t0());
    let later = t0() + Duration::days(90);
    engine.apply_decay_at("m", later).expect("decay");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.reactivate_at("m", 1_000.0, later).success)
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
    assert!((engine.status("m").expect("exists").energy_value - 80.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Snapshot survives an external save/load
// ---------------------------------------------------------------------------

#[test]
fn snapshot_round_trip_through_file() {
    let engine = ForgettingEngine::default();
    engine.register_at("a", 80.0, t0());
    engine.register_at("b", 15.0, t0());
    engine.access_at("a", 5.0, t0() + Duration::days(1)).expect("access");
    engine.apply_decay_at("b", t0() + Duration::days(70)).expect("decay");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lethe_snapshot.json");
    std::fs::write(&path, engine.snapshot_json().expect("encode")).expect("write");

    let restored = ForgettingEngine::default();
    let loaded = restored
        .restore_json(&std::fs::read_to_string(&path).expect("read"))
        .expect("decode");
    assert_eq!(loaded, 2);
    assert_eq!(restored.snapshot(), engine.snapshot());
    assert_eq!(restored.stats(), engine.stats());
}
