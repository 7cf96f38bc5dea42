//! The forgetting engine: per-memory decay state and its operations.
//!
//! ```text
//!   register ──▶ Hot ──(idle)──▶ Warm ──▶ Cold ──▶ Frozen
//!                 ▲                                  │
//!                 └──── access / reactivate ◀────────┘
//!
//!   dormant: orthogonal flag set by decay, cleared by access/reactivate
//! ```
//!
//! Tiers only move when the engine recomputes them inside `access`,
//! `apply_decay` or `reactivate`. The engine never deletes a record on
//! its own; `should_delete` and `should_archive` are signals for callers.
//!
//! Every time-dependent operation has an `*_at` form taking the
//! evaluation instant explicitly, and [`ForgettingEngine::set_last_access_time`]
//! rewinds a record's clock, so tests can drive the engine deterministically.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::{ForgettingConfig, ForgettingConfigPatch};
use crate::decay;
use crate::error::{LetheError, Result};
use crate::types::{
    BatchDecay, DecayFailure, DecayResult, EngineStats, MemoryId, MemoryRecord,
    ReactivationResult, Tier,
};

/// Energy granted to a record registered without an explicit value.
pub const DEFAULT_INITIAL_ENERGY: f64 = 100.0;

/// Energy added by an access without an explicit boost.
pub const DEFAULT_ACCESS_BOOST: f64 = 10.0;

/// In-process table of memory records plus the policy that decays them.
///
/// Thread-safe: each read-modify-write holds the table's write lock for
/// its whole duration, so two concurrent reactivations of the same record
/// cannot both pass the dormancy check. Share it with `Arc`.
#[derive(Debug, Default)]
pub struct ForgettingEngine {
    records: RwLock<HashMap<MemoryId, MemoryRecord>>,
    config: RwLock<ForgettingConfig>,
}

impl ForgettingEngine {
    /// Create an empty engine with the given policy.
    ///
    /// # Errors
    /// Returns `LetheError::Config` if `config` fails validation.
    pub fn new(config: ForgettingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            records: RwLock::new(HashMap::new()),
            config: RwLock::new(config),
        })
    }

    // -----------------------------------------------------------------------
    // Registration & access
    // -----------------------------------------------------------------------

    /// Register `id` with `initial_energy` (clamped into `[0, 100]`).
    ///
    /// Re-registering an existing ID replaces its state entirely.
    pub fn register(&self, id: impl Into<MemoryId>, initial_energy: f64) -> MemoryRecord {
        self.register_at(id, initial_energy, Utc::now())
    }

    /// Register `id` with full energy.
    pub fn register_default(&self, id: impl Into<MemoryId>) -> MemoryRecord {
        self.register(id, DEFAULT_INITIAL_ENERGY)
    }

    /// [`register`](Self::register) at an explicit instant.
    pub fn register_at(
        &self,
        id: impl Into<MemoryId>,
        initial_energy: f64,
        now: DateTime<Utc>,
    ) -> MemoryRecord {
        let record = MemoryRecord::new(id.into(), initial_energy, now);
        let replaced = self
            .records
            .write()
            .insert(record.id.clone(), record.clone())
            .is_some();

        debug!(
            id = %record.id,
            energy = record.energy_value,
            replaced,
            "Memory registered"
        );
        record
    }

    /// Record an access: refresh the clock, bump the counter, add
    /// `energy_boost`, wake the record and recompute its tier (always hot).
    /// A non-finite boost counts as zero.
    ///
    /// # Errors
    /// Returns `LetheError::NotFound` if `id` is not registered.
    pub fn access(&self, id: &str, energy_boost: f64) -> Result<MemoryRecord> {
        self.access_at(id, energy_boost, Utc::now())
    }

    /// Access with the default boost of 10.
    ///
    /// # Errors
    /// Returns `LetheError::NotFound` if `id` is not registered.
    pub fn access_default(&self, id: &str) -> Result<MemoryRecord> {
        self.access(id, DEFAULT_ACCESS_BOOST)
    }

    /// [`access`](Self::access) at an explicit instant.
    ///
    /// # Errors
    /// Returns `LetheError::NotFound` if `id` is not registered.
    pub fn access_at(&self, id: &str, energy_boost: f64, now: DateTime<Utc>) -> Result<MemoryRecord> {
        let config = self.config.read().clone();
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or_else(|| not_found(id))?;

        record.last_access_time = now;
        record.access_count = record.access_count.saturating_add(1);
        let boost = if energy_boost.is_finite() { energy_boost } else { 0.0 };
        record.energy_value = decay::clamp_energy(record.energy_value + boost);
        record.is_dormant = false;
        record.tier = decay::classify_tier(0.0, &config);

        debug!(
            id = %record.id,
            energy = record.energy_value,
            access_count = record.access_count,
            "Memory accessed"
        );
        Ok(record.clone())
    }

    /// Overwrite a record's last-access time without touching anything else.
    ///
    /// Tier and dormancy catch up on the next decay evaluation.
    ///
    /// # Errors
    /// Returns `LetheError::NotFound` if `id` is not registered.
    pub fn set_last_access_time(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or_else(|| not_found(id))?;
        record.last_access_time = at;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Decay
    // -----------------------------------------------------------------------

    /// Evaluate the decay law for `id` now and store the outcome.
    ///
    /// See [`decay`] for the formula, including why repeated calls
    /// without an intervening access compound.
    ///
    /// # Errors
    /// Returns `LetheError::NotFound` if `id` is not registered.
    pub fn apply_decay(&self, id: &str) -> Result<DecayResult> {
        self.apply_decay_at(id, Utc::now())
    }

    /// [`apply_decay`](Self::apply_decay) at an explicit instant.
    ///
    /// # Errors
    /// Returns `LetheError::NotFound` if `id` is not registered.
    pub fn apply_decay_at(&self, id: &str, now: DateTime<Utc>) -> Result<DecayResult> {
        let config = self.config.read().clone();
        self.decay_one(id, now, &config)
    }

    /// Decay every registered record now.
    ///
    /// Never fails as a whole: a record that cannot be evaluated is left
    /// out of `results` and listed in `failures`.
    pub fn apply_decay_batch(&self) -> BatchDecay {
        self.apply_decay_batch_at(Utc::now())
    }

    /// [`apply_decay_batch`](Self::apply_decay_batch) at an explicit instant.
    pub fn apply_decay_batch_at(&self, now: DateTime<Utc>) -> BatchDecay {
        let config = self.config.read().clone();
        let mut ids: Vec<MemoryId> = self.records.read().keys().cloned().collect();
        ids.sort_unstable();

        self.sweep_ids(ids, now, &config)
    }

    // The table lock is taken per record so other callers interleave with a
    // long sweep; an id that is gone by the time it is reached is a failure.
    fn sweep_ids(&self, ids: Vec<MemoryId>, now: DateTime<Utc>, config: &ForgettingConfig) -> BatchDecay {
        let mut batch = BatchDecay {
            results: Vec::with_capacity(ids.len()),
            failures: Vec::new(),
        };

        for id in ids {
            match self.decay_one(id.as_str(), now, config) {
                Ok(result) => batch.results.push(result),
                Err(err) => {
                    warn!(id = %id, error = %err, "Skipping memory during decay sweep");
                    batch.failures.push(DecayFailure {
                        id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        batch
    }

    fn decay_one(&self, id: &str, now: DateTime<Utc>, config: &ForgettingConfig) -> Result<DecayResult> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or_else(|| not_found(id))?;

        let result = decay::evaluate(record, now, config);
        record.energy_value = result.new_energy;
        record.tier = result.new_tier;
        record.is_dormant = result.is_dormant;

        debug!(
            id = %record.id,
            old_energy = result.old_energy,
            new_energy = result.new_energy,
            tier = %result.new_tier,
            dormant = result.is_dormant,
            "Decay applied"
        );
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Reactivation
    // -----------------------------------------------------------------------

    /// Pay to wake a dormant record.
    ///
    /// Business-rule failures (unknown ID, not dormant, underpaid) come
    /// back with `success == false` and leave the record untouched.
    pub fn reactivate(&self, id: &str, energy_paid: f64) -> ReactivationResult {
        self.reactivate_at(id, energy_paid, Utc::now())
    }

    /// [`reactivate`](Self::reactivate) at an explicit instant.
    pub fn reactivate_at(&self, id: &str, energy_paid: f64, now: DateTime<Utc>) -> ReactivationResult {
        let config = self.config.read().clone();
        let mut records = self.records.write();

        let Some(record) = records.get_mut(id) else {
            return ReactivationResult::failure(None, "Memory not found");
        };
        if !record.is_dormant {
            return ReactivationResult::failure(Some(record.tier), "Memory is not dormant");
        }

        let days = decay::days_between(record.last_access_time, now);
        let cost = decay::reactivation_cost(days, &config);
        if energy_paid.is_nan() || energy_paid < cost {
            debug!(id, cost, paid = energy_paid, "Reactivation underpaid");
            return ReactivationResult::failure(
                Some(record.tier),
                format!("Insufficient energy payment: required {cost:.2}, paid {energy_paid:.2}"),
            );
        }

        let restored = decay::restorable_energy(record.energy_value);
        record.energy_value = decay::clamp_energy(record.energy_value + restored);
        record.last_access_time = now;
        record.is_dormant = false;
        record.tier = decay::classify_tier(0.0, &config);

        debug!(
            id = %record.id,
            cost,
            restored,
            energy = record.energy_value,
            "Memory reactivated"
        );
        ReactivationResult {
            success: true,
            energy_restored: restored,
            cost_paid: cost,
            new_tier: Some(record.tier),
            message: "Memory reactivated".to_string(),
        }
    }

    /// Quote the current reactivation price for `id` without changing it.
    ///
    /// # Errors
    /// Returns `LetheError::NotFound` if `id` is not registered.
    pub fn reactivation_cost(&self, id: &str) -> Result<f64> {
        self.reactivation_cost_at(id, Utc::now())
    }

    /// [`reactivation_cost`](Self::reactivation_cost) at an explicit instant.
    ///
    /// # Errors
    /// Returns `LetheError::NotFound` if `id` is not registered.
    pub fn reactivation_cost_at(&self, id: &str, now: DateTime<Utc>) -> Result<f64> {
        let config = self.config.read().clone();
        let records = self.records.read();
        let record = records.get(id).ok_or_else(|| not_found(id))?;
        Ok(decay::reactivation_cost(
            decay::days_between(record.last_access_time, now),
            &config,
        ))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All records currently flagged dormant, ordered by ID.
    #[must_use]
    pub fn dormant_memories(&self) -> Vec<MemoryRecord> {
        self.collect_where(|r| r.is_dormant)
    }

    /// All records whose stored tier is `tier`, ordered by ID.
    #[must_use]
    pub fn memories_by_tier(&self, tier: Tier) -> Vec<MemoryRecord> {
        self.collect_where(|r| r.tier == tier)
    }

    /// Current state of one record.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<MemoryRecord> {
        self.records.read().get(id).cloned()
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    /// Number of registered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no records are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Counts per tier, dormant count and mean energy.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let records = self.records.read();
        let mut stats = EngineStats {
            total: records.len(),
            ..EngineStats::default()
        };
        let mut energy_sum = 0.0;

        for record in records.values() {
            match record.tier {
                Tier::Hot => stats.hot += 1,
                Tier::Warm => stats.warm += 1,
                Tier::Cold => stats.cold += 1,
                Tier::Frozen => stats.frozen += 1,
            }
            if record.is_dormant {
                stats.dormant += 1;
            }
            energy_sum += record.energy_value;
        }

        if stats.total > 0 {
            stats.average_energy = energy_sum / stats.total as f64;
        }
        stats
    }

    fn collect_where(&self, predicate: impl Fn(&MemoryRecord) -> bool) -> Vec<MemoryRecord> {
        let mut out: Vec<MemoryRecord> = self
            .records
            .read()
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        out.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        out
    }

    // -----------------------------------------------------------------------
    // Configuration & administration
    // -----------------------------------------------------------------------

    /// A copy of the active policy.
    #[must_use]
    pub fn config(&self) -> ForgettingConfig {
        self.config.read().clone()
    }

    /// Install a new policy. Existing records are re-evaluated lazily.
    ///
    /// # Errors
    /// Returns `LetheError::Config` and keeps the old policy if `config`
    /// fails validation.
    pub fn replace_config(&self, config: ForgettingConfig) -> Result<()> {
        config.validate()?;
        *self.config.write() = config;
        debug!("Forgetting config replaced");
        Ok(())
    }

    /// Merge `patch` into the active policy.
    ///
    /// # Errors
    /// Returns `LetheError::Config` and keeps the old policy if the merged
    /// result fails validation.
    pub fn update_config(&self, patch: &ForgettingConfigPatch) -> Result<()> {
        let mut config = self.config.write();
        let merged = config.merged(patch);
        merged.validate()?;
        *config = merged;
        debug!(?patch, "Forgetting config updated");
        Ok(())
    }

    /// Drop every record.
    pub fn clear(&self) {
        let mut records = self.records.write();
        let dropped = records.len();
        records.clear();
        debug!(dropped, "Forgetting engine cleared");
    }

    // -----------------------------------------------------------------------
    // Snapshot / restore
    // -----------------------------------------------------------------------

    /// Copy of every record, ordered by ID, for an external durability layer.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MemoryRecord> {
        self.collect_where(|_| true)
    }

    /// Replace the whole table with `records`. Energies are re-clamped.
    ///
    /// Returns the number of records loaded; later duplicates of an ID win.
    pub fn restore(&self, records: impl IntoIterator<Item = MemoryRecord>) -> usize {
        let table: HashMap<MemoryId, MemoryRecord> = records
            .into_iter()
            .map(|mut r| {
                r.energy_value = decay::clamp_energy(r.energy_value);
                (r.id.clone(), r)
            })
            .collect();
        let loaded = table.len();
        *self.records.write() = table;
        debug!(loaded, "Forgetting engine restored from snapshot");
        loaded
    }

    /// [`snapshot`](Self::snapshot) encoded as JSON.
    ///
    /// # Errors
    /// Returns `LetheError::Serialization` if encoding fails.
    pub fn snapshot_json(&self) -> Result<String> {
        serde_json::to_string(&self.snapshot()).map_err(|e| LetheError::Serialization(e.to_string()))
    }

    /// [`restore`](Self::restore) from JSON produced by
    /// [`snapshot_json`](Self::snapshot_json).
    ///
    /// # Errors
    /// Returns `LetheError::Serialization` if `json` does not decode; the
    /// table is left unchanged in that case.
    pub fn restore_json(&self, json: &str) -> Result<usize> {
        let records: Vec<MemoryRecord> =
            serde_json::from_str(json).map_err(|e| LetheError::Serialization(e.to_string()))?;
        Ok(self.restore(records))
    }
}

fn not_found(id: &str) -> LetheError {
    LetheError::NotFound(MemoryId::from(id))
}
