//! Linear energy decay with freshness tiers.
//!
//! A record loses energy in proportion to the days elapsed since it was
//! last accessed, at a rate chosen by its freshness tier:
//!
//! ```text
//! E' = max(0, E - rate(tier) × days_since_access)
//!
//!   days:  0 ── warm ── cold ── frozen ──▶
//!   tier:  Hot │ Warm │ Cold  │ Frozen
//!   rate:  hot   warm   cold    cold
//! ```
//!
//! The law is re-applied to whatever energy remains on every evaluation,
//! using total days since last access rather than days since the previous
//! evaluation. Evaluating the same record twice without an intervening
//! access therefore charges the elapsed time twice. Pricing downstream is
//! calibrated against this curve, so it is kept as-is.
//!
//! Everything here is a pure function of its inputs; the engine owns the
//! state and applies the results.

use chrono::{DateTime, Utc};

use crate::config::ForgettingConfig;
use crate::types::{DecayResult, MemoryRecord, Tier};

/// Upper bound of the energy scale.
pub const MAX_ENERGY: f64 = 100.0;

/// Most energy a single reactivation may restore.
pub const MAX_REACTIVATION_RESTORE: f64 = 80.0;

/// Frozen records below this energy are flagged for archival.
pub const ARCHIVE_ENERGY_CEILING: f64 = 50.0;

/// Days per reactivation-pricing month.
pub const DAYS_PER_MONTH: f64 = 30.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Clamp an energy value into `[0, 100]`. NaN is treated as empty.
#[must_use]
pub fn clamp_energy(energy: f64) -> f64 {
    if energy.is_nan() {
        0.0
    } else {
        energy.clamp(0.0, MAX_ENERGY)
    }
}

/// Fractional days from `since` to `now`.
///
/// Not floored. Negative spans (clock skew) count as zero.
#[must_use]
pub fn days_between(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - since).num_milliseconds();
    (millis as f64 / MILLIS_PER_DAY).max(0.0)
}

/// Classify a record's tier from days since its last access.
///
/// Comparisons are strict, so a record sitting exactly on a threshold
/// belongs to the tier that starts there.
#[must_use]
pub fn classify_tier(days_since_access: f64, config: &ForgettingConfig) -> Tier {
    if days_since_access < config.warm_threshold_days {
        Tier::Hot
    } else if days_since_access < config.cold_threshold_days {
        Tier::Warm
    } else if days_since_access < config.frozen_threshold_days {
        Tier::Cold
    } else {
        Tier::Frozen
    }
}

/// Percent energy lost per day in `tier`. Cold and frozen share a rate.
#[must_use]
pub fn decay_rate(tier: Tier, config: &ForgettingConfig) -> f64 {
    match tier {
        Tier::Hot => config.hot_decay_rate,
        Tier::Warm => config.warm_decay_rate,
        Tier::Cold | Tier::Frozen => config.cold_decay_rate,
    }
}

/// Energy after charging `rate × days` against `energy`, floored at zero.
#[must_use]
pub fn decayed_energy(energy: f64, rate: f64, days_since_access: f64) -> f64 {
    (energy - rate * days_since_access).max(0.0)
}

/// Dormant when either the energy floor or the idle-time floor is crossed.
#[must_use]
pub fn is_dormant(energy: f64, days_since_access: f64, config: &ForgettingConfig) -> bool {
    energy <= config.dormancy_energy_threshold
        || days_since_access >= config.dormancy_time_threshold_days
}

/// Frozen records with less than half their energy go to the archive.
#[must_use]
pub fn should_archive(tier: Tier, energy: f64) -> bool {
    tier == Tier::Frozen && energy < ARCHIVE_ENERGY_CEILING
}

/// Deletion is only signaled when auto-delete is on and both gates pass.
#[must_use]
pub fn should_delete(energy: f64, days_since_access: f64, config: &ForgettingConfig) -> bool {
    config.auto_delete_enabled
        && energy <= config.min_energy_for_deletion
        && days_since_access >= config.min_dormancy_days_for_deletion
}

/// Price of reactivating a record idle for `days_dormant` days.
///
/// ```text
/// cost = base × multiplier ^ floor(days / 30)
/// ```
#[must_use]
pub fn reactivation_cost(days_dormant: f64, config: &ForgettingConfig) -> f64 {
    let months = (days_dormant.max(0.0) / DAYS_PER_MONTH).floor();
    config.base_reactivation_cost * config.reactivation_cost_multiplier.powf(months)
}

/// Energy a reactivation restores: up to 80 points, never past 100.
#[must_use]
pub fn restorable_energy(current_energy: f64) -> f64 {
    (MAX_ENERGY - current_energy).clamp(0.0, MAX_REACTIVATION_RESTORE)
}

/// Evaluate the decay law for `record` at `now` without mutating it.
#[must_use]
pub fn evaluate(record: &MemoryRecord, now: DateTime<Utc>, config: &ForgettingConfig) -> DecayResult {
    let days = days_between(record.last_access_time, now);
    let new_tier = classify_tier(days, config);
    let new_energy = decayed_energy(record.energy_value, decay_rate(new_tier, config), days);

    DecayResult {
        id: record.id.clone(),
        old_energy: record.energy_value,
        new_energy,
        old_tier: record.tier,
        new_tier,
        days_since_access: days,
        is_dormant: is_dormant(new_energy, days, config),
        should_archive: should_archive(new_tier, new_energy),
        should_delete: should_delete(new_energy, days, config),
    }
}
