//! Core type definitions for the LETHE forgetting engine.
//!
//! All record and result types are serializable so an external layer can
//! snapshot engine state or ship results over its own transport.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decay;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Caller-supplied identifier of a tracked memory.
///
/// Opaque to the engine; it only needs to be unique and stable for the
/// life of the record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(pub String);

impl MemoryId {
    /// Wrap any string-like value as a memory ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemoryId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for MemoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// Lets the record table be queried with a plain `&str`.
impl Borrow<str> for MemoryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Freshness tier, derived purely from days since last access.
///
/// Ordered from freshest to stalest: `Hot < Warm < Cold < Frozen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Recently accessed; slowest decay.
    Hot,
    /// Idle past the warm threshold.
    Warm,
    /// Idle past the cold threshold; fastest decay.
    Cold,
    /// Idle past the frozen threshold; archive candidate.
    Frozen,
}

impl Tier {
    /// Every tier, freshest first.
    pub const ALL: [Self; 4] = [Self::Hot, Self::Warm, Self::Cold, Self::Frozen];

    /// Lowercase name used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
            Self::Frozen => "frozen",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Per-memory decay state held by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Caller-supplied identifier.
    pub id: MemoryId,
    /// Most recent access, registration or reactivation.
    pub last_access_time: DateTime<Utc>,
    /// Registration time. Never changes.
    pub created_at: DateTime<Utc>,
    /// Number of successful accesses.
    pub access_count: u64,
    /// Remaining vitality in `[0, 100]`.
    pub energy_value: f64,
    /// Tier as of the last recomputation.
    pub tier: Tier,
    /// Whether the record needs paid reactivation.
    pub is_dormant: bool,
}

impl MemoryRecord {
    /// A freshly registered record: hot, awake, never accessed.
    #[must_use]
    pub fn new(id: MemoryId, initial_energy: f64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            last_access_time: now,
            created_at: now,
            access_count: 0,
            energy_value: decay::clamp_energy(initial_energy),
            tier: Tier::Hot,
            is_dormant: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// Outcome of evaluating the decay law against one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayResult {
    /// Which record was evaluated.
    pub id: MemoryId,
    /// Energy before this evaluation.
    pub old_energy: f64,
    /// Energy after this evaluation.
    pub new_energy: f64,
    /// Tier before this evaluation.
    pub old_tier: Tier,
    /// Tier after this evaluation.
    pub new_tier: Tier,
    /// Fractional days between last access and the evaluation instant.
    pub days_since_access: f64,
    /// Dormancy after this evaluation.
    pub is_dormant: bool,
    /// Frozen with less than half its energy left.
    pub should_archive: bool,
    /// Auto-delete is enabled and both deletion gates are crossed.
    pub should_delete: bool,
}

/// Outcome of a paid reactivation attempt.
///
/// Failures are expected business outcomes and are reported here with
/// `success == false` rather than as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactivationResult {
    /// Whether the record was reactivated.
    pub success: bool,
    /// Energy points added to the record.
    pub energy_restored: f64,
    /// Cost charged; zero on failure.
    pub cost_paid: f64,
    /// Tier after reactivation, or the unchanged tier on failure.
    /// `None` when the record does not exist.
    pub new_tier: Option<Tier>,
    /// Human-readable outcome.
    pub message: String,
}

impl ReactivationResult {
    pub(crate) fn failure(new_tier: Option<Tier>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            energy_restored: 0.0,
            cost_paid: 0.0,
            new_tier,
            message: message.into(),
        }
    }
}

/// A record the batch sweep attempted but could not evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayFailure {
    /// Which record failed.
    pub id: MemoryId,
    /// Error message.
    pub reason: String,
}

/// Result of a full decay sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchDecay {
    /// Successful evaluations, ordered by ID.
    pub results: Vec<DecayResult>,
    /// Records that vanished or failed mid-sweep.
    pub failures: Vec<DecayFailure>,
}

impl BatchDecay {
    /// Results flagged for archival.
    pub fn archived(&self) -> impl Iterator<Item = &DecayResult> {
        self.results.iter().filter(|r| r.should_archive)
    }

    /// Results flagged for deletion.
    pub fn deleted(&self) -> impl Iterator<Item = &DecayResult> {
        self.results.iter().filter(|r| r.should_delete)
    }
}

/// Aggregate view over every record in an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Number of records.
    pub total: usize,
    /// Records currently in the hot tier.
    pub hot: usize,
    /// Records currently in the warm tier.
    pub warm: usize,
    /// Records currently in the cold tier.
    pub cold: usize,
    /// Records currently in the frozen tier.
    pub frozen: usize,
    /// Records flagged dormant.
    pub dormant: usize,
    /// Mean energy across all records; `0.0` when empty.
    pub average_energy: f64,
}

impl EngineStats {
    /// Count of records in `tier`.
    #[must_use]
    pub const fn count(&self, tier: Tier) -> usize {
        match tier {
            Tier::Hot => self.hot,
            Tier::Warm => self.warm,
            Tier::Cold => self.cold,
            Tier::Frozen => self.frozen,
        }
    }
}
