//! Configuration for the LETHE forgetting engine.
//!
//! Maps directly to `lethe.toml`:
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [forgetting]
//! warm_threshold_days = 7.0
//! cold_decay_rate = 2.0
//!
//! [scheduler]
//! interval_hours = 24
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LetheError, Result};

/// Top-level LETHE configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LetheConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Decay law, tier thresholds, dormancy and reactivation pricing.
    #[serde(default)]
    pub forgetting: ForgettingConfig,
    /// Periodic sweep settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl LetheConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `LetheError::Config` if the TOML is invalid or the
    /// forgetting or scheduler section fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| LetheError::Config(e.to_string()))?;
        config.forgetting.validate()?;
        config.scheduler.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Decay, tiering, dormancy, reactivation and deletion policy.
///
/// Rates are percent energy lost per elapsed day. Thresholds are days
/// since last access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgettingConfig {
    /// Decay rate while hot.
    #[serde(default = "default_0_5")]
    pub hot_decay_rate: f64,
    /// Decay rate while warm.
    #[serde(default = "default_1_0")]
    pub warm_decay_rate: f64,
    /// Decay rate while cold or frozen.
    #[serde(default = "default_2_0")]
    pub cold_decay_rate: f64,
    /// Days idle before a record turns warm.
    #[serde(default = "default_7_0")]
    pub warm_threshold_days: f64,
    /// Days idle before a record turns cold.
    #[serde(default = "default_30_0")]
    pub cold_threshold_days: f64,
    /// Days idle before a record freezes.
    #[serde(default = "default_90_0")]
    pub frozen_threshold_days: f64,
    /// Energy at or below which a record goes dormant.
    #[serde(default = "default_20_0")]
    pub dormancy_energy_threshold: f64,
    /// Days idle at or beyond which a record goes dormant.
    #[serde(default = "default_60_0")]
    pub dormancy_time_threshold_days: f64,
    /// Reactivation cost for less than one month idle.
    #[serde(default = "default_10_0")]
    pub base_reactivation_cost: f64,
    /// Cost growth factor per whole 30-day month idle.
    #[serde(default = "default_1_5")]
    pub reactivation_cost_multiplier: f64,
    /// Whether decay may signal deletion at all.
    #[serde(default)]
    pub auto_delete_enabled: bool,
    /// Energy at or below which deletion may be signaled.
    #[serde(default = "default_5_0")]
    pub min_energy_for_deletion: f64,
    /// Days idle at or beyond which deletion may be signaled.
    #[serde(default = "default_180_0")]
    pub min_dormancy_days_for_deletion: f64,
}

impl Default for ForgettingConfig {
    fn default() -> Self {
        Self {
            hot_decay_rate: 0.5,
            warm_decay_rate: 1.0,
            cold_decay_rate: 2.0,
            warm_threshold_days: 7.0,
            cold_threshold_days: 30.0,
            frozen_threshold_days: 90.0,
            dormancy_energy_threshold: 20.0,
            dormancy_time_threshold_days: 60.0,
            base_reactivation_cost: 10.0,
            reactivation_cost_multiplier: 1.5,
            auto_delete_enabled: false,
            min_energy_for_deletion: 5.0,
            min_dormancy_days_for_deletion: 180.0,
        }
    }
}

impl ForgettingConfig {
    /// Check ordering and range constraints.
    ///
    /// # Errors
    /// Returns `LetheError::Config` naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("hot_decay_rate", self.hot_decay_rate),
            ("warm_decay_rate", self.warm_decay_rate),
            ("cold_decay_rate", self.cold_decay_rate),
            ("warm_threshold_days", self.warm_threshold_days),
            ("cold_threshold_days", self.cold_threshold_days),
            ("frozen_threshold_days", self.frozen_threshold_days),
            ("dormancy_energy_threshold", self.dormancy_energy_threshold),
            ("dormancy_time_threshold_days", self.dormancy_time_threshold_days),
            ("base_reactivation_cost", self.base_reactivation_cost),
            ("reactivation_cost_multiplier", self.reactivation_cost_multiplier),
            ("min_energy_for_deletion", self.min_energy_for_deletion),
            ("min_dormancy_days_for_deletion", self.min_dormancy_days_for_deletion),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("{name} must be finite")));
        }

        if self.hot_decay_rate < 0.0 {
            return Err(invalid("decay rates must be non-negative"));
        }
        if self.hot_decay_rate > self.warm_decay_rate || self.warm_decay_rate > self.cold_decay_rate {
            return Err(invalid("decay rates must satisfy hot <= warm <= cold"));
        }

        if self.warm_threshold_days <= 0.0
            || self.warm_threshold_days >= self.cold_threshold_days
            || self.cold_threshold_days >= self.frozen_threshold_days
        {
            return Err(invalid("tier thresholds must satisfy 0 < warm < cold < frozen"));
        }

        for (name, energy) in [
            ("dormancy_energy_threshold", self.dormancy_energy_threshold),
            ("min_energy_for_deletion", self.min_energy_for_deletion),
        ] {
            if !(0.0..=100.0).contains(&energy) {
                return Err(invalid(format!("{name} must be within [0, 100]")));
            }
        }

        if self.dormancy_time_threshold_days < 0.0 || self.min_dormancy_days_for_deletion < 0.0 {
            return Err(invalid("day thresholds must be non-negative"));
        }
        if self.base_reactivation_cost < 0.0 {
            return Err(invalid("base_reactivation_cost must be non-negative"));
        }
        if self.reactivation_cost_multiplier < 1.0 {
            return Err(invalid("reactivation_cost_multiplier must be >= 1"));
        }

        Ok(())
    }

    /// Copy of `self` with every `Some` field of `patch` applied.
    ///
    /// The result is not validated; callers that install it should.
    #[must_use]
    pub fn merged(&self, patch: &ForgettingConfigPatch) -> Self {
        let mut next = self.clone();
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $( if let Some(v) = patch.$field { next.$field = v; } )*
            };
        }
        apply!(
            hot_decay_rate,
            warm_decay_rate,
            cold_decay_rate,
            warm_threshold_days,
            cold_threshold_days,
            frozen_threshold_days,
            dormancy_energy_threshold,
            dormancy_time_threshold_days,
            base_reactivation_cost,
            reactivation_cost_multiplier,
            auto_delete_enabled,
            min_energy_for_deletion,
            min_dormancy_days_for_deletion,
        );
        next
    }
}

/// Partial update to a [`ForgettingConfig`]; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ForgettingConfigPatch {
    pub hot_decay_rate: Option<f64>,
    pub warm_decay_rate: Option<f64>,
    pub cold_decay_rate: Option<f64>,
    pub warm_threshold_days: Option<f64>,
    pub cold_threshold_days: Option<f64>,
    pub frozen_threshold_days: Option<f64>,
    pub dormancy_energy_threshold: Option<f64>,
    pub dormancy_time_threshold_days: Option<f64>,
    pub base_reactivation_cost: Option<f64>,
    pub reactivation_cost_multiplier: Option<f64>,
    pub auto_delete_enabled: Option<bool>,
    pub min_energy_for_deletion: Option<f64>,
    pub min_dormancy_days_for_deletion: Option<f64>,
}

/// Periodic sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the host should start the scheduler at boot.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hours between sweeps.
    #[serde(default = "default_24")]
    pub interval_hours: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: 24,
        }
    }
}

impl SchedulerConfig {
    /// Longest accepted sweep interval: one year.
    pub const MAX_INTERVAL_HOURS: u64 = 24 * 366;

    /// Check that `interval_hours` lies in `1..=MAX_INTERVAL_HOURS`.
    ///
    /// # Errors
    /// Returns `LetheError::Config` naming the offending value.
    pub fn validate(&self) -> Result<()> {
        if !(1..=Self::MAX_INTERVAL_HOURS).contains(&self.interval_hours) {
            return Err(invalid(format!(
                "interval_hours must be in 1..={}, got {}",
                Self::MAX_INTERVAL_HOURS,
                self.interval_hours
            )));
        }
        Ok(())
    }

    /// Sweep interval as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.saturating_mul(3600))
    }
}

fn invalid(msg: impl Into<String>) -> LetheError {
    LetheError::Config(msg.into())
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_0_5() -> f64 { 0.5 }
fn default_1_0() -> f64 { 1.0 }
fn default_1_5() -> f64 { 1.5 }
fn default_2_0() -> f64 { 2.0 }
fn default_5_0() -> f64 { 5.0 }
fn default_7_0() -> f64 { 7.0 }
fn default_10_0() -> f64 { 10.0 }
fn default_20_0() -> f64 { 20.0 }
fn default_30_0() -> f64 { 30.0 }
fn default_60_0() -> f64 { 60.0 }
fn default_90_0() -> f64 { 90.0 }
fn default_180_0() -> f64 { 180.0 }
fn default_24() -> u64 { 24 }
