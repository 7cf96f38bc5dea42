//! # LETHE Core Library
//!
//! In-process forgetting engine for long-lived memory records.
//!
//! Every tracked memory carries an **energy** value in `[0, 100]` that
//! drains while the memory sits idle:
//!
//! - **Tiers** — `hot → warm → cold → frozen`, derived purely from days
//!   since last access; staler tiers drain faster.
//! - **Dormancy** — set when energy or idle time crosses a floor; a dormant
//!   memory needs paid **reactivation**, priced exponentially in whole
//!   months idle.
//! - **Signals** — each decay evaluation reports whether the memory should
//!   be archived or deleted. Acting on them is left to the caller.
//!
//! A [`ForgettingScheduler`] drives full sweeps of a shared
//! [`ForgettingEngine`] on a fixed interval.
//!
//! ```
//! use lethe_core::{ForgettingEngine, Tier};
//!
//! let engine = ForgettingEngine::default();
//! engine.register("m1", 100.0);
//! let result = engine.apply_decay("m1")?;
//! assert_eq!(result.new_tier, Tier::Hot);
//! # Ok::<(), lethe_core::LetheError>(())
//! ```
//!
//! State lives only in process memory. Durability, if needed, is up to
//! the host via [`ForgettingEngine::snapshot`] / [`ForgettingEngine::restore`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod decay;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod types;

pub use config::{ForgettingConfig, ForgettingConfigPatch, LetheConfig, SchedulerConfig};
pub use engine::ForgettingEngine;
pub use error::LetheError;
pub use scheduler::{ForgettingScheduler, TaskReport};
pub use types::*;
