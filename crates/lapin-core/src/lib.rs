//! # Lapin Core
//!
//! Progression and effect-resolution engine for Lapin.
//!
//! Players advance five stat categories, earn one attack card per level and
//! play those cards against each other. Played cards wait in the target's
//! pending queue until the target drains it; each entry is then resolved
//! against the target's defenses and applied at most once.
//!
//! ## Architecture
//!
//! - **Progression**: pure xp, level and title computations
//! - **Resolver**: reads records, produces state changes, applies them
//! - **Queue**: pending entries and drain reports
//! - **Record**: the per-player aggregate and its timed state
//! - **Engine**: the context object the request layer calls into
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use lapin_catalog::Catalog;
//! use lapin_core::{Engine, EngineConfig, MemoryStore};
//!
//! let catalog = Arc::new(Catalog::load_embedded()?);
//! let engine = Engine::new(catalog, Arc::new(MemoryStore::new()), EngineConfig::with_seed(1));
//! engine.register("alice")?;
//! let report = engine.level_up("alice", "travail")?;
//! assert_eq!(report.new_level, 1);
//! assert!(report.attack_gained.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod progression;
pub mod queue;
pub mod record;
pub mod resolver;
pub mod store;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, XpCurve};
pub use engine::{
    parse_stat, parse_target_stat, AttackRequest, Engine, LevelUpReport, OwnedAttackView,
    QueueReceipt, SweepReport, TitleProgress,
};
pub use error::{EngineError, EngineResult};
pub use locks::RecordLocks;
pub use progression::{apply_xp, derive_title, draw_rewards, unlocked_titles, TitleStatus, XpGain};
pub use queue::{DrainReport, EffectDetail, EffectTarget, PendingEffect, PendingStatus, PendingView};
pub use record::{PlayerRecord, StatBlock, StatSheet, StatusFlag};
pub use resolver::{EffectResolver, Outcome, Resolution, StateChange};
pub use store::{MemoryStore, PlayerStore, StoreError};

#[cfg(test)]
mod tests;
