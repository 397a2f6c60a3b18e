//! # Lapin Catalog
//!
//! Immutable catalog tables for Lapin progression: 50 attack cards,
//! 10 defenses and 9 titles, plus the five stat categories they refer to.
//!
//! The catalog is plain data. Behavior is selected by closed tags
//! ([`EffectKind`], [`ProtectionKind`], [`TitleBonus`]) that the engine in
//! `lapin-core` dispatches on.
//!
//! ## Quick Start
//!
//! ```
//! use lapin_catalog::{AttackId, Catalog, EffectFamily};
//!
//! let catalog = Catalog::load_embedded()?;
//! let attack = catalog.attack(AttackId::new(11))?;
//! assert_eq!(attack.family(), EffectFamily::RatingDelta);
//! # Ok::<(), lapin_catalog::CatalogError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attack;
pub mod catalog;
pub mod defense;
pub mod error;
pub mod stat;
pub mod title;

// Re-exports for convenience
pub use attack::{Attack, AttackId, EffectFamily, EffectKind};
pub use catalog::Catalog;
pub use defense::{Defense, DefenseId, ProtectionKind};
pub use error::CatalogError;
pub use stat::{CategorySet, StatCategory, UnknownCategory};
pub use title::{Title, TitleBonus};
