//! Effect resolver.
//!
//! Resolution is split in two phases:
//! 1. [`EffectResolver::resolve`] reads the attacker and target records and
//!    returns a [`Resolution`]: the outcome, the defense involved and the
//!    list of [`StateChange`]s the effect produces
//! 2. [`EffectResolver::apply_changes`] writes those changes into a working
//!    set of records
//!
//! # Invariants
//!
//! - `resolve` never mutates a record
//! - At most one defense shapes a resolution
//! - Elo never drops below the configured floor, xp never below 0 and energy
//!   stays within `[0, energy_max]`
//! - Given the same records, request and RNG state, `resolve` returns the
//!   same resolution

mod defense;
mod effects;

pub use defense::select_defense;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lapin_catalog::{
    Attack, Catalog, DefenseId, EffectFamily, EffectKind, ProtectionKind, StatCategory,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::queue::EffectTarget;
use crate::record::{PlayerRecord, PoisonEffect, StatusFlag};

use effects::Landing;

/// How a resolved attack turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Landed on the target at full strength
    Applied,
    /// Landed on the target, scaled down by a defense
    Reduced,
    /// Cancelled by a defense
    Neutralized,
    /// Sent back onto the attacker by a defense
    Reflected,
    /// Had nothing to act on
    NoEffect,
}

/// A single mutation produced by a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// Add `delta` to a stat's elo
    Elo {
        /// Player whose record changes
        player: String,
        /// Stat category
        category: StatCategory,
        /// Signed change
        delta: i32,
    },
    /// Add `delta` to a stat's xp
    Xp {
        /// Player whose record changes
        player: String,
        /// Stat category
        category: StatCategory,
        /// Signed change
        delta: i32,
    },
    /// Add `delta` to the energy pool
    Energy {
        /// Player whose record changes
        player: String,
        /// Signed change
        delta: i32,
    },
    /// Record a timed flag
    Flag {
        /// Player whose record changes
        player: String,
        /// The flag
        flag: StatusFlag,
    },
    /// Schedule a poison
    Poison {
        /// Player whose record changes
        player: String,
        /// The poison
        poison: PoisonEffect,
    },
}

impl StateChange {
    /// The player whose record this change touches.
    #[must_use]
    pub fn player(&self) -> &str {
        match self {
            Self::Elo { player, .. }
            | Self::Xp { player, .. }
            | Self::Energy { player, .. }
            | Self::Flag { player, .. }
            | Self::Poison { player, .. } => player,
        }
    }
}

/// Result of resolving one attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// What happened
    pub outcome: Outcome,
    /// Defense that neutralized, reflected or reduced the attack
    pub defense: Option<DefenseId>,
    /// Mutations to apply
    pub changes: Vec<StateChange>,
}

impl Resolution {
    fn defended(outcome: Outcome, defense: DefenseId) -> Self {
        Self {
            outcome,
            defense: Some(defense),
            changes: Vec::new(),
        }
    }

    fn no_effect(defense: Option<DefenseId>) -> Self {
        Self {
            outcome: Outcome::NoEffect,
            defense,
            changes: Vec::new(),
        }
    }
}

/// One attack to resolve against the current records.
#[derive(Debug, Clone, Copy)]
pub struct EffectRequest<'a> {
    /// The attack card
    pub attack: &'a Attack,
    /// Category chosen by the attacker
    pub target_stat: Option<StatCategory>,
    /// Elo or xp, for stat effects
    pub effect_target: EffectTarget,
    /// Name of the player who played the card
    pub attacker_name: &'a str,
    /// The attacker's record, `None` if it no longer exists
    pub attacker: Option<&'a PlayerRecord>,
    /// The target's record
    pub target: &'a PlayerRecord,
    /// Resolution instant
    pub now: DateTime<Utc>,
}

/// Resolves attacks against player records.
#[derive(Debug, Clone, Copy)]
pub struct EffectResolver<'c> {
    catalog: &'c Catalog,
    elo_floor: i32,
    energy_max: u8,
}

impl<'c> EffectResolver<'c> {
    /// Creates a resolver bound to a catalog and the engine's bounds.
    #[must_use]
    pub fn new(catalog: &'c Catalog, config: &EngineConfig) -> Self {
        Self {
            catalog,
            elo_floor: config.elo_floor,
            energy_max: config.energy_max,
        }
    }

    /// Computes the effect of `request` without mutating anything.
    ///
    /// The category is the request's, else the attack's own; a
    /// `random_stat_loss` with neither draws one uniformly from `rng`.
    pub fn resolve<R: Rng + ?Sized>(&self, request: &EffectRequest<'_>, rng: &mut R) -> Resolution {
        let attack = request.attack;
        let kind = attack.effect_type;
        let category = request.target_stat.or(attack.target_stat).or_else(|| {
            (kind == EffectKind::RandomStatLoss)
                .then(|| StatCategory::all()[rng.gen_range(0..StatCategory::COUNT)])
        });
        let hits_elo = match kind.family() {
            EffectFamily::StatDelta => request.effect_target == EffectTarget::Elo,
            EffectFamily::RatingDelta => true,
            EffectFamily::TimedFlag | EffectFamily::PoolDelta => false,
        };

        let defense = select_defense(self.catalog, request.target, kind, hits_elo, request.now);
        let mut victim = request.target;
        let mut beneficiary = request.attacker;
        let mut outcome = Outcome::Applied;

        if let Some(defense) = defense {
            match defense.protection_type {
                ProtectionKind::Reflect => {
                    let Some(attacker) = request.attacker else {
                        return Resolution::defended(Outcome::Neutralized, defense.id);
                    };
                    victim = attacker;
                    beneficiary = Some(request.target);
                    outcome = Outcome::Reflected;
                }
                protection if protection.is_neutralizing() => {
                    return Resolution::defended(Outcome::Neutralized, defense.id);
                }
                _ => outcome = Outcome::Reduced,
            }
        }

        let base = if kind == EffectKind::EnergyReset {
            i32::from(victim.energy)
        } else {
            attack.effect_value
        };
        let magnitude = match defense {
            Some(defense) if outcome == Outcome::Reduced => defense.reduce(base),
            _ => base,
        };

        let landing = Landing {
            victim,
            beneficiary,
            category,
            magnitude,
            effect_target: request.effect_target,
        };
        let changes = match kind.family() {
            EffectFamily::StatDelta => effects::stat_delta(&landing, self.elo_floor),
            EffectFamily::RatingDelta => effects::rating_delta(
                attack,
                request.attacker_name,
                &landing,
                self.elo_floor,
                request.now,
            ),
            EffectFamily::TimedFlag => {
                effects::timed_flag(attack, request.attacker_name, &landing, request.now)
            }
            EffectFamily::PoolDelta => Some(effects::pool_delta(&landing)),
        };

        match changes {
            Some(changes) => Resolution {
                outcome,
                defense: defense.map(|d| d.id),
                changes,
            },
            None => Resolution::no_effect(defense.map(|d| d.id)),
        }
    }

    /// Writes `changes` into the working set. Changes for players absent from
    /// `records` are skipped.
    pub fn apply_changes(&self, changes: &[StateChange], records: &mut BTreeMap<String, PlayerRecord>) {
        for change in changes {
            let Some(record) = records.get_mut(change.player()) else {
                continue;
            };
            match change {
                StateChange::Elo { category, delta, .. } => {
                    record.adjust_elo(*category, *delta, self.elo_floor);
                }
                StateChange::Xp { category, delta, .. } => {
                    record.adjust_xp(*category, *delta);
                }
                StateChange::Energy { delta, .. } => {
                    record.adjust_energy(*delta, self.energy_max);
                }
                StateChange::Flag { flag, .. } => record.flags.push(flag.clone()),
                StateChange::Poison { poison, .. } => record.poisons.push(poison.clone()),
            }
        }
    }
}
