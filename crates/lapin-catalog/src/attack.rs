//! Attack cards and their effect tags.
//!
//! An attack is plain immutable data. Its behavior is selected by the closed
//! [`EffectKind`] tag; the resolver in `lapin-core` dispatches on the tag's
//! [`EffectFamily`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stat::StatCategory;

/// Catalog identifier of an attack.
///
/// # Example
///
/// ```
/// use lapin_catalog::AttackId;
///
/// let id = AttackId::new(7);
/// assert_eq!(id.as_u32(), 7);
/// assert!(AttackId::new(1) < id);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttackId(u32);

impl AttackId {
    /// Creates a new `AttackId` from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value of this identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttackId({})", self.0)
    }
}

impl fmt::Display for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AttackId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Effect tag carried by an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Lower the targeted stat's elo or xp.
    StatReduce,
    /// Lower elo or xp of a category, drawn at random when none is given.
    RandomStatLoss,
    /// Lower the targeted stat's elo.
    EloLoss,
    /// Move elo from the target's stat to the attacker's same stat.
    EloSteal,
    /// Lower elo once a day for `duration_hours / 24` days.
    EloPoison,
    /// Missions in the category take longer.
    MissionDelay,
    /// Missions in the category yield less.
    MissionHandicap,
    /// Missions in the category cost more energy.
    MissionCost,
    /// Missions in the category are cancelled on completion.
    MissionCancel,
    /// Remove energy from the target's pool.
    EnergyDrain,
    /// Empty the target's energy pool.
    EnergyReset,
    /// The target cannot use attacks in the category.
    AttackBlock,
    /// One of the target's defenses is suppressed.
    DefenseBreak,
}

/// Resolver dispatch family of an [`EffectKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectFamily {
    /// Decrements a stat's elo or xp.
    StatDelta,
    /// Decrements elo, possibly transferring it or spreading it over days.
    RatingDelta,
    /// Records a timed flag for other systems to consult.
    TimedFlag,
    /// Mutates the energy pool.
    PoolDelta,
}

impl EffectKind {
    /// Total number of effect kinds.
    pub const COUNT: usize = 13;

    /// Get all effect kinds.
    #[must_use]
    pub const fn all() -> &'static [EffectKind] {
        &[
            EffectKind::StatReduce,
            EffectKind::RandomStatLoss,
            EffectKind::EloLoss,
            EffectKind::EloSteal,
            EffectKind::EloPoison,
            EffectKind::MissionDelay,
            EffectKind::MissionHandicap,
            EffectKind::MissionCost,
            EffectKind::MissionCancel,
            EffectKind::EnergyDrain,
            EffectKind::EnergyReset,
            EffectKind::AttackBlock,
            EffectKind::DefenseBreak,
        ]
    }

    /// The dispatch family of this kind.
    #[must_use]
    pub const fn family(self) -> EffectFamily {
        match self {
            Self::StatReduce | Self::RandomStatLoss => EffectFamily::StatDelta,
            Self::EloLoss | Self::EloSteal | Self::EloPoison => EffectFamily::RatingDelta,
            Self::MissionDelay
            | Self::MissionHandicap
            | Self::MissionCost
            | Self::MissionCancel
            | Self::AttackBlock
            | Self::DefenseBreak => EffectFamily::TimedFlag,
            Self::EnergyDrain | Self::EnergyReset => EffectFamily::PoolDelta,
        }
    }

    /// Whether resolving this kind needs a concrete stat category.
    ///
    /// `RandomStatLoss` draws one when none is given, flags default to every
    /// category, and pool effects have no category.
    #[must_use]
    pub const fn requires_category(self) -> bool {
        matches!(
            self,
            Self::StatReduce | Self::EloLoss | Self::EloSteal | Self::EloPoison
        )
    }

    /// Whether this kind is one of the mission modifiers.
    #[must_use]
    pub const fn is_mission_flag(self) -> bool {
        matches!(
            self,
            Self::MissionDelay | Self::MissionHandicap | Self::MissionCost | Self::MissionCancel
        )
    }

    /// The tag as written in catalog data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatReduce => "stat_reduce",
            Self::RandomStatLoss => "random_stat_loss",
            Self::EloLoss => "elo_loss",
            Self::EloSteal => "elo_steal",
            Self::EloPoison => "elo_poison",
            Self::MissionDelay => "mission_delay",
            Self::MissionHandicap => "mission_handicap",
            Self::MissionCost => "mission_cost",
            Self::MissionCancel => "mission_cancel",
            Self::EnergyDrain => "energy_drain",
            Self::EnergyReset => "energy_reset",
            Self::AttackBlock => "attack_block",
            Self::DefenseBreak => "defense_break",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attack card definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Unique id in `1..=50`
    pub id: AttackId,
    /// Display name
    pub name: String,
    /// Flavor text
    pub description: String,
    /// Effect tag
    pub effect_type: EffectKind,
    /// Effect magnitude
    pub effect_value: i32,
    /// Category the card is bound to, `None` for global cards
    #[serde(default)]
    pub target_stat: Option<StatCategory>,
    /// 0 for instantaneous cards, otherwise the effect lifetime in hours
    #[serde(default)]
    pub duration_hours: u32,
}

impl Attack {
    /// Shorthand for `self.effect_type.family()`.
    #[must_use]
    pub const fn family(&self) -> EffectFamily {
        self.effect_type.family()
    }

    /// Returns true if the card takes effect immediately.
    #[must_use]
    pub const fn is_instantaneous(&self) -> bool {
        self.duration_hours == 0
    }

    /// Number of daily ticks an `elo_poison` card schedules.
    #[must_use]
    pub const fn poison_ticks(&self) -> u32 {
        let days = self.duration_hours / 24;
        if days == 0 {
            1
        } else {
            days
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_family() {
        assert_eq!(EffectKind::all().len(), EffectKind::COUNT);
        let flags = EffectKind::all()
            .iter()
            .filter(|k| k.family() == EffectFamily::TimedFlag)
            .count();
        assert_eq!(flags, 6);
    }

    #[test]
    fn tags_round_trip_through_serde_names() {
        for kind in EffectKind::all() {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn poison_ticks_one_per_day() {
        let mut attack = Attack {
            id: AttackId::new(1),
            name: "Venin".into(),
            description: String::new(),
            effect_type: EffectKind::EloPoison,
            effect_value: 5,
            target_stat: None,
            duration_hours: 72,
        };
        assert_eq!(attack.poison_ticks(), 3);
        attack.duration_hours = 12;
        assert_eq!(attack.poison_ticks(), 1);
    }
}
