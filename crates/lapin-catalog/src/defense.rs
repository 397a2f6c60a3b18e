//! Defense definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attack::{EffectFamily, EffectKind};

/// Catalog identifier of a defense.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefenseId(u32);

impl DefenseId {
    /// Creates a new `DefenseId` from a raw value.
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

impl fmt::Debug for DefenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefenseId({})", self.0)
    }
}

impl fmt::Display for DefenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DefenseId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Protection tag carried by a defense.
///
/// Neutralizing protections cancel or redirect a covered effect; reducing
/// protections scale its magnitude down by `effect_value` percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionKind {
    /// Cancels any elo decrement.
    EloImmunity,
    /// Sends a stat or rating effect back to its attacker.
    Reflect,
    /// Reduces stat, rating and pool decrements by `effect_value` percent.
    CurseReduce,
    /// Cancels mission modifiers.
    MissionWard,
    /// Cancels attack blocks and defense breaks.
    CapabilityWard,
    /// Reduces energy drains by `effect_value` percent.
    EnergyShield,
}

impl ProtectionKind {
    /// Returns true if this protection cancels or redirects rather than scales.
    #[must_use]
    pub const fn is_neutralizing(self) -> bool {
        matches!(
            self,
            Self::EloImmunity | Self::Reflect | Self::MissionWard | Self::CapabilityWard
        )
    }

    /// Returns true if this protection applies to `kind`.
    ///
    /// `hits_elo` tells whether the effect lands on an elo rating; it only
    /// matters for stat effects, which may target xp instead.
    #[must_use]
    pub fn covers(self, kind: EffectKind, hits_elo: bool) -> bool {
        match self {
            Self::EloImmunity => match kind.family() {
                EffectFamily::RatingDelta => true,
                EffectFamily::StatDelta => hits_elo,
                _ => false,
            },
            Self::Reflect => matches!(
                kind.family(),
                EffectFamily::StatDelta | EffectFamily::RatingDelta
            ),
            Self::CurseReduce => matches!(
                kind.family(),
                EffectFamily::StatDelta | EffectFamily::RatingDelta | EffectFamily::PoolDelta
            ),
            Self::MissionWard => kind.is_mission_flag(),
            Self::CapabilityWard => {
                matches!(kind, EffectKind::AttackBlock | EffectKind::DefenseBreak)
            }
            Self::EnergyShield => kind.family() == EffectFamily::PoolDelta,
        }
    }

    /// The tag as written in catalog data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EloImmunity => "elo_immunity",
            Self::Reflect => "reflect",
            Self::CurseReduce => "curse_reduce",
            Self::MissionWard => "mission_ward",
            Self::CapabilityWard => "capability_ward",
            Self::EnergyShield => "energy_shield",
        }
    }
}

impl fmt::Display for ProtectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A defense definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defense {
    /// Unique id in `1..=10`
    pub id: DefenseId,
    /// Display name
    pub name: String,
    /// Flavor text
    pub description: String,
    /// Protection tag
    pub protection_type: ProtectionKind,
    /// Reduction percentage for reducing protections, unused otherwise
    pub effect_value: i32,
}

impl Defense {
    /// Scales `magnitude` by this defense's reduction percentage.
    ///
    /// Neutralizing defenses leave the magnitude untouched; the resolver
    /// handles them before any reduction is considered.
    #[must_use]
    pub fn reduce(&self, magnitude: i32) -> i32 {
        if self.protection_type.is_neutralizing() {
            return magnitude;
        }
        let kept = 100 - self.effect_value.clamp(0, 100);
        magnitude * kept / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defense(protection_type: ProtectionKind, effect_value: i32) -> Defense {
        Defense {
            id: DefenseId::new(1),
            name: "test".into(),
            description: String::new(),
            protection_type,
            effect_value,
        }
    }

    #[test]
    fn curse_reduce_halves() {
        assert_eq!(defense(ProtectionKind::CurseReduce, 50).reduce(30), 15);
        assert_eq!(defense(ProtectionKind::CurseReduce, 50).reduce(25), 12);
    }

    #[test]
    fn neutralizers_do_not_scale() {
        assert_eq!(defense(ProtectionKind::EloImmunity, 50).reduce(30), 30);
    }

    #[test]
    fn elo_immunity_covers_stat_effects_only_on_elo() {
        let immunity = ProtectionKind::EloImmunity;
        assert!(immunity.covers(EffectKind::EloLoss, false));
        assert!(immunity.covers(EffectKind::StatReduce, true));
        assert!(!immunity.covers(EffectKind::StatReduce, false));
        assert!(!immunity.covers(EffectKind::EnergyDrain, false));
    }

    #[test]
    fn wards_cover_their_flags() {
        assert!(ProtectionKind::MissionWard.covers(EffectKind::MissionCancel, false));
        assert!(!ProtectionKind::MissionWard.covers(EffectKind::AttackBlock, false));
        assert!(ProtectionKind::CapabilityWard.covers(EffectKind::DefenseBreak, false));
    }
}
