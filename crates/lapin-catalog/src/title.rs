//! Titles unlocked by total level.

use serde::{Deserialize, Serialize};

use crate::stat::{CategorySet, StatCategory};

/// Bonus tag attached to a title.
///
/// Only the xp bonuses change engine behavior. The others are carried for
/// display and have no effect on resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleBonus {
    /// Plain gains
    None,
    /// +`bonus_value`% xp on every category
    AllMissions,
    /// Display only
    AttackStorage,
    /// +`bonus_value`% xp on sport and work
    SportTravail,
    /// +`bonus_value`% xp on reading and creation
    LectureCreation,
    /// Display only
    StatBlock,
    /// Display only
    AttackImmunity,
    /// +`bonus_value`% xp on every category
    Legend,
}

impl TitleBonus {
    /// Returns true if the bonus changes xp gains.
    #[must_use]
    pub fn affects_xp(self) -> bool {
        !self.xp_categories().is_empty()
    }

    /// Categories whose xp gains this bonus boosts.
    #[must_use]
    pub fn xp_categories(self) -> CategorySet {
        match self {
            Self::AllMissions | Self::Legend => CategorySet::all(),
            Self::SportTravail => CategorySet::SPORT | CategorySet::WORK,
            Self::LectureCreation => CategorySet::READING | CategorySet::CREATION,
            Self::None | Self::AttackStorage | Self::StatBlock | Self::AttackImmunity => {
                CategorySet::empty()
            }
        }
    }
}

/// A title definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    /// Total level needed to unlock the title
    pub level_required: u32,
    /// Display name, unique
    pub name: String,
    /// Flavor text
    pub description: String,
    /// Bonus tag
    pub bonus_type: TitleBonus,
    /// Bonus magnitude
    pub bonus_value: u32,
}

impl Title {
    /// Xp bonus percentage this title grants on `category`.
    #[must_use]
    pub fn xp_bonus_percent(&self, category: StatCategory) -> u32 {
        if self.bonus_type.xp_categories().covers(category) {
            self.bonus_value
        } else {
            0
        }
    }

    /// Returns true if `total_level` reaches this title.
    #[must_use]
    pub const fn is_unlocked_at(&self, total_level: u32) -> bool {
        self.level_required <= total_level
    }
}
