//! Stat categories and category sets.
//!
//! Every player advances five independent skill categories. Each category is
//! serialized with the key the account documents have always used
//! (`travail`, `sport`, `creation`, `lecture`, `adaptabilite`), while the Rust
//! names follow the English glossary.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// One of the five skill categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StatCategory {
    /// Work (`travail`)
    #[serde(rename = "travail")]
    Work = 0,
    /// Sport (`sport`)
    #[serde(rename = "sport")]
    Sport = 1,
    /// Creation (`creation`)
    #[serde(rename = "creation")]
    Creation = 2,
    /// Reading (`lecture`)
    #[serde(rename = "lecture")]
    Reading = 3,
    /// Adaptability (`adaptabilite`)
    #[serde(rename = "adaptabilite")]
    Adaptability = 4,
}

impl StatCategory {
    /// Total number of categories.
    pub const COUNT: usize = 5;

    /// Get all categories in their canonical order.
    #[must_use]
    pub const fn all() -> &'static [StatCategory] {
        &[
            StatCategory::Work,
            StatCategory::Sport,
            StatCategory::Creation,
            StatCategory::Reading,
            StatCategory::Adaptability,
        ]
    }

    /// Get the index of this category.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The storage key for this category.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Work => "travail",
            Self::Sport => "sport",
            Self::Creation => "creation",
            Self::Reading => "lecture",
            Self::Adaptability => "adaptabilite",
        }
    }

    /// The single-member set for this category.
    #[must_use]
    pub const fn as_set(self) -> CategorySet {
        match self {
            Self::Work => CategorySet::WORK,
            Self::Sport => CategorySet::SPORT,
            Self::Creation => CategorySet::CREATION,
            Self::Reading => CategorySet::READING,
            Self::Adaptability => CategorySet::ADAPTABILITY,
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when a string names no stat category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stat category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for StatCategory {
    type Err = UnknownCategory;

    /// Accepts the storage keys and the English names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "travail" | "work" => Ok(Self::Work),
            "sport" => Ok(Self::Sport),
            "creation" => Ok(Self::Creation),
            "lecture" | "reading" => Ok(Self::Reading),
            "adaptabilite" | "adaptability" => Ok(Self::Adaptability),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

bitflags! {
    /// A set of stat categories.
    ///
    /// Used for title bonuses that span several categories and for flags
    /// that either target one category or all of them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CategorySet: u8 {
        /// Work
        const WORK = 1 << 0;
        /// Sport
        const SPORT = 1 << 1;
        /// Creation
        const CREATION = 1 << 2;
        /// Reading
        const READING = 1 << 3;
        /// Adaptability
        const ADAPTABILITY = 1 << 4;
    }
}

impl CategorySet {
    /// Set for an optional category: `None` means every category.
    #[must_use]
    pub fn scoped(category: Option<StatCategory>) -> Self {
        category.map_or(Self::all(), StatCategory::as_set)
    }

    /// Returns true if the set covers `category`.
    #[must_use]
    pub fn covers(self, category: StatCategory) -> bool {
        self.contains(category.as_set())
    }
}

impl From<StatCategory> for CategorySet {
    fn from(category: StatCategory) -> Self {
        category.as_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_all_order() {
        for (i, category) in StatCategory::all().iter().enumerate() {
            assert_eq!(category.index(), i);
        }
        assert_eq!(StatCategory::all().len(), StatCategory::COUNT);
    }

    #[test]
    fn parses_storage_keys_and_english_names() {
        assert_eq!("travail".parse::<StatCategory>(), Ok(StatCategory::Work));
        assert_eq!("Reading".parse::<StatCategory>(), Ok(StatCategory::Reading));
        assert_eq!(
            "adaptabilite".parse::<StatCategory>(),
            Ok(StatCategory::Adaptability)
        );
        assert!("cuisine".parse::<StatCategory>().is_err());
    }

    #[test]
    fn display_uses_storage_key() {
        assert_eq!(StatCategory::Reading.to_string(), "lecture");
    }

    #[test]
    fn scoped_none_covers_everything() {
        let all = CategorySet::scoped(None);
        for category in StatCategory::all() {
            assert!(all.covers(*category));
        }
        let sport = CategorySet::scoped(Some(StatCategory::Sport));
        assert!(sport.covers(StatCategory::Sport));
        assert!(!sport.covers(StatCategory::Work));
    }
}
