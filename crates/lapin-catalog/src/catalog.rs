//! The catalog store.
//!
//! The catalog is loaded once at startup, validated, and never mutated
//! afterwards. It holds no interior mutability, so sharing it across threads
//! behind an `Arc` needs no locking.
//!
//! # Example
//!
//! ```
//! use lapin_catalog::{AttackId, Catalog};
//!
//! let catalog = Catalog::load_embedded().expect("embedded catalog is valid");
//! assert_eq!(catalog.attacks().len(), 50);
//! assert_eq!(catalog.titles()[0].level_required, 1);
//! assert!(catalog.attack(AttackId::new(51)).is_err());
//! ```

use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::attack::{Attack, AttackId, EffectFamily, EffectKind};
use crate::defense::{Defense, DefenseId};
use crate::error::CatalogError;
use crate::title::Title;

const ATTACKS_JSON: &str = include_str!("../data/attacks.json");
const DEFENSES_JSON: &str = include_str!("../data/defenses.json");
const TITLES_JSON: &str = include_str!("../data/titles.json");

/// Immutable attack, defense and title tables.
#[derive(Debug, Clone)]
pub struct Catalog {
    attacks: Vec<Attack>,
    defenses: Vec<Defense>,
    titles: Vec<Title>,
}

impl Catalog {
    /// Number of attacks in a catalog.
    pub const ATTACK_COUNT: usize = 50;
    /// Number of defenses in a catalog.
    pub const DEFENSE_COUNT: usize = 10;
    /// Number of titles in a catalog.
    pub const TITLE_COUNT: usize = 9;

    /// Loads the catalog compiled into the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded tables are malformed. Callers treat
    /// this as fatal.
    pub fn load_embedded() -> Result<Self, CatalogError> {
        Self::from_json(ATTACKS_JSON, DEFENSES_JSON, TITLES_JSON)
    }

    /// Loads `attacks.json`, `defenses.json` and `titles.json` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or fails validation.
    pub fn load_path(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| CatalogError::Io { path, source })
        };
        Self::from_json(
            &read("attacks.json")?,
            &read("defenses.json")?,
            &read("titles.json")?,
        )
    }

    /// Parses and validates the three tables.
    ///
    /// # Errors
    ///
    /// Returns an error on parse failures, wrong row counts, duplicate or
    /// non-contiguous ids, or rows that break a table invariant.
    pub fn from_json(attacks: &str, defenses: &str, titles: &str) -> Result<Self, CatalogError> {
        let mut attacks: Vec<Attack> = parse("attack", attacks)?;
        let mut defenses: Vec<Defense> = parse("defense", defenses)?;
        let titles: Vec<Title> = parse("title", titles)?;

        attacks.sort_by_key(|a| a.id);
        defenses.sort_by_key(|d| d.id);

        check_count("attack", Self::ATTACK_COUNT, attacks.len())?;
        check_count("defense", Self::DEFENSE_COUNT, defenses.len())?;
        check_count("title", Self::TITLE_COUNT, titles.len())?;

        check_ids("attack", attacks.iter().map(|a| a.id.as_u32()))?;
        check_ids("defense", defenses.iter().map(|d| d.id.as_u32()))?;

        for attack in &attacks {
            validate_attack(attack)?;
        }
        for defense in &defenses {
            if !(0..=100).contains(&defense.effect_value) {
                return Err(invalid("defense", defense.id, "effect_value outside 0..=100"));
            }
        }
        validate_titles(&titles)?;

        info!(
            attacks = attacks.len(),
            defenses = defenses.len(),
            titles = titles.len(),
            "catalog loaded"
        );

        Ok(Self {
            attacks,
            defenses,
            titles,
        })
    }

    /// Looks up an attack.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownAttack`] if no attack has this id.
    pub fn attack(&self, id: AttackId) -> Result<&Attack, CatalogError> {
        // ids are contiguous from 1, so the id is the position plus one
        let index = (id.as_u32() as usize).wrapping_sub(1);
        self.attacks
            .get(index)
            .ok_or(CatalogError::UnknownAttack(id))
    }

    /// Looks up a defense.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownDefense`] if no defense has this id.
    pub fn defense(&self, id: DefenseId) -> Result<&Defense, CatalogError> {
        let index = (id.as_u32() as usize).wrapping_sub(1);
        self.defenses
            .get(index)
            .ok_or(CatalogError::UnknownDefense(id))
    }

    /// Looks up a title by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownTitle`] if no title has this name.
    pub fn title(&self, name: &str) -> Result<&Title, CatalogError> {
        self.titles
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CatalogError::UnknownTitle(name.to_string()))
    }

    /// All attacks, ordered by id.
    #[must_use]
    pub fn attacks(&self) -> &[Attack] {
        &self.attacks
    }

    /// All defenses, ordered by id.
    #[must_use]
    pub fn defenses(&self) -> &[Defense] {
        &self.defenses
    }

    /// All titles, ordered by ascending `level_required`.
    #[must_use]
    pub fn titles(&self) -> &[Title] {
        &self.titles
    }

    /// The lowest title, held by every new player.
    #[must_use]
    pub fn floor_title(&self) -> &Title {
        &self.titles[0]
    }

    /// The highest title whose threshold `total_level` reaches.
    ///
    /// Total: below the first threshold the floor title is returned.
    #[must_use]
    pub fn title_for_level(&self, total_level: u32) -> &Title {
        self.titles
            .iter()
            .rev()
            .find(|t| t.is_unlocked_at(total_level))
            .unwrap_or_else(|| self.floor_title())
    }
}

fn parse<T: DeserializeOwned>(table: &'static str, json: &str) -> Result<Vec<T>, CatalogError> {
    serde_json::from_str(json).map_err(|source| CatalogError::Parse { table, source })
}

fn invalid(table: &'static str, id: impl Display, reason: &str) -> CatalogError {
    CatalogError::Invalid {
        table,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn check_count(table: &'static str, expected: usize, found: usize) -> Result<(), CatalogError> {
    if expected == found {
        Ok(())
    } else {
        Err(CatalogError::WrongCount {
            table,
            expected,
            found,
        })
    }
}

/// Ids must be unique and run `1..=n` once sorted.
fn check_ids(table: &'static str, ids: impl Iterator<Item = u32>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for (position, id) in ids.enumerate() {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                table,
                id: id.to_string(),
            });
        }
        if id as usize != position + 1 {
            return Err(invalid(table, id, "ids must be contiguous from 1"));
        }
    }
    Ok(())
}

fn validate_attack(attack: &Attack) -> Result<(), CatalogError> {
    if attack.name.trim().is_empty() {
        return Err(invalid("attack", attack.id, "empty name"));
    }
    let needs_magnitude = attack.effect_type != EffectKind::EnergyReset
        && attack.effect_type != EffectKind::DefenseBreak;
    if attack.effect_value < 0 || (needs_magnitude && attack.effect_value == 0) {
        return Err(invalid("attack", attack.id, "effect_value must be positive"));
    }
    if attack.family() == EffectFamily::TimedFlag && attack.duration_hours == 0 {
        return Err(invalid("attack", attack.id, "timed flags need a duration"));
    }
    if attack.effect_type == EffectKind::EloPoison && attack.duration_hours < 24 {
        return Err(invalid("attack", attack.id, "poison lasts at least a day"));
    }
    Ok(())
}

fn validate_titles(titles: &[Title]) -> Result<(), CatalogError> {
    let mut names = HashSet::new();
    for title in titles {
        if !names.insert(title.name.as_str()) {
            return Err(CatalogError::DuplicateId {
                table: "title",
                id: title.name.clone(),
            });
        }
    }
    if titles.first().map(|t| t.level_required) != Some(1) {
        return Err(invalid("title", &titles[0].name, "the floor title requires level 1"));
    }
    for pair in titles.windows(2) {
        if pair[1].level_required <= pair[0].level_required {
            return Err(invalid(
                "title",
                &pair[1].name,
                "level_required must strictly increase",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::StatCategory;

    fn embedded() -> Catalog {
        Catalog::load_embedded().unwrap()
    }

    mod load_tests {
        use super::*;

        #[test]
        fn embedded_catalog_has_expected_shape() {
            let catalog = embedded();
            assert_eq!(catalog.attacks().len(), Catalog::ATTACK_COUNT);
            assert_eq!(catalog.defenses().len(), Catalog::DEFENSE_COUNT);
            assert_eq!(catalog.titles().len(), Catalog::TITLE_COUNT);
            assert_eq!(catalog.floor_title().name, "Novice");
        }

        #[test]
        fn embedded_catalog_covers_every_effect_kind() {
            let catalog = embedded();
            for kind in EffectKind::all() {
                assert!(
                    catalog.attacks().iter().any(|a| a.effect_type == *kind),
                    "no attack with effect {kind}"
                );
            }
        }

        #[test]
        fn duplicate_attack_id_is_fatal() {
            let mut attacks: Vec<Attack> = serde_json::from_str(ATTACKS_JSON).unwrap();
            attacks[1].id = AttackId::new(1);
            let json = serde_json::to_string(&attacks).unwrap();
            let err = Catalog::from_json(&json, DEFENSES_JSON, TITLES_JSON).unwrap_err();
            assert!(matches!(err, CatalogError::DuplicateId { table: "attack", .. }));
            assert!(!err.is_lookup_miss());
        }

        #[test]
        fn missing_row_is_fatal() {
            let mut defenses: Vec<Defense> = serde_json::from_str(DEFENSES_JSON).unwrap();
            defenses.pop();
            let json = serde_json::to_string(&defenses).unwrap();
            let err = Catalog::from_json(ATTACKS_JSON, &json, TITLES_JSON).unwrap_err();
            assert!(matches!(
                err,
                CatalogError::WrongCount {
                    expected: 10,
                    found: 9,
                    ..
                }
            ));
        }

        #[test]
        fn unsorted_titles_are_fatal() {
            let mut titles: Vec<Title> = serde_json::from_str(TITLES_JSON).unwrap();
            titles.swap(3, 4);
            let json = serde_json::to_string(&titles).unwrap();
            let err = Catalog::from_json(ATTACKS_JSON, DEFENSES_JSON, &json).unwrap_err();
            assert!(matches!(err, CatalogError::Invalid { table: "title", .. }));
        }

        #[test]
        fn flag_without_duration_is_fatal() {
            let mut attacks: Vec<Attack> = serde_json::from_str(ATTACKS_JSON).unwrap();
            let flag = attacks
                .iter_mut()
                .find(|a| a.effect_type == EffectKind::MissionDelay)
                .unwrap();
            flag.duration_hours = 0;
            let json = serde_json::to_string(&attacks).unwrap();
            assert!(Catalog::from_json(&json, DEFENSES_JSON, TITLES_JSON).is_err());
        }

        #[test]
        fn malformed_json_is_fatal() {
            let err = Catalog::from_json("[{", DEFENSES_JSON, TITLES_JSON).unwrap_err();
            assert!(matches!(err, CatalogError::Parse { table: "attack", .. }));
        }

        #[test]
        fn load_path_reports_missing_files() {
            let err = Catalog::load_path("/nonexistent/catalog").unwrap_err();
            assert!(matches!(err, CatalogError::Io { .. }));
        }
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn attack_lookup_by_id() {
            let catalog = embedded();
            for id in 1..=50 {
                assert_eq!(catalog.attack(AttackId::new(id)).unwrap().id.as_u32(), id);
            }
            assert!(matches!(
                catalog.attack(AttackId::new(0)),
                Err(CatalogError::UnknownAttack(_))
            ));
            assert!(catalog.attack(AttackId::new(51)).is_err());
        }

        #[test]
        fn defense_lookup_by_id() {
            let catalog = embedded();
            assert!(catalog.defense(DefenseId::new(10)).is_ok());
            let err = catalog.defense(DefenseId::new(11)).unwrap_err();
            assert!(err.is_lookup_miss());
        }

        #[test]
        fn title_lookup_by_name() {
            let catalog = embedded();
            assert_eq!(catalog.title("Légende").unwrap().level_required, 150);
            assert!(catalog.title("Empereur").is_err());
        }

        #[test]
        fn title_for_level_is_total() {
            let catalog = embedded();
            assert_eq!(catalog.title_for_level(0).name, "Novice");
            assert_eq!(catalog.title_for_level(1).name, "Novice");
            assert_eq!(catalog.title_for_level(5).name, "Initié");
            assert_eq!(catalog.title_for_level(149).name, "Champion");
            assert_eq!(catalog.title_for_level(10_000).name, "Légende");
        }

        #[test]
        fn stat_bound_attacks_name_a_category() {
            let catalog = embedded();
            let bound = catalog
                .attacks()
                .iter()
                .filter(|a| a.target_stat == Some(StatCategory::Work))
                .count();
            assert!(bound > 0);
        }
    }

    mod title_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn title_threshold_never_exceeds_level(total in 0u32..1_000) {
                let catalog = embedded();
                let title = catalog.title_for_level(total);
                prop_assert!(title.level_required <= total.max(1));
            }

            #[test]
            fn titles_never_regress(a in 0u32..500, b in 0u32..500) {
                let catalog = embedded();
                let (low, high) = (a.min(b), a.max(b));
                prop_assert!(
                    catalog.title_for_level(low).level_required
                        <= catalog.title_for_level(high).level_required
                );
            }
        }
    }
}
