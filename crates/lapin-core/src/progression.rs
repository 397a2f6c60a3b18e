//! Progression calculator.
//!
//! Pure functions over stat blocks and the title table. Nothing here touches
//! a record or the store; the engine calls these while holding the lock.

use lapin_catalog::{AttackId, Catalog, StatCategory, Title};
use rand::Rng;
use serde::Serialize;

use crate::config::XpCurve;
use crate::record::{StatBlock, StatSheet};

/// Result of [`apply_xp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpGain {
    /// The stat after the gain
    pub stat: StatBlock,
    /// Whether at least one level was gained
    pub leveled_up: bool,
    /// Number of thresholds crossed
    pub levels_gained: u32,
}

/// Adds `gained` xp to `stat`, crossing as many thresholds as it covers.
///
/// Each crossing subtracts the threshold, increments the level and grows the
/// threshold along `curve`. The returned stat always has `xp < max_xp`.
#[must_use]
pub fn apply_xp(stat: StatBlock, gained: u32, curve: &XpCurve) -> XpGain {
    let mut next = stat;
    let mut xp = u64::from(stat.xp) + u64::from(gained);
    let mut levels_gained = 0u32;

    while xp >= u64::from(next.max_xp) {
        xp -= u64::from(next.max_xp);
        next.level = next.level.saturating_add(1);
        next.max_xp = curve.next_max_xp(next.max_xp);
        levels_gained += 1;
    }
    // xp < max_xp <= u32::MAX here
    next.xp = u32::try_from(xp).unwrap_or(next.max_xp - 1);

    XpGain {
        stat: next,
        leveled_up: levels_gained > 0,
        levels_gained,
    }
}

/// Draws one reward per level, uniformly over the attack table.
pub fn draw_rewards<R: Rng + ?Sized>(catalog: &Catalog, count: u32, rng: &mut R) -> Vec<AttackId> {
    let attacks = catalog.attacks();
    (0..count)
        .map(|_| attacks[rng.gen_range(0..attacks.len())].id)
        .collect()
}

/// Sum of the five levels.
#[must_use]
pub fn total_level(stats: &StatSheet) -> u32 {
    stats.total_level()
}

/// The title a sheet's total level earns. Never fails: below the first
/// threshold the floor title is returned.
#[must_use]
pub fn derive_title<'a>(catalog: &'a Catalog, stats: &StatSheet) -> &'a Title {
    catalog.title_for_level(total_level(stats))
}

/// One row of a title progress listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleStatus {
    /// The title definition
    #[serde(flatten)]
    pub title: Title,
    /// Whether the total level reaches it
    pub unlocked: bool,
    /// Whether it is the derived title
    pub current: bool,
}

/// Every title, ascending, marked unlocked and current for `total_level`.
///
/// Exactly one row is current: the highest unlocked one.
#[must_use]
pub fn unlocked_titles(catalog: &Catalog, total_level: u32) -> Vec<TitleStatus> {
    let current = catalog.title_for_level(total_level);
    catalog
        .titles()
        .iter()
        .map(|title| TitleStatus {
            title: title.clone(),
            unlocked: title.is_unlocked_at(total_level),
            current: title.name == current.name,
        })
        .collect()
}

/// Xp after the title bonus for `category`, rounded down.
#[must_use]
pub fn with_title_bonus(title: &Title, category: StatCategory, gained: u32) -> u32 {
    if !title.bonus_type.affects_xp() {
        return gained;
    }
    let percent = u64::from(title.xp_bonus_percent(category));
    let boosted = u64::from(gained) * (100 + percent) / 100;
    u32::try_from(boosted).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fresh() -> StatBlock {
        StatBlock::new(100, 1200)
    }

    mod apply_xp_tests {
        use super::*;

        #[test]
        fn gain_below_threshold_accumulates() {
            let gain = apply_xp(fresh(), 40, &XpCurve::default());
            assert!(!gain.leveled_up);
            assert_eq!(gain.stat.xp, 40);
            assert_eq!(gain.stat.level, 0);
        }

        #[test]
        fn exact_threshold_levels_once() {
            let gain = apply_xp(fresh(), 100, &XpCurve::default());
            assert_eq!(gain.levels_gained, 1);
            assert_eq!(gain.stat.level, 1);
            assert_eq!(gain.stat.xp, 0);
            assert_eq!(gain.stat.max_xp, 110);
        }

        #[test]
        fn gain_spanning_two_thresholds() {
            // 100 + 110 = 210 crosses twice with 5 left over
            let gain = apply_xp(fresh(), 215, &XpCurve::default());
            assert_eq!(gain.levels_gained, 2);
            assert_eq!(gain.stat.level, 2);
            assert_eq!(gain.stat.xp, 5);
            assert_eq!(gain.stat.max_xp, 121);
        }

        #[test]
        fn elo_is_untouched() {
            let gain = apply_xp(fresh(), 1_000, &XpCurve::default());
            assert_eq!(gain.stat.elo, 1200);
        }
    }

    mod reward_tests {
        use super::*;

        #[test]
        fn one_valid_reward_per_level() {
            let catalog = Catalog::load_embedded().unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let rewards = draw_rewards(&catalog, 3, &mut rng);
            assert_eq!(rewards.len(), 3);
            for id in rewards {
                assert!((1..=50).contains(&id.as_u32()));
            }
        }

        #[test]
        fn same_seed_same_rewards() {
            let catalog = Catalog::load_embedded().unwrap();
            let a = draw_rewards(&catalog, 10, &mut ChaCha8Rng::seed_from_u64(7));
            let b = draw_rewards(&catalog, 10, &mut ChaCha8Rng::seed_from_u64(7));
            assert_eq!(a, b);
        }
    }

    mod title_tests {
        use super::*;

        #[test]
        fn zero_total_gets_floor_title() {
            let catalog = Catalog::load_embedded().unwrap();
            let stats = StatSheet::uniform(fresh());
            assert_eq!(derive_title(&catalog, &stats).name, "Novice");
            let rows = unlocked_titles(&catalog, 0);
            assert!(rows[0].current);
            assert!(!rows[0].unlocked);
        }

        #[test]
        fn thresholds_select_highest_reached() {
            let catalog = Catalog::load_embedded().unwrap();
            let mut stats = StatSheet::uniform(fresh());
            stats.work.level = 12;
            assert_eq!(derive_title(&catalog, &stats).name, "Disciple");
            stats.sport.level = 8;
            assert_eq!(derive_title(&catalog, &stats).name, "Combattant");
        }

        #[test]
        fn bonus_applies_to_covered_categories() {
            let catalog = Catalog::load_embedded().unwrap();
            let combattant = catalog.title("Combattant").unwrap();
            assert_eq!(with_title_bonus(combattant, StatCategory::Sport, 50), 55);
            assert_eq!(with_title_bonus(combattant, StatCategory::Reading, 50), 50);
            let novice = catalog.floor_title();
            assert_eq!(with_title_bonus(novice, StatCategory::Work, 50), 50);
        }

        #[test]
        fn display_only_titles_leave_xp_alone() {
            let catalog = Catalog::load_embedded().unwrap();
            for name in ["Disciple", "Stratège", "Champion"] {
                let title = catalog.title(name).unwrap();
                for category in StatCategory::all() {
                    assert_eq!(with_title_bonus(title, *category, 80), 80, "{name}");
                }
            }
        }
    }

    proptest! {
        #[test]
        fn xp_stays_below_threshold(start in 0u32..100, gained in 0u32..1_000_000) {
            let stat = StatBlock { xp: start, ..fresh() };
            let gain = apply_xp(stat, gained, &XpCurve::default());
            prop_assert!(gain.stat.xp < gain.stat.max_xp);
            prop_assert!(gain.stat.level >= stat.level);
            prop_assert_eq!(gain.stat.level - stat.level, gain.levels_gained);
            prop_assert_eq!(gain.leveled_up, gain.levels_gained > 0);
        }

        #[test]
        fn title_is_monotonic(a in 0u32..400, b in 0u32..400) {
            let catalog = Catalog::load_embedded().unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                catalog.title_for_level(lo).level_required
                    <= catalog.title_for_level(hi).level_required
            );
        }

        #[test]
        fn exactly_one_current_title(total in 0u32..400) {
            let catalog = Catalog::load_embedded().unwrap();
            let rows = unlocked_titles(&catalog, total);
            let current: Vec<_> = rows.iter().filter(|r| r.current).collect();
            prop_assert_eq!(current.len(), 1);
            let highest_unlocked = rows.iter().rev().find(|r| r.unlocked);
            if let Some(highest) = highest_unlocked {
                prop_assert_eq!(&highest.title.name, &current[0].title.name);
            }
        }
    }
}
