//! Defense selection.
//!
//! At most one defense shapes a resolved attack. Neutralizers (immunity,
//! reflect, wards) are looked for first; only if none covers the effect is a
//! reducer considered. Within each pass the first covering defense in
//! acquisition order wins. Defenses suppressed by an active defense break are
//! skipped.

use chrono::{DateTime, Utc};
use lapin_catalog::{Catalog, Defense, EffectKind};

use crate::record::PlayerRecord;

/// The defense of `target` that applies to an effect of `kind`, if any.
///
/// `hits_elo` tells whether the effect would land on an elo rating.
#[must_use]
pub fn select_defense<'c>(
    catalog: &'c Catalog,
    target: &PlayerRecord,
    kind: EffectKind,
    hits_elo: bool,
    now: DateTime<Utc>,
) -> Option<&'c Defense> {
    let covering: Vec<&Defense> = target
        .effective_defenses(now)
        .filter_map(|id| catalog.defense(id).ok())
        .filter(|d| d.protection_type.covers(kind, hits_elo))
        .collect();

    covering
        .iter()
        .find(|d| d.protection_type.is_neutralizing())
        .or_else(|| covering.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::record::OwnedDefense;
    use lapin_catalog::DefenseId;

    fn holding(ids: &[u32]) -> (Catalog, PlayerRecord) {
        let catalog = Catalog::load_embedded().unwrap();
        let now = Utc::now();
        let mut record = PlayerRecord::new("bob", &catalog, &EngineConfig::default(), now);
        for id in ids {
            record.defenses.push(OwnedDefense {
                defense_id: DefenseId::new(*id),
                acquired_at: now,
            });
        }
        (catalog, record)
    }

    #[test]
    fn no_defense_no_match() {
        let (catalog, record) = holding(&[]);
        assert!(select_defense(&catalog, &record, EffectKind::EloLoss, true, Utc::now()).is_none());
    }

    #[test]
    fn neutralizer_beats_earlier_reducer() {
        // curse_reduce acquired before elo_immunity
        let (catalog, record) = holding(&[3, 1]);
        let picked = select_defense(&catalog, &record, EffectKind::EloLoss, true, Utc::now()).unwrap();
        assert_eq!(picked.id, DefenseId::new(1));
    }

    #[test]
    fn first_neutralizer_in_acquisition_order() {
        let (catalog, record) = holding(&[2, 1]);
        let picked = select_defense(&catalog, &record, EffectKind::EloSteal, true, Utc::now()).unwrap();
        assert_eq!(picked.id, DefenseId::new(2));
    }

    #[test]
    fn immunity_ignores_xp_hits() {
        let (catalog, record) = holding(&[1, 7]);
        let picked =
            select_defense(&catalog, &record, EffectKind::StatReduce, false, Utc::now()).unwrap();
        assert_eq!(picked.id, DefenseId::new(7));
    }

    #[test]
    fn uncovered_kinds_pass_through() {
        let (catalog, record) = holding(&[1, 2, 3]);
        assert!(
            select_defense(&catalog, &record, EffectKind::MissionDelay, false, Utc::now()).is_none()
        );
    }
}
