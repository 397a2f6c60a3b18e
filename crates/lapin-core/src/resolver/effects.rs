//! Per-family effect computation.
//!
//! Each function reads the records an effect lands on and returns the state
//! changes it produces. Amounts are clamped against the current state, so the
//! changes describe what will actually move.

use chrono::{DateTime, Duration, Utc};
use lapin_catalog::{Attack, CategorySet, EffectKind, StatCategory};

use crate::queue::EffectTarget;
use crate::record::{PlayerRecord, PoisonEffect, StatusFlag};

use super::StateChange;

/// Where an effect lands after defenses were considered.
pub(super) struct Landing<'r> {
    pub victim: &'r PlayerRecord,
    pub beneficiary: Option<&'r PlayerRecord>,
    pub category: Option<StatCategory>,
    pub magnitude: i32,
    pub effect_target: EffectTarget,
}

/// Elo the victim can lose in `category` before hitting `floor`.
fn removable_elo(victim: &PlayerRecord, category: StatCategory, magnitude: i32, floor: i32) -> i32 {
    victim.stats[category]
        .elo
        .saturating_sub(floor)
        .clamp(0, magnitude.max(0))
}

fn elo_change(player: &PlayerRecord, category: StatCategory, delta: i32) -> Option<StateChange> {
    (delta != 0).then(|| StateChange::Elo {
        player: player.username.clone(),
        category,
        delta,
    })
}

/// `stat_reduce` and `random_stat_loss`: lower elo or xp of one category.
pub(super) fn stat_delta(landing: &Landing<'_>, elo_floor: i32) -> Option<Vec<StateChange>> {
    let category = landing.category?;
    let victim = landing.victim;
    let change = match landing.effect_target {
        EffectTarget::Elo => {
            let removed = removable_elo(victim, category, landing.magnitude, elo_floor);
            elo_change(victim, category, -removed)
        }
        EffectTarget::Level => {
            let xp = i32::try_from(victim.stats[category].xp).unwrap_or(i32::MAX);
            let removed = xp.min(landing.magnitude.max(0));
            (removed != 0).then(|| StateChange::Xp {
                player: victim.username.clone(),
                category,
                delta: -removed,
            })
        }
    };
    Some(change.into_iter().collect())
}

/// `elo_loss`, `elo_steal` and `elo_poison`.
pub(super) fn rating_delta(
    attack: &Attack,
    attacker_name: &str,
    landing: &Landing<'_>,
    elo_floor: i32,
    now: DateTime<Utc>,
) -> Option<Vec<StateChange>> {
    let category = landing.category?;
    let victim = landing.victim;
    let mut changes = Vec::new();

    match attack.effect_type {
        EffectKind::EloPoison => {
            if landing.magnitude > 0 {
                changes.push(StateChange::Poison {
                    player: victim.username.clone(),
                    poison: PoisonEffect {
                        attacker: attacker_name.to_string(),
                        attack_id: attack.id,
                        category,
                        per_tick: landing.magnitude,
                        remaining_ticks: attack.poison_ticks(),
                        next_tick_at: now + Duration::hours(24),
                    },
                });
            }
        }
        EffectKind::EloSteal => {
            let removed = removable_elo(victim, category, landing.magnitude, elo_floor);
            changes.extend(elo_change(victim, category, -removed));
            if let Some(beneficiary) = landing.beneficiary {
                changes.extend(elo_change(beneficiary, category, removed));
            }
        }
        _ => {
            let removed = removable_elo(victim, category, landing.magnitude, elo_floor);
            changes.extend(elo_change(victim, category, -removed));
        }
    }
    Some(changes)
}

/// Mission modifiers, `attack_block` and `defense_break`.
///
/// Returns `None` for a defense break against a player with no defense left
/// to suppress.
pub(super) fn timed_flag(
    attack: &Attack,
    attacker_name: &str,
    landing: &Landing<'_>,
    now: DateTime<Utc>,
) -> Option<Vec<StateChange>> {
    let victim = landing.victim;
    let suppressed_defense = if attack.effect_type == EffectKind::DefenseBreak {
        Some(victim.effective_defenses(now).next()?)
    } else {
        None
    };

    let flag = StatusFlag {
        kind: attack.effect_type,
        categories: CategorySet::scoped(landing.category),
        magnitude: landing.magnitude,
        attacker: attacker_name.to_string(),
        applied_at: now,
        expires_at: now + Duration::hours(i64::from(attack.duration_hours)),
        suppressed_defense,
    };
    Some(vec![StateChange::Flag {
        player: victim.username.clone(),
        flag,
    }])
}

/// `energy_drain` and `energy_reset`.
pub(super) fn pool_delta(landing: &Landing<'_>) -> Vec<StateChange> {
    let removed = i32::from(landing.victim.energy).min(landing.magnitude.max(0));
    if removed == 0 {
        return Vec::new();
    }
    vec![StateChange::Energy {
        player: landing.victim.username.clone(),
        delta: -removed,
    }]
}
