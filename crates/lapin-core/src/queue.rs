//! Pending effect queue.
//!
//! Each record carries its inbound queue as `Vec<PendingEffect>`, oldest
//! first. Attackers push onto the tail; the target drains from the head.
//!
//! ```text
//! Queued ──drain, not expired──▶ Applied
//!    │
//!    └────expires_at <= now────▶ Expired
//! ```
//!
//! Both terminal states remove the entry from the record in the same commit
//! that accounts for it, so an entry is resolved at most once.

use chrono::{DateTime, Duration, Utc};
use lapin_catalog::{Attack, AttackId, DefenseId, StatCategory};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resolver::Outcome;

/// Whether a stat effect lands on the rating or on experience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectTarget {
    /// The stat's elo
    #[default]
    Elo,
    /// The stat's xp toward the next level
    Level,
}

/// Lifecycle of a pending effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    /// Waiting for the target to drain it
    Queued,
    /// Resolved against the target
    Applied,
    /// Lapsed before the target drained it
    Expired,
}

/// An attack instance waiting in a target's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEffect {
    /// Queue entry id
    pub id: Uuid,
    /// Player who queued the attack
    pub attacker: String,
    /// Catalog attack
    pub attack_id: AttackId,
    /// Category chosen by the attacker
    #[serde(default)]
    pub target_stat: Option<StatCategory>,
    /// Elo or xp, for stat effects
    #[serde(default)]
    pub effect_target: EffectTarget,
    /// When the attack was queued
    pub created_at: DateTime<Utc>,
    /// When the entry lapses, `None` for instantaneous cards
    pub expires_at: Option<DateTime<Utc>>,
}

impl PendingEffect {
    /// Creates a queue entry for `attack`, deriving its expiry.
    #[must_use]
    pub fn new(
        attacker: &str,
        attack: &Attack,
        target_stat: Option<StatCategory>,
        effect_target: EffectTarget,
        created_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = (!attack.is_instantaneous())
            .then(|| created_at + Duration::hours(i64::from(attack.duration_hours)));
        Self {
            id: Uuid::new_v4(),
            attacker: attacker.to_string(),
            attack_id: attack.id,
            target_stat,
            effect_target,
            created_at,
            expires_at,
        }
    }

    /// Returns true once `expires_at` has passed.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Status of an entry still held in a queue.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> PendingStatus {
        if self.is_expired_at(now) {
            PendingStatus::Expired
        } else {
            PendingStatus::Queued
        }
    }
}

/// Splits a queue into live and expired entries, both oldest first.
#[must_use]
pub fn partition_expired(
    pending: Vec<PendingEffect>,
    now: DateTime<Utc>,
) -> (Vec<PendingEffect>, Vec<PendingEffect>) {
    pending.into_iter().partition(|p| !p.is_expired_at(now))
}

/// A queued entry as shown to its target before draining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingView {
    /// Queue entry id
    pub id: Uuid,
    /// Player who queued the attack
    pub attacker: String,
    /// The attack definition
    pub attack: Attack,
    /// Category chosen by the attacker
    pub target_stat: Option<StatCategory>,
    /// Elo or xp
    pub effect_target: EffectTarget,
    /// When the attack was queued
    pub created_at: DateTime<Utc>,
    /// When the entry lapses
    pub expires_at: Option<DateTime<Utc>>,
}

/// How one drained entry was accounted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectDetail {
    /// Queue entry id
    pub pending_id: Uuid,
    /// Player who queued the attack
    pub attacker: String,
    /// Catalog attack
    pub attack_id: AttackId,
    /// Attack display name
    pub attack_name: String,
    /// `Applied` or `Expired`
    pub status: PendingStatus,
    /// Resolution outcome, `None` for expired entries
    pub outcome: Option<Outcome>,
    /// Defense that shaped the outcome
    pub defense: Option<DefenseId>,
}

/// Result of draining a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Entries resolved against the target
    pub total_applied: usize,
    /// Entries that lapsed without effect
    pub total_expired: usize,
    /// One entry per drained effect, in queue order
    pub details: Vec<EffectDetail>,
}

impl DrainReport {
    /// Applied entries a defense neutralized or reflected.
    #[must_use]
    pub fn total_defended(&self) -> usize {
        self.details
            .iter()
            .filter(|d| matches!(d.outcome, Some(Outcome::Neutralized | Outcome::Reflected)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin_catalog::Catalog;

    fn entry(attack: u32, at: DateTime<Utc>) -> PendingEffect {
        let catalog = Catalog::load_embedded().unwrap();
        let attack = catalog.attack(AttackId::new(attack)).unwrap();
        PendingEffect::new("alice", attack, None, EffectTarget::Elo, at)
    }

    mod expiry_tests {
        use super::*;

        #[test]
        fn instantaneous_entries_never_expire() {
            let now = Utc::now();
            let pending = entry(11, now);
            assert_eq!(pending.expires_at, None);
            assert!(!pending.is_expired_at(now + Duration::days(365)));
        }

        #[test]
        fn timed_entries_expire_at_duration() {
            let now = Utc::now();
            let pending = entry(28, now);
            let expires_at = pending.expires_at.unwrap();
            assert_eq!(expires_at, now + Duration::hours(24));
            assert_eq!(pending.status_at(expires_at - Duration::seconds(1)), PendingStatus::Queued);
            assert_eq!(pending.status_at(expires_at), PendingStatus::Expired);
        }

        #[test]
        fn partition_keeps_queue_order() {
            let now = Utc::now();
            let queue = vec![
                entry(28, now - Duration::hours(30)),
                entry(11, now - Duration::hours(20)),
                entry(29, now - Duration::hours(25)),
                entry(12, now),
            ];
            let ids: Vec<_> = queue.iter().map(|p| p.id).collect();
            let (live, expired) = partition_expired(queue, now);
            assert_eq!(live.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[1], ids[3]]);
            assert_eq!(expired.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[0], ids[2]]);
        }
    }

    mod wire_tests {
        use super::*;

        #[test]
        fn effect_target_uses_lowercase_tags() {
            assert_eq!(serde_json::to_string(&EffectTarget::Elo).unwrap(), "\"elo\"");
            assert_eq!(
                serde_json::from_str::<EffectTarget>("\"level\"").unwrap(),
                EffectTarget::Level
            );
        }
    }
}
