//! Test harness and fixtures.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use lapin_catalog::{AttackId, Catalog, DefenseId, StatCategory};

use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::engine::{AttackRequest, Engine, QueueReceipt};
use crate::error::EngineResult;
use crate::queue::EffectTarget;
use crate::record::{OwnedAttack, OwnedDefense, PlayerRecord};
use crate::store::{MemoryStore, PlayerStore};

// =============================================================================
// Harness
// =============================================================================

/// An engine on a manual clock and an in-memory store.
pub struct Harness {
    pub engine: Engine,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
}

/// Fixed start instant so timestamps are reproducible.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Harness with the default config and a fixed seed.
pub fn harness(seed: u64) -> Harness {
    harness_with(EngineConfig::with_seed(seed))
}

/// Harness with an explicit config.
pub fn harness_with(config: EngineConfig) -> Harness {
    let catalog = Arc::new(Catalog::load_embedded().unwrap());
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(epoch()));
    let engine = Engine::with_clock(
        catalog,
        Arc::clone(&store) as Arc<dyn PlayerStore>,
        config,
        Arc::clone(&clock) as Arc<dyn crate::clock::Clock>,
    );
    Harness {
        engine,
        clock,
        store,
    }
}

impl Harness {
    /// Registers every name.
    pub fn register(&self, names: &[&str]) {
        for name in names {
            self.engine.register(name).unwrap();
        }
    }

    /// Loads a stored record as is, without settling.
    pub fn record(&self, name: &str) -> PlayerRecord {
        self.store.load(name).unwrap()
    }

    /// Edits a stored record in place.
    pub fn edit(&self, name: &str, edit: impl FnOnce(&mut PlayerRecord)) {
        let mut record = self.record(name);
        edit(&mut record);
        self.store.commit(&[record]).unwrap();
    }

    /// Puts `count` unused cards of `attack` in the player's hand.
    pub fn give_cards(&self, name: &str, attack: u32, count: usize) {
        let now = self.clock_now();
        self.edit(name, |record| {
            for _ in 0..count {
                record.attacks.push(OwnedAttack::new(AttackId::new(attack), now));
            }
        });
    }

    /// Adds a defense to the player, after any already owned.
    pub fn give_defense(&self, name: &str, defense: u32) {
        let now = self.clock_now();
        self.edit(name, |record| {
            record.defenses.push(OwnedDefense {
                defense_id: DefenseId::new(defense),
                acquired_at: now,
            });
        });
    }

    /// Queues `attack` from `attacker` onto `target`, aimed at the elo of `stat`.
    pub fn queue(
        &self,
        attacker: &str,
        target: &str,
        attack: u32,
        stat: Option<StatCategory>,
    ) -> EngineResult<QueueReceipt> {
        self.queue_on(attacker, target, attack, stat, EffectTarget::Elo)
    }

    /// Queues with an explicit effect target.
    pub fn queue_on(
        &self,
        attacker: &str,
        target: &str,
        attack: u32,
        stat: Option<StatCategory>,
        effect_target: EffectTarget,
    ) -> EngineResult<QueueReceipt> {
        self.engine.queue_attack(
            attacker,
            &AttackRequest {
                target_username: target.to_string(),
                attack_id: AttackId::new(attack),
                target_stat: stat,
                effect_target,
            },
        )
    }

    fn clock_now(&self) -> DateTime<Utc> {
        crate::clock::Clock::now(self.clock.as_ref())
    }
}
