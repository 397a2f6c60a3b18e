//! The player progression record.
//!
//! A [`PlayerRecord`] is the mutable aggregate every engine operation works
//! on: five stat blocks, owned attack cards, owned defenses, the inbound
//! pending queue, timed flags, poisons, the energy pool and the cached
//! title. One record exists per account and is persisted whole.
//!
//! # Invariants
//!
//! - `0 <= xp < max_xp` for every stat outside a level-up computation
//! - `elo >= elo_floor` for every stat
//! - `energy <= energy_max`
//! - `defenses` holds each defense id at most once, in acquisition order
//! - `current_title` is the title derived from the total level

use std::ops::{Index, IndexMut};

use chrono::{DateTime, Duration, Utc};
use lapin_catalog::{AttackId, Catalog, CategorySet, DefenseId, EffectKind, StatCategory};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::queue::PendingEffect;

/// Level, experience and rating of one stat category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    /// Current level
    pub level: u32,
    /// Experience toward the next level
    pub xp: u32,
    /// Experience needed for the next level
    #[serde(rename = "maxXp")]
    pub max_xp: u32,
    /// Competitive rating
    pub elo: i32,
}

impl StatBlock {
    /// A level-0 stat block.
    #[must_use]
    pub const fn new(max_xp: u32, elo: i32) -> Self {
        Self {
            level: 0,
            xp: 0,
            max_xp,
            elo,
        }
    }
}

/// The five stat blocks of a player, keyed by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSheet {
    /// Work
    #[serde(rename = "travail")]
    pub work: StatBlock,
    /// Sport
    pub sport: StatBlock,
    /// Creation
    pub creation: StatBlock,
    /// Reading
    #[serde(rename = "lecture")]
    pub reading: StatBlock,
    /// Adaptability
    #[serde(rename = "adaptabilite")]
    pub adaptability: StatBlock,
}

impl StatSheet {
    /// A sheet with the same block in every category.
    #[must_use]
    pub const fn uniform(block: StatBlock) -> Self {
        Self {
            work: block,
            sport: block,
            creation: block,
            reading: block,
            adaptability: block,
        }
    }

    /// Sum of the five levels.
    #[must_use]
    pub fn total_level(&self) -> u32 {
        self.iter().map(|(_, block)| block.level).sum()
    }

    /// Iterates categories in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (StatCategory, &StatBlock)> {
        StatCategory::all().iter().map(move |c| (*c, &self[*c]))
    }
}

impl Index<StatCategory> for StatSheet {
    type Output = StatBlock;

    fn index(&self, category: StatCategory) -> &StatBlock {
        match category {
            StatCategory::Work => &self.work,
            StatCategory::Sport => &self.sport,
            StatCategory::Creation => &self.creation,
            StatCategory::Reading => &self.reading,
            StatCategory::Adaptability => &self.adaptability,
        }
    }
}

impl IndexMut<StatCategory> for StatSheet {
    fn index_mut(&mut self, category: StatCategory) -> &mut StatBlock {
        match category {
            StatCategory::Work => &mut self.work,
            StatCategory::Sport => &mut self.sport,
            StatCategory::Creation => &mut self.creation,
            StatCategory::Reading => &mut self.reading,
            StatCategory::Adaptability => &mut self.adaptability,
        }
    }
}

/// An attack card held by a player.
///
/// Cards are one-shot: using one sets `used` and `used_at`, and the card is
/// never returned to the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedAttack {
    /// Instance id of this card
    pub id: Uuid,
    /// Catalog attack
    pub attack_id: AttackId,
    /// When the card was rewarded
    pub obtained_at: DateTime<Utc>,
    /// Whether the card has been played
    pub used: bool,
    /// When the card was played
    pub used_at: Option<DateTime<Utc>>,
}

impl OwnedAttack {
    /// A fresh, unused card.
    #[must_use]
    pub fn new(attack_id: AttackId, obtained_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            attack_id,
            obtained_at,
            used: false,
            used_at: None,
        }
    }
}

/// A defense held by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedDefense {
    /// Catalog defense
    pub defense_id: DefenseId,
    /// When the defense was acquired
    pub acquired_at: DateTime<Utc>,
}

/// A timed modifier recorded by a flag-family attack.
///
/// Mission flags are consulted by mission completion, which lives outside
/// the engine. Attack blocks and defense breaks are enforced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlag {
    /// Flag-family effect that set the flag
    pub kind: EffectKind,
    /// Categories the flag covers
    pub categories: CategorySet,
    /// Magnitude from the attack card
    pub magnitude: i32,
    /// Player whose attack set the flag
    pub attacker: String,
    /// When the flag was set
    pub applied_at: DateTime<Utc>,
    /// When the flag lapses
    pub expires_at: DateTime<Utc>,
    /// Defense suppressed by a `defense_break` flag
    #[serde(default)]
    pub suppressed_defense: Option<DefenseId>,
}

impl StatusFlag {
    /// Returns true while the flag is in force.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A scheduled series of daily elo decrements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoisonEffect {
    /// Player whose attack scheduled the poison
    pub attacker: String,
    /// Catalog attack
    pub attack_id: AttackId,
    /// Poisoned category
    pub category: StatCategory,
    /// Elo removed per tick
    pub per_tick: i32,
    /// Ticks still to come
    pub remaining_ticks: u32,
    /// When the next tick is due
    pub next_tick_at: DateTime<Utc>,
}

/// What [`PlayerRecord::settle`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Poison ticks applied
    pub poison_ticks: u32,
    /// Elo removed by those ticks
    pub elo_lost: i32,
    /// Flags dropped because they lapsed
    pub flags_expired: u32,
}

impl Settlement {
    /// Returns true if nothing changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.poison_ticks == 0 && self.flags_expired == 0
    }
}

/// The progression record of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Account name, unique
    pub username: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// The five stat blocks
    pub stats: StatSheet,
    /// Attack cards, in the order they were obtained
    pub attacks: Vec<OwnedAttack>,
    /// Defenses, in the order they were acquired
    pub defenses: Vec<OwnedDefense>,
    /// Inbound pending effects, oldest first
    pub pending: Vec<PendingEffect>,
    /// Timed flags
    pub flags: Vec<StatusFlag>,
    /// Scheduled poisons
    pub poisons: Vec<PoisonEffect>,
    /// Energy pool
    pub energy: u8,
    /// Title derived from the total level
    pub current_title: String,
    /// Title the player chose to display
    #[serde(default)]
    pub selected_title: Option<String>,
    /// Optimistic concurrency version, bumped on every commit
    pub version: u64,
}

impl PlayerRecord {
    /// The record a freshly registered player starts with.
    #[must_use]
    pub fn new(username: &str, catalog: &Catalog, config: &EngineConfig, now: DateTime<Utc>) -> Self {
        let block = StatBlock::new(config.xp_curve.max_xp_at(0), config.initial_elo);
        Self {
            username: username.to_string(),
            created_at: now,
            stats: StatSheet::uniform(block),
            attacks: Vec::new(),
            defenses: Vec::new(),
            pending: Vec::new(),
            flags: Vec::new(),
            poisons: Vec::new(),
            energy: config.energy_max,
            current_title: catalog.floor_title().name.clone(),
            selected_title: None,
            version: 0,
        }
    }

    /// Recomputes `current_title`. Returns true if it changed.
    pub fn refresh_title(&mut self, catalog: &Catalog) -> bool {
        let derived = &catalog.title_for_level(self.stats.total_level()).name;
        if *derived == self.current_title {
            false
        } else {
            self.current_title.clone_from(derived);
            true
        }
    }

    /// Applies due poison ticks and drops lapsed flags and spent poisons.
    pub fn settle(&mut self, now: DateTime<Utc>, elo_floor: i32) -> Settlement {
        let mut settlement = Settlement::default();

        let mut poisons = std::mem::take(&mut self.poisons);
        for poison in &mut poisons {
            while poison.remaining_ticks > 0 && poison.next_tick_at <= now {
                let lost = self.adjust_elo(poison.category, -poison.per_tick, elo_floor);
                settlement.elo_lost -= lost;
                settlement.poison_ticks += 1;
                poison.remaining_ticks -= 1;
                poison.next_tick_at += Duration::hours(24);
            }
        }
        poisons.retain(|p| p.remaining_ticks > 0);
        self.poisons = poisons;

        let before = self.flags.len();
        self.flags.retain(|f| f.is_active_at(now));
        settlement.flags_expired = u32::try_from(before - self.flags.len()).unwrap_or(u32::MAX);

        settlement
    }

    /// Adds `delta` to a stat's elo, clamped at `floor`. Returns the applied delta.
    pub fn adjust_elo(&mut self, category: StatCategory, delta: i32, floor: i32) -> i32 {
        let block = &mut self.stats[category];
        let before = block.elo;
        block.elo = before.saturating_add(delta).max(floor.min(before));
        block.elo - before
    }

    /// Adds `delta` to a stat's xp, clamped at 0 and below `max_xp`.
    /// Returns the applied delta.
    pub fn adjust_xp(&mut self, category: StatCategory, delta: i32) -> i32 {
        let block = &mut self.stats[category];
        let before = i64::from(block.xp);
        let ceiling = i64::from(block.max_xp) - 1;
        let after = (before + i64::from(delta)).clamp(0, ceiling.max(0));
        block.xp = u32::try_from(after).unwrap_or(0);
        i32::try_from(after - before).unwrap_or(0)
    }

    /// Adds `delta` to the energy pool, clamped to `[0, max]`. Returns the applied delta.
    pub fn adjust_energy(&mut self, delta: i32, max: u8) -> i32 {
        let before = i32::from(self.energy);
        let after = (before + delta).clamp(0, i32::from(max));
        self.energy = u8::try_from(after).unwrap_or(max);
        after - before
    }

    /// Flags in force at `now`.
    pub fn active_flags(&self, now: DateTime<Utc>) -> impl Iterator<Item = &StatusFlag> {
        self.flags.iter().filter(move |f| f.is_active_at(now))
    }

    /// Returns true if an attack block forbids playing a card on `category`.
    ///
    /// A category-bound block only stops cards aimed at that category; a
    /// card with no category is stopped only by a block on every category.
    #[must_use]
    pub fn attack_blocked(&self, category: Option<StatCategory>, now: DateTime<Utc>) -> bool {
        let wanted = CategorySet::scoped(category);
        self.active_flags(now)
            .any(|f| f.kind == EffectKind::AttackBlock && f.categories.contains(wanted))
    }

    /// Owned defenses not suppressed by a defense break, in acquisition order.
    pub fn effective_defenses(&self, now: DateTime<Utc>) -> impl Iterator<Item = DefenseId> + '_ {
        let suppressed: Vec<DefenseId> = self
            .active_flags(now)
            .filter_map(|f| f.suppressed_defense)
            .collect();
        self.defenses
            .iter()
            .map(|d| d.defense_id)
            .filter(move |id| !suppressed.contains(id))
    }

    /// Returns true if the player holds `defense_id`.
    #[must_use]
    pub fn owns_defense(&self, defense_id: DefenseId) -> bool {
        self.defenses.iter().any(|d| d.defense_id == defense_id)
    }

    /// Position of the oldest unused card of `attack_id`.
    #[must_use]
    pub fn next_unused_card(&self, attack_id: AttackId) -> Option<usize> {
        self.attacks
            .iter()
            .position(|card| card.attack_id == attack_id && !card.used)
    }

    /// Pending effects still live at `now`.
    pub fn live_pending(&self, now: DateTime<Utc>) -> impl Iterator<Item = &PendingEffect> {
        self.pending.iter().filter(move |p| !p.is_expired_at(now))
    }
}
