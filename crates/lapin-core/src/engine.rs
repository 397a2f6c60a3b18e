//! The engine context.
//!
//! [`Engine`] is constructed once with the catalog, a store and a clock, and
//! passed to the request layer. Every operation takes the acting player's
//! username, supplied by the caller after authentication.
//!
//! Mutating operations follow the same shape: take the record locks in
//! username order, load fresh copies, settle timed state, mutate the copies,
//! then commit every changed record in one store call. A failed operation
//! commits nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::iter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lapin_catalog::{Attack, AttackId, Catalog, Defense, DefenseId, StatCategory, Title};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::locks::RecordLocks;
use crate::progression::{apply_xp, draw_rewards, unlocked_titles, with_title_bonus, TitleStatus};
use crate::queue::{
    partition_expired, DrainReport, EffectDetail, EffectTarget, PendingEffect, PendingStatus,
    PendingView,
};
use crate::record::{OwnedAttack, OwnedDefense, PlayerRecord, StatusFlag};
use crate::resolver::{EffectRequest, EffectResolver, Outcome};
use crate::store::{PlayerStore, StoreError};

/// Parses a stat name from a request.
///
/// # Errors
///
/// [`EngineError::NotFound`] if `name` is not one of the five categories.
pub fn parse_stat(name: &str) -> EngineResult<StatCategory> {
    name.parse::<StatCategory>()
        .map_err(|_| EngineError::NotFound(format!("stat '{name}'")))
}

/// Parses an optional stat name; empty means none.
///
/// # Errors
///
/// [`EngineError::NotFound`] for a non-empty unknown name.
pub fn parse_target_stat(name: &str) -> EngineResult<Option<StatCategory>> {
    if name.trim().is_empty() {
        Ok(None)
    } else {
        parse_stat(name).map(Some)
    }
}

fn reject(err: EngineError) -> EngineError {
    debug!(%err, "operation rejected");
    err
}

/// Result of a level-up or xp award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelUpReport {
    /// Stat that gained xp
    pub stat: StatCategory,
    /// Level after the gain
    pub new_level: u32,
    /// Levels crossed
    pub levels_gained: u32,
    /// First attack rewarded, if any level was crossed
    pub attack_gained: Option<Attack>,
    /// One attack per level crossed
    pub rewards: Vec<AttackId>,
    /// Derived title after the gain
    pub title: String,
}

/// An owned card enriched with its catalog definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedAttackView {
    /// Card instance id
    pub instance_id: Uuid,
    /// Catalog definition
    #[serde(flatten)]
    pub attack: Attack,
    /// When the card was rewarded
    pub obtained_at: DateTime<Utc>,
    /// Whether the card was played
    pub used: bool,
    /// When the card was played
    pub used_at: Option<DateTime<Utc>>,
}

/// A player's standing against the title table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleProgress {
    /// Sum of the five levels
    pub total_level: u32,
    /// Derived title
    pub current_title: String,
    /// Title chosen for display
    pub selected_title: Option<String>,
    /// Every title, ascending
    pub titles: Vec<TitleStatus>,
}

/// An attack a player wants to queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackRequest {
    /// Player to attack
    pub target_username: String,
    /// Catalog attack to play
    pub attack_id: AttackId,
    /// Category to aim at, else the card's own
    pub target_stat: Option<StatCategory>,
    /// Elo or xp, for stat effects
    pub effect_target: EffectTarget,
}

/// Returned by [`Engine::queue_attack`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueReceipt {
    /// Id of the queued entry
    pub attack_instance_id: Uuid,
    /// Card that was consumed
    pub card_id: Uuid,
    /// Player the entry was queued for
    pub target: String,
    /// When the entry lapses
    pub expires_at: Option<DateTime<Utc>>,
    /// Lapsed entries dropped from the target's full queue
    pub lapsed_dropped: usize,
}

/// Totals of a [`Engine::sweep`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Records visited
    pub records_scanned: usize,
    /// Records committed
    pub records_updated: usize,
    /// Pending entries dropped because they lapsed
    pub pending_expired: usize,
    /// Poison ticks applied
    pub poison_ticks: u32,
    /// Flags dropped because they lapsed
    pub flags_expired: u32,
    /// Records skipped after an error
    pub failures: usize,
}

impl SweepReport {
    fn merge(self, other: Self) -> Self {
        Self {
            records_scanned: self.records_scanned + other.records_scanned,
            records_updated: self.records_updated + other.records_updated,
            pending_expired: self.pending_expired + other.pending_expired,
            poison_ticks: self.poison_ticks + other.poison_ticks,
            flags_expired: self.flags_expired + other.flags_expired,
            failures: self.failures + other.failures,
        }
    }
}

/// The progression and effect-resolution engine.
pub struct Engine {
    catalog: Arc<Catalog>,
    store: Arc<dyn PlayerStore>,
    locks: RecordLocks,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    seed: u64,
    draws: AtomicU64,
}

impl Engine {
    /// Creates an engine on the system clock.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn PlayerStore>, config: EngineConfig) -> Self {
        Self::with_clock(catalog, store, config, Arc::new(SystemClock))
    }

    /// Creates an engine on an explicit clock.
    #[must_use]
    pub fn with_clock(
        catalog: Arc<Catalog>,
        store: Arc<dyn PlayerStore>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        info!(seed, queue_bound = config.max_pending_per_target, "engine ready");
        Self {
            catalog,
            store,
            locks: RecordLocks::new(),
            clock,
            config,
            seed,
            draws: AtomicU64::new(0),
        }
    }

    /// The catalog the engine resolves against.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn lock_registry(&self) -> &RecordLocks {
        &self.locks
    }

    /// One RNG stream per operation, derived from the master seed.
    fn rng(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(self.draws.fetch_add(1, Ordering::Relaxed));
        rng
    }

    /// Fails with `NotFound` before any lock is taken for an unknown player.
    fn require(&self, username: &str) -> EngineResult<()> {
        if self.store.contains(username)? {
            Ok(())
        } else {
            Err(reject(EngineError::player_not_found(username)))
        }
    }

    /// Locks one record, loads and settles it, runs `op`, and commits the
    /// record if anything changed.
    fn mutate<T>(
        &self,
        username: &str,
        op: impl FnOnce(&mut PlayerRecord, DateTime<Utc>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.require(username)?;
        let set = self.locks.lock_one(username)?;
        let _guards = set.acquire()?;

        let mut record = self.store.load(username)?;
        let original = record.clone();
        let now = self.clock.now();
        record.settle(now, self.config.elo_floor);
        let out = op(&mut record, now)?;
        record.refresh_title(&self.catalog);

        if record != original {
            self.store.commit(std::slice::from_ref(&record))?;
        }
        Ok(out)
    }

    // ---------------------------------------------------------------
    // Accounts and catalog
    // ---------------------------------------------------------------

    /// Creates the initial record for a new account.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidRequest`] for a blank username,
    /// [`EngineError::Conflict`] if the account already has a record.
    pub fn register(&self, username: &str) -> EngineResult<PlayerRecord> {
        if username.trim().is_empty() {
            return Err(reject(EngineError::InvalidRequest("username is empty".into())));
        }
        let record = PlayerRecord::new(username, &self.catalog, &self.config, self.clock.now());
        self.store.insert(record.clone())?;
        info!(player = username, "player registered");
        Ok(record)
    }

    /// Every attack, ordered by id.
    #[must_use]
    pub fn list_attacks(&self) -> &[Attack] {
        self.catalog.attacks()
    }

    /// Every defense, ordered by id.
    #[must_use]
    pub fn list_defenses(&self) -> &[Defense] {
        self.catalog.defenses()
    }

    /// Every title, ascending.
    #[must_use]
    pub fn list_titles(&self) -> &[Title] {
        self.catalog.titles()
    }

    // ---------------------------------------------------------------
    // Progression
    // ---------------------------------------------------------------

    fn grant_xp(
        &self,
        record: &mut PlayerRecord,
        stat: StatCategory,
        gained: u32,
        now: DateTime<Utc>,
    ) -> EngineResult<LevelUpReport> {
        let gain = apply_xp(record.stats[stat], gained, &self.config.xp_curve);
        record.stats[stat] = gain.stat;

        let rewards = draw_rewards(&self.catalog, gain.levels_gained, &mut self.rng());
        record
            .attacks
            .extend(rewards.iter().map(|id| OwnedAttack::new(*id, now)));
        record.refresh_title(&self.catalog);

        let attack_gained = rewards
            .first()
            .map(|id| self.catalog.attack(*id).cloned())
            .transpose()?;

        if gain.leveled_up {
            info!(
                player = %record.username,
                %stat,
                new_level = gain.stat.level,
                levels = gain.levels_gained,
                rewards = ?rewards,
                "level up"
            );
        }
        Ok(LevelUpReport {
            stat,
            new_level: gain.stat.level,
            levels_gained: gain.levels_gained,
            attack_gained,
            rewards,
            title: record.current_title.clone(),
        })
    }

    /// Grants exactly the xp `stat` needs for its next level.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player or stat name.
    pub fn level_up(&self, player: &str, stat: &str) -> EngineResult<LevelUpReport> {
        let stat = parse_stat(stat).map_err(reject)?;
        self.mutate(player, |record, now| {
            let block = record.stats[stat];
            let missing = block.max_xp.saturating_sub(block.xp).max(1);
            self.grant_xp(record, stat, missing, now)
        })
    }

    /// Awards xp earned elsewhere, boosted by the player's title bonus.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player or stat name.
    pub fn award_xp(&self, player: &str, stat: &str, xp: u32) -> EngineResult<LevelUpReport> {
        let stat = parse_stat(stat).map_err(reject)?;
        self.mutate(player, |record, now| {
            let title = self.catalog.title_for_level(record.stats.total_level());
            let boosted = with_title_bonus(title, stat, xp);
            self.grant_xp(record, stat, boosted, now)
        })
    }

    /// The player's cards, oldest first.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player.
    pub fn list_owned_attacks(&self, player: &str) -> EngineResult<Vec<OwnedAttackView>> {
        let record = self.store.load(player)?;
        record
            .attacks
            .iter()
            .map(|card| -> EngineResult<OwnedAttackView> {
                Ok(OwnedAttackView {
                    instance_id: card.id,
                    attack: self.catalog.attack(card.attack_id)?.clone(),
                    obtained_at: card.obtained_at,
                    used: card.used,
                    used_at: card.used_at,
                })
            })
            .collect()
    }

    fn title_progress(&self, record: &PlayerRecord) -> TitleProgress {
        let total_level = record.stats.total_level();
        TitleProgress {
            total_level,
            current_title: self.catalog.title_for_level(total_level).name.clone(),
            selected_title: record.selected_title.clone(),
            titles: unlocked_titles(&self.catalog, total_level),
        }
    }

    /// Where the player stands against the title table.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player.
    pub fn list_title_progress(&self, player: &str) -> EngineResult<TitleProgress> {
        let record = self.store.load(player)?;
        Ok(self.title_progress(&record))
    }

    /// Chooses the title the player displays.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player or title,
    /// [`EngineError::Forbidden`] if the title is not unlocked.
    pub fn select_title(&self, player: &str, name: &str) -> EngineResult<TitleProgress> {
        let title = self.catalog.title(name).map_err(|e| reject(e.into()))?;
        self.mutate(player, |record, _| {
            let total = record.stats.total_level();
            let derived = self.catalog.title_for_level(total);
            if !title.is_unlocked_at(total) && title.name != derived.name {
                return Err(reject(EngineError::Forbidden(format!(
                    "title '{name}' needs total level {}",
                    title.level_required
                ))));
            }
            record.selected_title = Some(title.name.clone());
            Ok(self.title_progress(record))
        })
    }

    // ---------------------------------------------------------------
    // Attacks and the pending queue
    // ---------------------------------------------------------------

    /// Plays one of the player's cards against another player.
    ///
    /// Consumes the oldest unused card of `attack_id` and queues the attack
    /// on the target. Nothing is resolved until the target drains its queue.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`]: unknown attack, attacker or target
    /// - [`EngineError::InvalidRequest`]: self-targeting, or no category for
    ///   an attack that needs one
    /// - [`EngineError::Forbidden`]: no unused card, an attack block covers
    ///   the category, or the target's queue is full
    /// - [`EngineError::Conflict`]: the store saw a concurrent write
    pub fn queue_attack(&self, player: &str, request: &AttackRequest) -> EngineResult<QueueReceipt> {
        let attack = self.catalog.attack(request.attack_id).map_err(|e| reject(e.into()))?;
        let target_name = request.target_username.as_str();
        if target_name == player {
            return Err(reject(EngineError::InvalidRequest(
                "a player cannot attack themselves".into(),
            )));
        }

        self.require(player)?;
        self.require(target_name)?;
        let set = self.locks.lock_set([player, target_name])?;
        let _guards = set.acquire()?;
        let mut attacker = self.store.load(player)?;
        let mut target = self.store.load(target_name)?;

        let category = request.target_stat.or(attack.target_stat);
        if category.is_none() && attack.effect_type.requires_category() {
            return Err(reject(EngineError::InvalidRequest(format!(
                "attack {} needs a target stat",
                attack.id
            ))));
        }

        let now = self.clock.now();
        attacker.settle(now, self.config.elo_floor);
        target.settle(now, self.config.elo_floor);

        if attacker.attack_blocked(category, now) {
            return Err(reject(EngineError::Forbidden(format!(
                "attacks are blocked for {player}"
            ))));
        }
        let Some(slot) = attacker.next_unused_card(attack.id) else {
            return Err(reject(EngineError::Forbidden(format!(
                "no unused card for attack {}",
                attack.id
            ))));
        };
        // A full stored queue sheds its lapsed entries before the bound is
        // checked, so the stored queue never holds more than the bound.
        let bound = self.config.max_pending_per_target;
        let mut lapsed_dropped = 0;
        if target.pending.len() >= bound {
            let (live, lapsed) = partition_expired(std::mem::take(&mut target.pending), now);
            target.pending = live;
            lapsed_dropped = lapsed.len();
        }
        if target.pending.len() >= bound {
            return Err(reject(EngineError::Forbidden(format!(
                "pending queue of {target_name} is full"
            ))));
        }

        let card = &mut attacker.attacks[slot];
        card.used = true;
        card.used_at = Some(now);
        let card_id = card.id;

        let pending = PendingEffect::new(player, attack, category, request.effect_target, now);
        let receipt = QueueReceipt {
            attack_instance_id: pending.id,
            card_id,
            target: target.username.clone(),
            expires_at: pending.expires_at,
            lapsed_dropped,
        };
        target.pending.push(pending);

        self.store.commit(&[attacker, target])?;
        info!(
            attacker = player,
            target = target_name,
            attack = %attack.id,
            effect = %attack.effect_type,
            "attack queued"
        );
        Ok(receipt)
    }

    /// Queued entries awaiting the player, oldest first. Lapsed entries are
    /// left out.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player.
    pub fn list_pending_effects(&self, player: &str) -> EngineResult<Vec<PendingView>> {
        let record = self.store.load(player)?;
        let now = self.clock.now();
        record
            .live_pending(now)
            .map(|pending| -> EngineResult<PendingView> {
                Ok(PendingView {
                    id: pending.id,
                    attacker: pending.attacker.clone(),
                    attack: self.catalog.attack(pending.attack_id)?.clone(),
                    target_stat: pending.target_stat,
                    effect_target: pending.effect_target,
                    created_at: pending.created_at,
                    expires_at: pending.expires_at,
                })
            })
            .collect()
    }

    /// Resolves the player's whole queue, oldest first.
    ///
    /// Live entries are resolved and reported `Applied`; lapsed ones are
    /// dropped and reported `Expired`. The target and every attacker whose
    /// record changed are committed together.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player,
    /// [`EngineError::Conflict`] if the queue kept gaining new attackers
    /// while the lock set was being taken.
    pub fn apply_pending_effects(&self, player: &str) -> EngineResult<DrainReport> {
        for attempt in 0..=self.config.lock_retry_limit {
            let snapshot = self.store.load(player)?;
            let set = self.locks.lock_set(
                iter::once(player).chain(snapshot.pending.iter().map(|p| p.attacker.as_str())),
            )?;
            let _guards = set.acquire()?;

            let target = self.store.load(player)?;
            if let Some(newcomer) = target.pending.iter().find(|p| !set.covers(&p.attacker)) {
                debug!(player, attacker = %newcomer.attacker, attempt, "queue grew, retaking locks");
                continue;
            }
            return self.drain_locked(target);
        }
        Err(reject(EngineError::Conflict(format!(
            "pending queue of {player} kept changing"
        ))))
    }

    /// Drains `target`'s queue. The caller holds the locks of the target and
    /// of every attacker in the queue.
    fn drain_locked(&self, target: PlayerRecord) -> EngineResult<DrainReport> {
        let now = self.clock.now();
        let player = target.username.clone();
        let attackers: BTreeSet<String> =
            target.pending.iter().map(|p| p.attacker.clone()).collect();

        let mut working = BTreeMap::new();
        working.insert(player.clone(), target);
        for name in attackers {
            if name == player {
                continue;
            }
            match self.store.load(&name) {
                Ok(record) => {
                    working.insert(name, record);
                }
                Err(StoreError::Missing(_)) => debug!(attacker = %name, "attacker record gone"),
                Err(err) => return Err(err.into()),
            }
        }
        let originals = working.clone();
        for record in working.values_mut() {
            record.settle(now, self.config.elo_floor);
        }

        let queue = working
            .get_mut(&player)
            .map(|t| std::mem::take(&mut t.pending))
            .unwrap_or_default();
        let resolver = EffectResolver::new(&self.catalog, &self.config);
        let mut rng = self.rng();
        let mut report = DrainReport::default();

        for pending in queue {
            let attack = self.catalog.attack(pending.attack_id).ok();
            let attack_name = attack.map(|a| a.name.clone()).unwrap_or_default();
            let detail = |status: PendingStatus,
                          outcome: Option<Outcome>,
                          defense: Option<DefenseId>| EffectDetail {
                pending_id: pending.id,
                attacker: pending.attacker.clone(),
                attack_id: pending.attack_id,
                attack_name: attack_name.clone(),
                status,
                outcome,
                defense,
            };

            if pending.is_expired_at(now) {
                report.total_expired += 1;
                report.details.push(detail(PendingStatus::Expired, None, None));
                continue;
            }
            report.total_applied += 1;

            let Some(attack) = attack else {
                warn!(player = %player, attack = %pending.attack_id, "queued attack missing from catalog");
                report
                    .details
                    .push(detail(PendingStatus::Applied, Some(Outcome::NoEffect), None));
                continue;
            };
            let target = working
                .get(&player)
                .ok_or_else(|| EngineError::player_not_found(&player))?;
            let resolution = resolver.resolve(
                &EffectRequest {
                    attack,
                    target_stat: pending.target_stat,
                    effect_target: pending.effect_target,
                    attacker_name: &pending.attacker,
                    attacker: working.get(&pending.attacker),
                    target,
                    now,
                },
                &mut rng,
            );
            debug!(
                player = %player,
                attacker = %pending.attacker,
                attack = %attack.id,
                outcome = ?resolution.outcome,
                "pending effect resolved"
            );
            report.details.push(detail(
                PendingStatus::Applied,
                Some(resolution.outcome),
                resolution.defense,
            ));
            resolver.apply_changes(&resolution.changes, &mut working);
        }

        for record in working.values_mut() {
            record.refresh_title(&self.catalog);
        }
        let changed: Vec<PlayerRecord> = working
            .into_iter()
            .filter(|(name, record)| originals.get(name) != Some(record))
            .map(|(_, record)| record)
            .collect();
        if !changed.is_empty() {
            self.store.commit(&changed)?;
        }

        info!(
            player = %player,
            applied = report.total_applied,
            expired = report.total_expired,
            defended = report.total_defended(),
            "pending effects drained"
        );
        Ok(report)
    }

    // ---------------------------------------------------------------
    // Defenses and record views
    // ---------------------------------------------------------------

    /// Gives the player a defense. Returns false if it was already owned.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player or defense.
    pub fn grant_defense(&self, player: &str, defense_id: DefenseId) -> EngineResult<bool> {
        let defense = self.catalog.defense(defense_id).map_err(|e| reject(e.into()))?;
        self.mutate(player, |record, now| {
            if record.owns_defense(defense.id) {
                return Ok(false);
            }
            record.defenses.push(OwnedDefense {
                defense_id: defense.id,
                acquired_at: now,
            });
            info!(player, defense = %defense.id, kind = %defense.protection_type, "defense acquired");
            Ok(true)
        })
    }

    /// The player's record with timed state settled as of now.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player.
    pub fn profile(&self, player: &str) -> EngineResult<PlayerRecord> {
        let mut record = self.store.load(player)?;
        record.settle(self.clock.now(), self.config.elo_floor);
        record.refresh_title(&self.catalog);
        Ok(record)
    }

    /// Active mission modifiers covering `category`, for mission completion.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown player.
    pub fn mission_modifiers(&self, player: &str, category: StatCategory) -> EngineResult<Vec<StatusFlag>> {
        let record = self.store.load(player)?;
        let now = self.clock.now();
        Ok(record
            .active_flags(now)
            .filter(|f| f.kind.is_mission_flag() && f.categories.covers(category))
            .cloned()
            .collect())
    }

    // ---------------------------------------------------------------
    // Sweep
    // ---------------------------------------------------------------

    fn sweep_one(&self, username: &str, now: DateTime<Utc>) -> EngineResult<SweepReport> {
        let set = self.locks.lock_one(username)?;
        let _guards = set.acquire()?;

        let mut record = self.store.load(username)?;
        let original = record.clone();
        let settlement = record.settle(now, self.config.elo_floor);
        let (live, expired) = partition_expired(std::mem::take(&mut record.pending), now);
        record.pending = live;

        let updated = record != original;
        if updated {
            self.store.commit(std::slice::from_ref(&record))?;
        }
        Ok(SweepReport {
            records_scanned: 1,
            records_updated: usize::from(updated),
            pending_expired: expired.len(),
            poison_ticks: settlement.poison_ticks,
            flags_expired: settlement.flags_expired,
            failures: 0,
        })
    }

    /// Settles every record and drops lapsed queue entries, in parallel.
    ///
    /// Records that fail are skipped and counted. Nothing else depends on
    /// the sweep having run.
    ///
    /// # Errors
    ///
    /// Only if the store cannot list its records.
    pub fn sweep(&self) -> EngineResult<SweepReport> {
        let now = self.clock.now();
        let usernames = self.store.usernames()?;
        let report = usernames
            .par_iter()
            .map(|name| {
                self.sweep_one(name, now).unwrap_or_else(|err| {
                    warn!(player = %name, %err, "sweep skipped record");
                    SweepReport {
                        records_scanned: 1,
                        failures: 1,
                        ..SweepReport::default()
                    }
                })
            })
            .reduce(SweepReport::default, SweepReport::merge);

        info!(
            scanned = report.records_scanned,
            updated = report.records_updated,
            expired = report.pending_expired,
            ticks = report.poison_ticks,
            "sweep finished"
        );
        Ok(report)
    }
}
