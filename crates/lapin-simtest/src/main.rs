//! Lapin Headless Simulation Harness
//!
//! Drives the progression engine with many concurrent players: level-ups,
//! attacks queued at random opponents, queue drains and periodic sweeps.
//! Runs entirely in-process against the in-memory store, then checks the
//! record invariants and prints a summary.
//!
//! Usage:
//!   cargo run -p lapin-simtest
//!   cargo run -p lapin-simtest -- --verbose --players 32 --rounds 20 --seed 7

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;
use lapin_catalog::{Catalog, DefenseId, StatCategory};
use lapin_core::{
    AttackRequest, EffectTarget, Engine, EngineConfig, EngineError, ManualClock, MemoryStore,
    PlayerStore, SweepReport,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── Options ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lapin-simtest", about = "Headless simulation of concurrent Lapin players")]
struct Options {
    /// Print every check, not only failures
    #[arg(long)]
    verbose: bool,

    /// Number of players to register
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u16).range(2..))]
    players: u16,

    /// Rounds of play
    #[arg(long, default_value_t = 12)]
    rounds: usize,

    /// Master seed for the engine and the players
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl Options {
    fn player_count(&self) -> usize {
        usize::from(self.players)
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.into(),
            passed,
            detail,
        }
    }
}

/// What one player did during the run.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    level_ups: u32,
    queued: usize,
    rejected: usize,
    applied: usize,
    expired: usize,
}

impl Tally {
    fn add(&mut self, other: Self) {
        self.level_ups += other.level_ups;
        self.queued += other.queued;
        self.rejected += other.rejected;
        self.applied += other.applied;
        self.expired += other.expired;
    }
}

// ── Simulation ──────────────────────────────────────────────────────────

fn player_name(index: usize) -> String {
    format!("joueur{index:03}")
}

/// One round for one player: level up, play a card, drain the queue.
fn play_round(engine: &Engine, me: &str, players: usize, rng: &mut ChaCha8Rng) -> Result<Tally> {
    let mut tally = Tally::default();

    let stat = StatCategory::all()[rng.gen_range(0..StatCategory::COUNT)];
    engine.level_up(me, stat.key())?;
    tally.level_ups += 1;

    let hand = engine.list_owned_attacks(me)?;
    if let Some(card) = hand.iter().find(|c| !c.used) {
        let target = loop {
            let candidate = player_name(rng.gen_range(0..players));
            if candidate != me {
                break candidate;
            }
        };
        let request = AttackRequest {
            target_username: target,
            attack_id: card.attack.id,
            target_stat: Some(StatCategory::all()[rng.gen_range(0..StatCategory::COUNT)]),
            effect_target: if rng.gen_bool(0.7) {
                EffectTarget::Elo
            } else {
                EffectTarget::Level
            },
        };
        match engine.queue_attack(me, &request) {
            Ok(receipt) => {
                tally.queued += 1;
                tally.expired += receipt.lapsed_dropped;
            }
            Err(EngineError::Forbidden(_)) => tally.rejected += 1,
            Err(err) => return Err(err.into()),
        }
    }

    match engine.apply_pending_effects(me) {
        Ok(report) => {
            tally.applied += report.total_applied;
            tally.expired += report.total_expired;
        }
        Err(err) if err.is_retryable() => warn!(player = me, %err, "drain deferred"),
        Err(err) => return Err(err.into()),
    }
    Ok(tally)
}

struct Run {
    engine: Arc<Engine>,
    store: Arc<MemoryStore>,
    tallies: Vec<Tally>,
    swept: SweepReport,
}

fn simulate(options: &Options) -> Result<Run> {
    let catalog = Arc::new(Catalog::load_embedded().context("embedded catalog is invalid")?);
    let store = Arc::new(MemoryStore::new());
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
        .single()
        .context("start instant")?;
    let clock = Arc::new(ManualClock::new(start));
    let engine = Arc::new(Engine::with_clock(
        catalog,
        Arc::clone(&store) as Arc<dyn PlayerStore>,
        EngineConfig::with_seed(options.seed),
        Arc::clone(&clock) as Arc<dyn lapin_core::Clock>,
    ));

    let mut setup_rng = ChaCha8Rng::seed_from_u64(options.seed);
    for index in 0..options.player_count() {
        let name = player_name(index);
        engine.register(&name)?;
        if setup_rng.gen_bool(0.5) {
            engine.grant_defense(&name, DefenseId::new(setup_rng.gen_range(1..=10)))?;
        }
    }
    info!(players = options.player_count(), "players registered");

    let mut tallies = vec![Tally::default(); options.player_count()];
    let mut swept = SweepReport::default();

    for round in 0..options.rounds {
        let workers: Vec<_> = (0..options.player_count())
            .map(|index| {
                let engine = Arc::clone(&engine);
                let players = options.player_count();
                let seed = options.seed ^ ((round as u64) << 32) ^ index as u64;
                thread::spawn(move || {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    play_round(&engine, &player_name(index), players, &mut rng)
                })
            })
            .collect();

        for (index, worker) in workers.into_iter().enumerate() {
            let tally = worker
                .join()
                .map_err(|_| anyhow::anyhow!("player thread panicked"))??;
            tallies[index].add(tally);
        }

        clock.advance_hours(12);
        let report = engine.sweep()?;
        swept.pending_expired += report.pending_expired;
        swept.poison_ticks += report.poison_ticks;
        swept.failures += report.failures;
        info!(round, expired = report.pending_expired, "round finished");
    }

    for (index, tally) in tallies.iter_mut().enumerate() {
        let report = engine.apply_pending_effects(&player_name(index))?;
        tally.applied += report.total_applied;
        tally.expired += report.total_expired;
    }
    clock.advance_hours(24 * 10);
    let report = engine.sweep()?;
    swept.poison_ticks += report.poison_ticks;
    swept.failures += report.failures;

    Ok(Run {
        engine,
        store,
        tallies,
        swept,
    })
}

// ── Invariants ──────────────────────────────────────────────────────────

fn validate(run: &Run, options: &Options) -> Result<Vec<TestResult>> {
    let mut results = Vec::new();
    let engine = &run.engine;
    let floor = engine.config().elo_floor;
    let energy_max = engine.config().energy_max;

    let mut bad_stats = Vec::new();
    let mut bad_titles = Vec::new();
    let mut bad_levels = Vec::new();
    let mut bad_cards = Vec::new();
    let mut leftover = 0;

    for (index, tally) in run.tallies.iter().enumerate() {
        let name = player_name(index);
        let record = run.store.load(&name)?;

        for (category, block) in record.stats.iter() {
            if block.xp >= block.max_xp || block.elo < floor {
                bad_stats.push(format!("{name}.{category}"));
            }
        }
        if record.energy > energy_max {
            bad_stats.push(format!("{name}.energy"));
        }
        let derived = &engine.catalog().title_for_level(record.stats.total_level()).name;
        if *derived != record.current_title {
            bad_titles.push(name.clone());
        }
        if record.stats.total_level() != tally.level_ups {
            bad_levels.push(name.clone());
        }
        let used = record.attacks.iter().filter(|c| c.used).count();
        if used != tally.queued {
            bad_cards.push(name.clone());
        }
        leftover += record.pending.len();
    }

    results.push(TestResult::check(
        "stat_bounds",
        bad_stats.is_empty(),
        format!("{} violations {:?}", bad_stats.len(), bad_stats),
    ));
    results.push(TestResult::check(
        "titles_derived",
        bad_titles.is_empty(),
        format!("{} stale titles {:?}", bad_titles.len(), bad_titles),
    ));
    results.push(TestResult::check(
        "no_lost_level_ups",
        bad_levels.is_empty(),
        format!("{} mismatches {:?}", bad_levels.len(), bad_levels),
    ));
    results.push(TestResult::check(
        "one_card_per_attack",
        bad_cards.is_empty(),
        format!("{} mismatches {:?}", bad_cards.len(), bad_cards),
    ));
    results.push(TestResult::check(
        "queues_drained",
        leftover == 0,
        format!("{leftover} entries left"),
    ));

    let mut total = Tally::default();
    for tally in &run.tallies {
        total.add(*tally);
    }
    let accounted = total.applied + total.expired + run.swept.pending_expired;
    results.push(TestResult::check(
        "each_attack_accounted_once",
        accounted == total.queued,
        format!(
            "queued {} = applied {} + expired {} + swept {}",
            total.queued, total.applied, total.expired, run.swept.pending_expired
        ),
    ));
    results.push(TestResult::check(
        "sweep_clean",
        run.swept.failures == 0,
        format!("{} failures, {} poison ticks", run.swept.failures, run.swept.poison_ticks),
    ));
    results.push(TestResult::check(
        "level_ups_ran",
        total.level_ups as usize == options.player_count() * options.rounds,
        format!("{} level-ups, {} rejected attacks", total.level_ups, total.rejected),
    ));

    Ok(results)
}

fn main() -> Result<()> {
    let options = Options::parse();
    let default_level = if options.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    println!("=== Lapin Simulation Harness ===\n");
    println!(
        "players {}, rounds {}, seed {}",
        options.player_count(), options.rounds, options.seed
    );

    let run = simulate(&options)?;
    let results = validate(&run, &options)?;

    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || options.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }
    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
