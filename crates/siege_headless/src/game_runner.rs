//! Match execution for headless testing.
//!
//! Runs a battle to completion with a scripted controller on each side,
//! collecting metrics and optional periodic snapshots.
//!
//! All loops are bounded: a match stops at its tick limit even when both
//! strongholds still stand.

use std::time::{Duration, Instant};

use siege_core::data::BattleConfig;
use siege_core::error::Result as SiegeResult;
use siege_core::side::Side;
use siege_core::simulation::SimulationState;
use siege_core::snapshot::SimulationSnapshot;
use tracing::{debug, info, warn};

use crate::metrics::{MatchMetrics, MetricsCollector};
use crate::strategies::{SideController, Strategy};

/// Ten minutes at 60 ticks per second.
pub const DEFAULT_MAX_TICKS: u64 = 36_000;

/// Log progress every N ticks.
const PROGRESS_LOG_INTERVAL: u64 = 3_600;

/// A single tick slower than this is worth a warning.
const SLOW_TICK_THRESHOLD: Duration = Duration::from_millis(50);

/// Configuration for a single match.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Match ID for tracking.
    pub match_id: String,
    /// Controller seed.
    pub seed: u64,
    /// Maximum ticks before timeout.
    pub max_ticks: u64,
    /// Battle to fight.
    pub battle: BattleConfig,
    /// Strategy for the left side.
    pub player_strategy: Strategy,
    /// Strategy for the right side.
    pub enemy_strategy: Strategy,
    /// Capture a snapshot every N ticks. `None` captures only the final one.
    pub snapshot_interval: Option<u64>,
}

impl MatchConfig {
    /// Random controllers on both sides with the default tick limit.
    #[must_use]
    pub fn new(battle: BattleConfig, seed: u64) -> Self {
        Self {
            match_id: format!("match_{seed}"),
            seed,
            max_ticks: DEFAULT_MAX_TICKS,
            battle,
            player_strategy: Strategy::random(),
            enemy_strategy: Strategy::random(),
            snapshot_interval: None,
        }
    }

    /// Set strategies.
    #[must_use]
    pub fn with_strategies(mut self, player: Strategy, enemy: Strategy) -> Self {
        self.player_strategy = player;
        self.enemy_strategy = enemy;
        self
    }

    /// Set the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Capture a snapshot every `interval` ticks.
    #[must_use]
    pub fn with_snapshot_interval(mut self, interval: u64) -> Self {
        self.snapshot_interval = Some(interval.max(1));
        self
    }
}

/// Everything a finished match produced.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Collected metrics.
    pub metrics: MatchMetrics,
    /// Periodic snapshots, in tick order.
    pub snapshots: Vec<SimulationSnapshot>,
    /// State at the end of the match.
    pub final_snapshot: SimulationSnapshot,
    /// Wall-clock run time.
    pub wall_time: Duration,
}

impl MatchResult {
    /// Final state hash.
    #[must_use]
    pub const fn final_state_hash(&self) -> u64 {
        self.metrics.final_state_hash
    }
}

/// Run one match to termination or timeout.
///
/// Each tick, both controllers spend (player first), then the simulation
/// advances by one fixed step.
pub fn run_match(config: &MatchConfig) -> SiegeResult<MatchResult> {
    let started = Instant::now();
    let mut state = SimulationState::new(&config.battle)?;
    let dt = state.tick_duration();
    let prices = &config.battle.prices;

    let mut controllers = [
        SideController::new(Side::Player, config.player_strategy.clone(), config.seed),
        SideController::new(Side::Enemy, config.enemy_strategy.clone(), config.seed),
    ];

    let mut collector = MetricsCollector::new(&config.match_id, &config.battle.name, config.seed);
    collector.set_strategy(Side::Player, &config.player_strategy.name);
    collector.set_strategy(Side::Enemy, &config.enemy_strategy.name);

    let mut snapshots = Vec::new();
    debug!(
        match_id = %config.match_id,
        scenario = %config.battle.name,
        seed = config.seed,
        "Match starting"
    );

    while !state.is_terminated() && state.tick() < config.max_ticks {
        for controller in &mut controllers {
            for outcome in controller.act(&mut state, prices, dt)? {
                collector.on_purchase(controller.side(), &outcome);
            }
        }

        let tick_started = Instant::now();
        let result = state.step(dt)?;
        let tick_time = tick_started.elapsed();
        if tick_time > SLOW_TICK_THRESHOLD {
            warn!(tick = result.tick, ?tick_time, "Slow tick");
        }
        collector.on_tick(&result);

        if let Some(interval) = config.snapshot_interval {
            if result.tick % interval == 0 {
                snapshots.push(SimulationSnapshot::capture(&state));
            }
        }
        if result.tick % PROGRESS_LOG_INTERVAL == 0 {
            debug!(
                match_id = %config.match_id,
                tick = result.tick,
                player_units = result.player_units_alive,
                enemy_units = result.enemy_units_alive,
                "Match progress"
            );
        }
    }

    let metrics = collector.finalize(&state);
    let wall_time = started.elapsed();
    info!(
        match_id = %metrics.match_id,
        ticks = metrics.duration_ticks,
        winner = ?metrics.winner,
        condition = ?metrics.end_condition,
        ?wall_time,
        "Match finished"
    );

    Ok(MatchResult {
        metrics,
        snapshots,
        final_snapshot: SimulationSnapshot::capture(&state),
        wall_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EndCondition;
    use crate::scenario;

    #[test]
    fn test_passive_sides_time_out() {
        let config = MatchConfig::new(BattleConfig::default(), 1)
            .with_strategies(Strategy::passive(), Strategy::passive())
            .with_max_ticks(120);
        let result = run_match(&config).unwrap();

        assert_eq!(result.metrics.duration_ticks, 120);
        assert_eq!(result.metrics.end_condition, EndCondition::Timeout);
        assert_eq!(result.metrics.winner, None);
        assert_eq!(result.metrics.player.units_spawned, 0);
        assert!(result.final_snapshot.units.is_empty());
    }

    #[test]
    fn test_rush_beats_passive() {
        let config = MatchConfig::new(scenario::short_lane(), 3)
            .with_strategies(Strategy::rush(), Strategy::passive());
        let result = run_match(&config).unwrap();

        assert_eq!(result.metrics.winner, Some(Side::Player));
        assert_eq!(result.metrics.end_condition, EndCondition::StrongholdDestroyed);
        assert!(result.metrics.player.units_spawned > 0);
        assert_eq!(result.metrics.enemy.final_stronghold_health, 0);
        assert!(result.final_snapshot.outcome.is_some());
    }

    #[test]
    fn test_snapshots_at_interval() {
        let config = MatchConfig::new(BattleConfig::default(), 1)
            .with_strategies(Strategy::passive(), Strategy::passive())
            .with_max_ticks(100)
            .with_snapshot_interval(25);
        let result = run_match(&config).unwrap();

        let ticks: Vec<u64> = result.snapshots.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_same_seed_same_match() {
        let config = MatchConfig::new(scenario::short_lane(), 99).with_max_ticks(6_000);
        let a = run_match(&config).unwrap();
        let b = run_match(&config).unwrap();
        assert_eq!(a.final_state_hash(), b.final_state_hash());
        assert_eq!(a.metrics.duration_ticks, b.metrics.duration_ticks);
        assert_eq!(a.metrics.winner, b.metrics.winner);
    }
}
