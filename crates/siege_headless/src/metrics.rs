//! Match metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] watches one match through its tick results and
//! purchases; [`BatchSummary`] aggregates many finished matches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use siege_core::economy::PurchaseOutcome;
use siege_core::side::Side;
use siege_core::simulation::{Outcome, SimulationState, Target, TickResult};

/// Cap on the per-match event log.
const MAX_EVENTS: usize = 10_000;

/// How a match ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndCondition {
    /// One stronghold fell.
    StrongholdDestroyed,
    /// Both strongholds fell on the same tick.
    Draw,
    /// Tick limit reached with both strongholds standing.
    #[default]
    Timeout,
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// Unique match identifier.
    pub match_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Controller seed.
    pub seed: u64,
    /// Total match duration in ticks.
    pub duration_ticks: u64,
    /// Winning side, if any.
    pub winner: Option<Side>,
    /// How the match ended.
    pub end_condition: EndCondition,
    /// Player side.
    pub player: SideMetrics,
    /// Enemy side.
    pub enemy: SideMetrics,
    /// Timed events log.
    pub events: Vec<TimedEvent>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl MatchMetrics {
    /// Create a new match metrics instance.
    #[must_use]
    pub fn new(match_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            match_id: match_id.into(),
            scenario: scenario.into(),
            seed,
            player: SideMetrics::new(Side::Player),
            enemy: SideMetrics::new(Side::Enemy),
            ..Default::default()
        }
    }

    /// Metrics for one side.
    #[must_use]
    pub const fn side(&self, side: Side) -> &SideMetrics {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    /// Mutable metrics for one side.
    pub fn side_mut(&mut self, side: Side) -> &mut SideMetrics {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    /// Record a timed event. Silently drops events past the log cap.
    pub fn record_event(&mut self, tick: u64, event_type: EventType, side: Side, details: &str) {
        if self.events.len() >= MAX_EVENTS {
            return;
        }
        self.events.push(TimedEvent {
            tick,
            event_type,
            side,
            details: details.to_string(),
        });
    }

    /// Whether the match ran out of time.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.end_condition == EndCondition::Timeout
    }
}

/// Metrics for one side in a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Side these numbers belong to.
    pub side: Side,
    /// Name of the controlling strategy.
    pub strategy: String,

    // === Army ===
    /// Units bought.
    pub units_spawned: u32,
    /// Own units that died.
    pub units_lost: u32,
    /// Enemy units this side killed.
    pub units_killed: u32,
    /// Most units alive at once.
    pub peak_army_size: usize,
    /// Kill/death ratio.
    pub kd_ratio: f64,

    // === Damage ===
    /// Health removed from enemy units.
    pub damage_to_units: u64,
    /// Health removed from the enemy stronghold.
    pub damage_to_stronghold: u64,
    /// Tick of the first hit on the enemy stronghold.
    pub first_assault_tick: Option<u64>,

    // === Economy ===
    /// Food gained from income (excludes the starting purse).
    pub resources_gathered: u64,
    /// Food spent on purchases.
    pub resources_spent: u32,
    /// Upgrades bought, by upgrade key.
    pub upgrades: HashMap<String, u32>,

    // === Stronghold ===
    /// Stronghold health at the end.
    pub final_stronghold_health: u32,
    /// Stronghold level at the end.
    pub final_stronghold_level: u32,
}

impl Default for SideMetrics {
    fn default() -> Self {
        Self::new(Side::Player)
    }
}

impl SideMetrics {
    /// Create empty metrics for a side.
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            strategy: String::new(),
            units_spawned: 0,
            units_lost: 0,
            units_killed: 0,
            peak_army_size: 0,
            kd_ratio: 0.0,
            damage_to_units: 0,
            damage_to_stronghold: 0,
            first_assault_tick: None,
            resources_gathered: 0,
            resources_spent: 0,
            upgrades: HashMap::new(),
            final_stronghold_health: 0,
            final_stronghold_level: 0,
        }
    }

    /// Total upgrades bought.
    #[must_use]
    pub fn upgrades_bought(&self) -> u32 {
        self.upgrades.values().sum()
    }

    /// Calculate derived stats. A side with no losses scores its kill
    /// count, which keeps the ratio finite for JSON output.
    pub fn calculate_derived_stats(&mut self) {
        self.kd_ratio = self.units_killed as f64 / self.units_lost.max(1) as f64;
    }
}

/// A timed event during the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Tick when event occurred.
    pub tick: u64,
    /// Event type.
    pub event_type: EventType,
    /// Side involved.
    pub side: Side,
    /// Additional details.
    pub details: String,
}

/// Types of match events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// A unit was bought.
    UnitSpawned,
    /// An upgrade was bought.
    UpgradeBought,
    /// A unit died.
    UnitLost,
    /// First hit on the enemy stronghold.
    FirstAssault,
    /// A stronghold fell.
    StrongholdDestroyed,
}

/// Summary statistics across multiple matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total matches played.
    pub total_matches: u32,
    /// Matches won by each side, keyed by side name.
    pub wins_by_side: HashMap<String, u32>,
    /// Win rates by side.
    pub win_rates: HashMap<String, f64>,
    /// Both strongholds fell together.
    pub draws: u32,
    /// Tick limit reached.
    pub timeouts: u32,
    /// Average match duration in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest match.
    pub min_duration_ticks: u64,
    /// Longest match.
    pub max_duration_ticks: u64,

    // === Aggregated Stats ===
    /// Average units spawned per match by side.
    pub avg_units_spawned: HashMap<String, f64>,
    /// Average food gathered per match by side.
    pub avg_resources_gathered: HashMap<String, f64>,
    /// Average K/D ratio by side.
    pub avg_kd_ratio: HashMap<String, f64>,
    /// Average tick of the first stronghold hit by side.
    pub avg_first_assault_tick: HashMap<String, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of match metrics.
    #[must_use]
    pub fn from_matches(matches: &[MatchMetrics]) -> Self {
        if matches.is_empty() {
            return Self::default();
        }

        let total = matches.len() as f64;
        let mut summary = Self {
            total_matches: matches.len() as u32,
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        for game in matches {
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);

            match (game.winner, game.end_condition) {
                (Some(winner), _) => {
                    *summary.wins_by_side.entry(winner.key().to_string()).or_default() += 1;
                }
                (None, EndCondition::Timeout) => summary.timeouts += 1,
                (None, _) => summary.draws += 1,
            }
        }
        summary.avg_duration_ticks = duration_sum as f64 / total;

        for side in Side::ALL {
            let key = side.key().to_string();
            let wins = summary.wins_by_side.get(&key).copied().unwrap_or(0);
            summary.win_rates.insert(key.clone(), wins as f64 / total);

            let per_side: Vec<&SideMetrics> = matches.iter().map(|m| m.side(side)).collect();
            let units = per_side.iter().map(|s| s.units_spawned as f64).sum::<f64>() / total;
            let gathered = per_side.iter().map(|s| s.resources_gathered as f64).sum::<f64>() / total;
            summary.avg_units_spawned.insert(key.clone(), units);
            summary.avg_resources_gathered.insert(key.clone(), gathered);

            let kd = per_side.iter().map(|s| s.kd_ratio).sum::<f64>() / total;
            summary.avg_kd_ratio.insert(key.clone(), kd);

            let assaults: Vec<u64> = per_side.iter().filter_map(|s| s.first_assault_tick).collect();
            if !assaults.is_empty() {
                let avg = assaults.iter().sum::<u64>() as f64 / assaults.len() as f64;
                summary.avg_first_assault_tick.insert(key, avg);
            }
        }

        summary
    }

    /// Win rate of one side.
    #[must_use]
    pub fn win_rate(&self, side: Side) -> f64 {
        self.win_rates.get(side.key()).copied().unwrap_or(0.0)
    }

    /// Whether neither side wins more than `threshold` above the other.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        (self.win_rate(Side::Player) - self.win_rate(Side::Enemy)).abs() <= threshold
    }

    /// Side winning noticeably more often, if any.
    #[must_use]
    pub fn dominant_side(&self, threshold: f64) -> Option<Side> {
        let diff = self.win_rate(Side::Player) - self.win_rate(Side::Enemy);
        if diff > threshold {
            Some(Side::Player)
        } else if -diff > threshold {
            Some(Side::Enemy)
        } else {
            None
        }
    }
}

/// Metrics collector that tracks events during a match.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: MatchMetrics,
    current_tick: u64,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new(match_id: &str, scenario: &str, seed: u64) -> Self {
        Self {
            metrics: MatchMetrics::new(match_id, scenario, seed),
            current_tick: 0,
        }
    }

    /// Name the strategy controlling a side.
    pub fn set_strategy(&mut self, side: Side, name: &str) {
        self.metrics.side_mut(side).strategy = name.to_string();
    }

    /// Record a controller purchase made before the current tick.
    pub fn on_purchase(&mut self, side: Side, outcome: &PurchaseOutcome) {
        match outcome {
            PurchaseOutcome::Spawned(id) => {
                self.metrics.side_mut(side).units_spawned += 1;
                self.metrics
                    .record_event(self.current_tick, EventType::UnitSpawned, side, &id.to_string());
            }
            PurchaseOutcome::Upgraded(kind) => {
                *self
                    .metrics
                    .side_mut(side)
                    .upgrades
                    .entry(kind.key().to_string())
                    .or_default() += 1;
                self.metrics
                    .record_event(self.current_tick, EventType::UpgradeBought, side, kind.key());
            }
            PurchaseOutcome::Unaffordable { .. } => {}
        }
    }

    /// Fold one tick's results into the running totals.
    pub fn on_tick(&mut self, result: &TickResult) {
        self.current_tick = result.tick;
        let events = &result.events;

        for side in Side::ALL {
            let tick = result.tick;
            let metrics = self.metrics.side_mut(side);
            metrics.resources_gathered += u64::from(events.resources_gained(side));
            metrics.damage_to_units += u64::from(events.unit_damage_by(side));
            metrics.peak_army_size = metrics.peak_army_size.max(result.units_alive(side));

            let assault = events.stronghold_damage_by(side);
            let hit_stronghold = events
                .attacks
                .iter()
                .any(|a| a.side == side && matches!(a.target, Target::Stronghold(_)));
            metrics.damage_to_stronghold += u64::from(assault);
            if hit_stronghold && metrics.first_assault_tick.is_none() {
                metrics.first_assault_tick = Some(tick);
                self.metrics
                    .record_event(tick, EventType::FirstAssault, side, "");
            }
        }

        for death in &events.deaths {
            self.metrics.side_mut(death.side).units_lost += 1;
            self.metrics.side_mut(death.side.opponent()).units_killed += 1;
            self.metrics.record_event(
                result.tick,
                EventType::UnitLost,
                death.side,
                &death.unit.to_string(),
            );
        }

        if result.left_destroyed {
            self.metrics
                .record_event(result.tick, EventType::StrongholdDestroyed, Side::Player, "");
        }
        if result.right_destroyed {
            self.metrics
                .record_event(result.tick, EventType::StrongholdDestroyed, Side::Enemy, "");
        }
    }

    /// Finalize and return the metrics.
    #[must_use]
    pub fn finalize(mut self, state: &SimulationState) -> MatchMetrics {
        self.metrics.duration_ticks = state.tick();
        self.metrics.final_state_hash = state.state_hash();
        let (winner, condition) = match state.outcome() {
            Some(Outcome::Victory(side)) => (Some(side), EndCondition::StrongholdDestroyed),
            Some(Outcome::Draw) => (None, EndCondition::Draw),
            None => (None, EndCondition::Timeout),
        };
        self.metrics.winner = winner;
        self.metrics.end_condition = condition;

        for side in Side::ALL {
            let stronghold = state.stronghold(side);
            let metrics = self.metrics.side_mut(side);
            metrics.resources_spent = stronghold.resources_spent();
            metrics.final_stronghold_health = stronghold.health().current;
            metrics.final_stronghold_level = stronghold.level();
            metrics.calculate_derived_stats();
        }
        self.metrics
    }

    /// Current metrics (for inspection during the match).
    #[must_use]
    pub fn current(&self) -> &MatchMetrics {
        &self.metrics
    }
}
