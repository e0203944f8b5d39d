//! Test fixtures and helpers.
//!
//! Pre-built battles and unit configurations for consistent testing.

use fixed::types::I32F32;
use siege_core::data::{BattleConfig, UnitStats};
use siege_core::side::Side;
use siege_core::simulation::SimulationState;
use siege_core::unit::UnitId;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// The default two-castle battle, no units yet.
///
/// # Panics
///
/// Panics if the default configuration stops validating.
#[must_use]
pub fn classic_battle() -> SimulationState {
    battle_with(&BattleConfig::default())
}

/// A battle from an explicit configuration.
///
/// # Panics
///
/// Panics if the configuration is invalid.
#[must_use]
pub fn battle_with(config: &BattleConfig) -> SimulationState {
    SimulationState::new(config).expect("fixture battle config must validate")
}

/// Default configuration with strongholds of the given health.
#[must_use]
pub fn fragile_strongholds(max_health: u32) -> BattleConfig {
    let mut config = BattleConfig::default();
    config.player_stronghold.max_health = max_health;
    config.enemy_stronghold.max_health = max_health;
    config
}

/// Default unit stats with custom health and damage.
#[must_use]
pub fn brawler(max_health: u32, damage: u32) -> UnitStats {
    UnitStats::default().with_health(max_health).with_damage(damage)
}

/// Place a unit with its left edge at `x`.
///
/// # Panics
///
/// Panics if the stats are invalid.
pub fn place_unit(state: &mut SimulationState, side: Side, x: i32, stats: &UnitStats) -> UnitId {
    state
        .spawn_unit_at(side, fixed(x), stats)
        .expect("fixture unit stats must validate")
}

/// A battle with `per_side` default units spawned at each gate, staggered so
/// the lanes fill with overlapping brawls once they meet.
///
/// # Panics
///
/// Panics if spawning fails.
#[must_use]
pub fn crowded_battle(per_side: usize) -> SimulationState {
    let mut state = classic_battle();
    let stats = UnitStats::default();
    for i in 0..per_side {
        let offset = i32::try_from(i % 8).unwrap_or(0) * 24;
        place_unit(&mut state, Side::Player, 250 + offset, &stats);
        place_unit(&mut state, Side::Enemy, 1286 - offset, &stats);
    }
    state
}

/// Run `state` at its tick rate for up to `ticks` ticks or until the battle
/// ends. Returns the number of ticks actually run.
///
/// # Panics
///
/// Panics if a step fails.
pub fn run_ticks(state: &mut SimulationState, ticks: u64) -> u64 {
    let mut ran = 0;
    while ran < ticks && !state.is_terminated() {
        state.step_tick().expect("fixed tick step must succeed");
        ran += 1;
    }
    ran
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crowded_battle_populates_both_sides() {
        let state = crowded_battle(10);
        assert_eq!(state.units(Side::Player).len(), 10);
        assert_eq!(state.units(Side::Enemy).len(), 10);
    }

    #[test]
    fn test_run_ticks_stops_at_termination() {
        let mut state = battle_with(&fragile_strongholds(1));
        place_unit(&mut state, Side::Player, 1300, &UnitStats::default());
        assert_eq!(run_ticks(&mut state, 100), 1);
        assert!(state.is_terminated());
    }
}
