//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate (60 Hz by default). Each tick:
//! 1. Strongholds bank resources
//! 2. Attack cooldowns run down
//! 3. Overlapping opposing units engage and trade blows simultaneously
//! 4. Surviving units touching the enemy stronghold batter it
//! 5. Units that engaged nothing march on
//! 6. The fallen are removed
//! 7. Stronghold destruction ends the battle
//!
//! All state lives in one owned [`SimulationState`]; there are no globals,
//! so any number of battles can run side by side.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::data::{BattleConfig, UnitStats};
use crate::economy::{UpgradeKind, DAMAGE_UPGRADE_STEP, SPEED_UPGRADE_STEP};
use crate::error::{InvalidArgument, Result, SiegeError};
use crate::math::{fixed_serde, tick_duration, Fixed};
use crate::side::Side;
use crate::stronghold::Stronghold;
use crate::unit::{Unit, UnitId};

/// One side's forces: its stronghold, its units in spawn order and the stat
/// template new units are spawned with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Army {
    stronghold: Stronghold,
    units: Vec<Unit>,
    template: UnitStats,
}

impl Army {
    fn new(side: Side, config: &BattleConfig) -> Self {
        Self {
            stronghold: Stronghold::new(side, config.stronghold(side)),
            units: Vec::new(),
            template: config.unit(side).clone(),
        }
    }

    /// Owning side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.stronghold.side()
    }

    /// The side's stronghold.
    #[must_use]
    pub const fn stronghold(&self) -> &Stronghold {
        &self.stronghold
    }

    pub(crate) fn stronghold_mut(&mut self) -> &mut Stronghold {
        &mut self.stronghold
    }

    /// Units in spawn order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Stats the next spawned unit will get.
    #[must_use]
    pub const fn template(&self) -> &UnitStats {
        &self.template
    }

    /// Number of living units.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_alive()).count()
    }
}

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// One stronghold stands.
    Victory(Side),
    /// Both strongholds fell in the same tick.
    Draw,
}

impl Outcome {
    /// The winning side, if any.
    #[must_use]
    pub const fn winner(self) -> Option<Side> {
        match self {
            Self::Victory(side) => Some(side),
            Self::Draw => None,
        }
    }
}

/// Lifecycle of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Ticks still advance the battle.
    Running,
    /// A stronghold fell. Further ticks change nothing.
    Terminated(Outcome),
}

/// What an attack hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// An opposing unit.
    Unit(UnitId),
    /// The stronghold of the given side.
    Stronghold(Side),
}

/// A blow landed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackEvent {
    /// Unit that struck.
    pub attacker: UnitId,
    /// Side of the attacker.
    pub side: Side,
    /// What was struck.
    pub target: Target,
    /// Health actually removed, which is less than the attacker's damage
    /// when the blow overkills.
    pub damage: u32,
}

/// A unit removed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathEvent {
    /// The fallen unit.
    pub unit: UnitId,
    /// Its side.
    pub side: Side,
}

/// Events generated during a tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Attacks in resolution order: unit combat first, then stronghold
    /// assaults.
    pub attacks: Vec<AttackEvent>,
    /// Units that died this tick.
    pub deaths: Vec<DeathEvent>,
    /// Resources the player stronghold gained.
    pub player_resources_gained: u32,
    /// Resources the enemy stronghold gained.
    pub enemy_resources_gained: u32,
}

impl TickEvents {
    /// Resources gained by a side.
    #[must_use]
    pub const fn resources_gained(&self, side: Side) -> u32 {
        match side {
            Side::Player => self.player_resources_gained,
            Side::Enemy => self.enemy_resources_gained,
        }
    }

    /// Damage a side dealt to opposing units.
    #[must_use]
    pub fn unit_damage_by(&self, side: Side) -> u32 {
        self.attacks
            .iter()
            .filter(|a| a.side == side && matches!(a.target, Target::Unit(_)))
            .map(|a| a.damage)
            .sum()
    }

    /// Damage a side dealt to the opposing stronghold.
    #[must_use]
    pub fn stronghold_damage_by(&self, side: Side) -> u32 {
        self.attacks
            .iter()
            .filter(|a| a.side == side && matches!(a.target, Target::Stronghold(_)))
            .map(|a| a.damage)
            .sum()
    }

    /// Units a side lost.
    #[must_use]
    pub fn losses(&self, side: Side) -> usize {
        self.deaths.iter().filter(|d| d.side == side).count()
    }
}

/// Summary of one call to [`SimulationState::step`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickResult {
    /// Tick counter after the step.
    pub tick: u64,
    /// Player units still alive.
    pub player_units_alive: usize,
    /// Enemy units still alive.
    pub enemy_units_alive: usize,
    /// Whether the left (player) stronghold has fallen.
    pub left_destroyed: bool,
    /// Whether the right (enemy) stronghold has fallen.
    pub right_destroyed: bool,
    /// Set once the battle is over.
    pub outcome: Option<Outcome>,
    /// What happened during the step.
    pub events: TickEvents,
}

impl TickResult {
    /// Living units of a side.
    #[must_use]
    pub const fn units_alive(&self, side: Side) -> usize {
        match side {
            Side::Player => self.player_units_alive,
            Side::Enemy => self.enemy_units_alive,
        }
    }
}

/// The whole battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationState {
    #[serde(with = "fixed_serde")]
    arena_width: Fixed,
    tick_rate: u32,
    player: Army,
    enemy: Army,
    tick: u64,
    #[serde(with = "fixed_serde")]
    elapsed: Fixed,
    phase: Phase,
    next_unit_id: u32,
}

impl SimulationState {
    /// Set up a battle.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn new(config: &BattleConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(scenario = %config.name, "Battle initialised");
        Ok(Self {
            arena_width: config.arena_width,
            tick_rate: config.tick_rate,
            player: Army::new(Side::Player, config),
            enemy: Army::new(Side::Enemy, config),
            tick: 0,
            elapsed: Fixed::ZERO,
            phase: Phase::Running,
            next_unit_id: 0,
        })
    }

    /// Advance the battle by `dt` seconds.
    ///
    /// A terminated battle is left untouched and reports its final state.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::NegativeDelta`] for a negative `dt`, before
    /// anything is mutated.
    pub fn step(&mut self, dt: Fixed) -> Result<TickResult> {
        if dt < Fixed::ZERO {
            return Err(InvalidArgument::NegativeDelta(dt).into());
        }
        if let Phase::Terminated(_) = self.phase {
            return Ok(self.result(TickEvents::default()));
        }

        let mut events = TickEvents {
            player_resources_gained: self.player.stronghold.accumulate_resources(dt)?,
            enemy_resources_gained: self.enemy.stronghold.accumulate_resources(dt)?,
            ..TickEvents::default()
        };

        for unit in self.player.units.iter_mut().chain(self.enemy.units.iter_mut()) {
            unit.set_engaged(false);
            unit.tick_cooldown(dt);
        }

        self.resolve_unit_combat(&mut events);
        assault(&mut self.player.units, &mut self.enemy.stronghold, &mut events);
        assault(&mut self.enemy.units, &mut self.player.stronghold, &mut events);

        for unit in self.player.units.iter_mut().chain(self.enemy.units.iter_mut()) {
            if unit.is_alive() && !unit.is_engaged() {
                unit.advance(dt);
            }
        }

        remove_fallen(&mut self.player.units, &mut events);
        remove_fallen(&mut self.enemy.units, &mut events);

        self.tick += 1;
        self.elapsed = self.elapsed.saturating_add(dt);
        self.check_termination();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        Ok(self.result(events))
    }

    /// Advance by one tick at the configured tick rate.
    pub fn step_tick(&mut self) -> Result<TickResult> {
        self.step(self.tick_duration())
    }

    /// Pair every overlapping living player and enemy unit, pick targets,
    /// then apply all blows at once.
    fn resolve_unit_combat(&mut self, events: &mut TickEvents) {
        let players = &mut self.player.units;
        let enemies = &mut self.enemy.units;

        let mut player_targets: Vec<Option<usize>> = vec![None; players.len()];
        let mut enemy_targets: Vec<Option<usize>> = vec![None; enemies.len()];

        for (i, player) in players.iter_mut().enumerate() {
            if !player.is_alive() {
                continue;
            }
            for (j, enemy) in enemies.iter_mut().enumerate() {
                if !enemy.is_alive() || !player.bounds().overlaps(enemy.bounds()) {
                    continue;
                }
                player.set_engaged(true);
                enemy.set_engaged(true);
                if player_targets[i].is_none() && player.ready_to_attack() {
                    player_targets[i] = Some(j);
                }
                if enemy_targets[j].is_none() && enemy.ready_to_attack() {
                    enemy_targets[j] = Some(i);
                }
            }
        }

        strike(players, enemies, &player_targets, events);
        strike(enemies, players, &enemy_targets, events);
    }

    fn check_termination(&mut self) {
        let left = self.player.stronghold.is_destroyed();
        let right = self.enemy.stronghold.is_destroyed();
        let outcome = match (left, right) {
            (false, false) => return,
            (true, true) => Outcome::Draw,
            (true, false) => Outcome::Victory(Side::Enemy),
            (false, true) => Outcome::Victory(Side::Player),
        };
        for side in Side::ALL {
            if self.stronghold(side).is_destroyed() {
                tracing::debug!(%side, tick = self.tick, "Stronghold destroyed");
            }
        }
        tracing::info!(tick = self.tick, ?outcome, "Battle over");
        self.phase = Phase::Terminated(outcome);
    }

    fn result(&self, events: TickEvents) -> TickResult {
        TickResult {
            tick: self.tick,
            player_units_alive: self.player.alive_count(),
            enemy_units_alive: self.enemy.alive_count(),
            left_destroyed: self.player.stronghold.is_destroyed(),
            right_destroyed: self.enemy.stronghold.is_destroyed(),
            outcome: self.outcome(),
            events,
        }
    }

    /// Spawn a unit with explicit stats at the side's stronghold gate.
    ///
    /// Player units appear against the right wall of the left stronghold,
    /// enemy units against the left wall of the right stronghold, both
    /// standing on the stronghold's ground line. Affordability is the
    /// caller's business; see [`crate::economy::purchase`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::InvalidStats`] for stats that fail
    /// [`UnitStats::validate`].
    pub fn spawn_unit(&mut self, side: Side, stats: &UnitStats) -> Result<UnitId> {
        let gate = self.stronghold(side).bounds();
        let x = match side {
            Side::Player => gate.right(),
            Side::Enemy => gate.x - stats.width,
        };
        self.spawn_unit_at(side, x, stats)
    }

    /// Spawn a unit whose left edge sits at `x`, on the side's ground line.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::InvalidStats`] for stats that fail
    /// [`UnitStats::validate`].
    pub fn spawn_unit_at(&mut self, side: Side, x: Fixed, stats: &UnitStats) -> Result<UnitId> {
        stats.validate()?;
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;

        let ground = self.stronghold(side).bounds().bottom();
        let unit = Unit::new(id, side, x, ground, stats);
        tracing::debug!(%side, unit = %id, x = %x, "Unit spawned");
        self.army_mut(side).units.push(unit);
        Ok(id)
    }

    /// Spawn a unit from the side's current template.
    ///
    /// # Errors
    ///
    /// Fails only if the template itself is invalid.
    pub fn spawn_default_unit(&mut self, side: Side) -> Result<UnitId> {
        let stats = self.army(side).template.clone();
        self.spawn_unit(side, &stats)
    }

    /// Apply an upgrade by key ("tower", "speed" or "damage").
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::UnknownUpgrade`] for any other key, leaving
    /// the state untouched.
    pub fn apply_upgrade(&mut self, side: Side, key: &str) -> Result<()> {
        let kind: UpgradeKind = key.parse()?;
        self.apply_upgrade_kind(side, kind);
        Ok(())
    }

    /// Apply an upgrade.
    ///
    /// Tower upgrades raise the stronghold level. Speed and damage upgrades
    /// raise the side's template and every unit already on the field.
    pub fn apply_upgrade_kind(&mut self, side: Side, kind: UpgradeKind) {
        let army = self.army_mut(side);
        match kind {
            UpgradeKind::Tower => army.stronghold.upgrade(),
            UpgradeKind::Speed => {
                let step = Fixed::from_num(SPEED_UPGRADE_STEP);
                army.template.speed = army.template.speed.saturating_add(step);
                for unit in &mut army.units {
                    unit.boost_speed(step);
                }
            }
            UpgradeKind::Damage => {
                army.template.damage = army.template.damage.saturating_add(DAMAGE_UPGRADE_STEP);
                for unit in &mut army.units {
                    unit.boost_damage(DAMAGE_UPGRADE_STEP);
                }
            }
        }
        tracing::debug!(%side, upgrade = %kind, "Upgrade applied");
    }

    /// One side's forces.
    #[must_use]
    pub const fn army(&self, side: Side) -> &Army {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    pub(crate) fn army_mut(&mut self, side: Side) -> &mut Army {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    /// A side's stronghold.
    #[must_use]
    pub const fn stronghold(&self, side: Side) -> &Stronghold {
        self.army(side).stronghold()
    }

    /// A side's units in spawn order.
    #[must_use]
    pub fn units(&self, side: Side) -> &[Unit] {
        self.army(side).units()
    }

    /// Look up a unit on either side.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.player
            .units
            .iter()
            .chain(self.enemy.units.iter())
            .find(|u| u.id() == id)
    }

    /// Completed ticks.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Running or terminated.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// How the battle ended, once it has.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Running => None,
            Phase::Terminated(outcome) => Some(outcome),
        }
    }

    /// Whether the battle is over.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self.phase, Phase::Terminated(_))
    }

    /// Width of the lane.
    #[must_use]
    pub const fn arena_width(&self) -> Fixed {
        self.arena_width
    }

    /// Ticks per second.
    #[must_use]
    pub const fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Seconds per tick at the configured rate.
    #[must_use]
    pub fn tick_duration(&self) -> Fixed {
        tick_duration(self.tick_rate)
    }

    /// Compute a hash of the current state for determinism verification.
    ///
    /// Covers the clock, the phase, both strongholds and every unit in
    /// sequence order.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the state to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SiegeError::InvalidState(format!("Failed to serialize battle: {e}")))
    }

    /// Deserialize state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a serialized battle.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SiegeError::InvalidState(format!("Failed to deserialize battle: {e}")))
    }
}

/// Advance `state` by `dt` seconds.
///
/// # Errors
///
/// See [`SimulationState::step`].
pub fn step(state: &mut SimulationState, dt: Fixed) -> Result<TickResult> {
    state.step(dt)
}

/// Apply pre-selected unit-versus-unit blows.
fn strike(
    attackers: &mut [Unit],
    defenders: &mut [Unit],
    targets: &[Option<usize>],
    events: &mut TickEvents,
) {
    for (attacker, target) in attackers.iter_mut().zip(targets) {
        let Some(index) = *target else { continue };
        let defender = &mut defenders[index];
        let dealt = defender.take_damage(attacker.damage());
        attacker.register_attack();
        events.attacks.push(AttackEvent {
            attacker: attacker.id(),
            side: attacker.owner(),
            target: Target::Unit(defender.id()),
            damage: dealt,
        });
    }
}

/// Surviving units touching the opposing stronghold engage it and, when
/// ready, strike it.
fn assault(units: &mut [Unit], stronghold: &mut Stronghold, events: &mut TickEvents) {
    for unit in units.iter_mut() {
        if !unit.is_alive() || !unit.bounds().overlaps(stronghold.bounds()) {
            continue;
        }
        unit.set_engaged(true);
        if !unit.ready_to_attack() {
            continue;
        }
        let dealt = stronghold.take_damage(unit.damage());
        unit.register_attack();
        events.attacks.push(AttackEvent {
            attacker: unit.id(),
            side: unit.owner(),
            target: Target::Stronghold(stronghold.side()),
            damage: dealt,
        });
    }
}

fn remove_fallen(units: &mut Vec<Unit>, events: &mut TickEvents) {
    units.retain(|unit| {
        if unit.is_alive() {
            return true;
        }
        tracing::debug!(side = %unit.owner(), unit = %unit.id(), "Unit fell");
        events.deaths.push(DeathEvent {
            unit: unit.id(),
            side: unit.owner(),
        });
        false
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battle() -> SimulationState {
        SimulationState::new(&BattleConfig::default()).unwrap()
    }

    #[test]
    fn test_new_battle() {
        let state = battle();
        assert_eq!(state.tick(), 0);
        assert_eq!(state.phase(), Phase::Running);
        assert!(state.units(Side::Player).is_empty());
        assert_eq!(state.stronghold(Side::Enemy).name(), "RightCastle");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = BattleConfig::default();
        config.tick_rate = 0;
        assert!(matches!(
            SimulationState::new(&config),
            Err(SiegeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_spawn_positions_at_gates() {
        let mut state = battle();
        let p = state.spawn_default_unit(Side::Player).unwrap();
        let e = state.spawn_default_unit(Side::Enemy).unwrap();

        let player = state.unit(p).unwrap();
        assert_eq!(player.position(), Fixed::from_num(250));
        assert_eq!(player.bounds().bottom(), Fixed::from_num(350));

        let enemy = state.unit(e).unwrap();
        assert_eq!(enemy.position(), Fixed::from_num(1286));
        assert_ne!(p, e);
    }

    #[test]
    fn test_spawn_rejects_invalid_stats() {
        let mut state = battle();
        let err = state
            .spawn_unit(Side::Player, &UnitStats::default().with_health(0))
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(state.units(Side::Player).is_empty());
    }

    #[test]
    fn test_negative_dt_leaves_state_untouched() {
        let mut state = battle();
        state.spawn_default_unit(Side::Player).unwrap();
        let before = state.clone();

        let err = state.step(Fixed::from_num(-0.5)).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(state, before);
    }

    #[test]
    fn test_step_advances_clock() {
        let mut state = battle();
        let dt = state.tick_duration();
        let result = state.step_tick().unwrap();
        assert_eq!(result.tick, 1);
        assert_eq!(state.elapsed(), dt);
        assert!(result.outcome.is_none());
    }

    #[test]
    fn test_free_step_function() {
        let mut state = battle();
        let result = step(&mut state, Fixed::from_num(0.5)).unwrap();
        assert_eq!(result.events.player_resources_gained, 5);
        assert_eq!(result.events.enemy_resources_gained, 5);
    }

    #[test]
    fn test_upgrade_by_key() {
        let mut state = battle();
        let id = state.spawn_default_unit(Side::Enemy).unwrap();

        state.apply_upgrade(Side::Enemy, "speed").unwrap();
        state.apply_upgrade(Side::Enemy, "damage").unwrap();
        state.apply_upgrade(Side::Enemy, "tower").unwrap();

        let unit = state.unit(id).unwrap();
        assert_eq!(unit.speed(), Fixed::from_num(145));
        assert_eq!(unit.damage(), 14);
        assert_eq!(state.army(Side::Enemy).template().speed, Fixed::from_num(145));
        assert_eq!(state.army(Side::Enemy).template().damage, 14);
        assert_eq!(state.stronghold(Side::Enemy).level(), 2);

        // Player side untouched
        assert_eq!(state.army(Side::Player).template().damage, 12);
    }

    #[test]
    fn test_unknown_upgrade_rejected() {
        let mut state = battle();
        let before = state.clone();
        let err = state.apply_upgrade(Side::Player, "moat").unwrap_err();
        assert_eq!(
            err,
            SiegeError::InvalidArgument(InvalidArgument::UnknownUpgrade("moat".to_string()))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = battle();
        let b = battle();
        assert_eq!(a.state_hash(), b.state_hash());

        a.spawn_default_unit(Side::Player).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_serialize_roundtrip_continues_identically() {
        let mut state = battle();
        state.spawn_default_unit(Side::Player).unwrap();
        state.spawn_default_unit(Side::Enemy).unwrap();
        for _ in 0..30 {
            state.step_tick().unwrap();
        }

        let bytes = state.serialize().unwrap();
        let mut restored = SimulationState::deserialize(&bytes).unwrap();
        assert_eq!(restored, state);

        for _ in 0..200 {
            state.step_tick().unwrap();
            restored.step_tick().unwrap();
        }
        assert_eq!(restored.state_hash(), state.state_hash());
    }

    #[test]
    fn test_deserialize_garbage() {
        assert!(matches!(
            SimulationState::deserialize(&[1, 2, 3]),
            Err(SiegeError::InvalidState(_))
        ));
    }
}
