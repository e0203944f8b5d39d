//! Read-only view of a battle for presentation.
//!
//! Renderers, the ASCII visualizer and JSON output never touch
//! [`SimulationState`] directly. They take a snapshot, which converts
//! fixed-point values to `f32` once at this boundary.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;
use crate::side::Side;
use crate::simulation::{Outcome, SimulationState};
use crate::stronghold::Stronghold;
use crate::unit::{Unit, UnitId};

fn to_f32(value: Fixed) -> f32 {
    value.to_num::<f32>()
}

/// A unit as drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    /// Unit id.
    pub id: UnitId,
    /// Owning side.
    pub side: Side,
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Box width.
    pub width: f32,
    /// Box height.
    pub height: f32,
    /// +1 marching right, -1 marching left.
    pub facing: i32,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Touching an opponent or the enemy stronghold.
    pub engaged: bool,
}

impl UnitView {
    fn of(unit: &Unit) -> Self {
        let bounds = unit.bounds();
        Self {
            id: unit.id(),
            side: unit.owner(),
            x: to_f32(bounds.x),
            y: to_f32(bounds.y),
            width: to_f32(bounds.width),
            height: to_f32(bounds.height),
            facing: unit.facing().sign(),
            health: unit.health().current,
            max_health: unit.health().max,
            engaged: unit.is_engaged(),
        }
    }
}

/// A stronghold as drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongholdView {
    /// Owning side.
    pub side: Side,
    /// Display name.
    pub name: String,
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Stronghold level.
    pub level: u32,
    /// Spendable resources.
    pub resources: u32,
}

impl StrongholdView {
    fn of(stronghold: &Stronghold) -> Self {
        let bounds = stronghold.bounds();
        Self {
            side: stronghold.side(),
            name: stronghold.name().to_string(),
            x: to_f32(bounds.x),
            y: to_f32(bounds.y),
            width: to_f32(bounds.width),
            height: to_f32(bounds.height),
            health: stronghold.health().current,
            max_health: stronghold.health().max,
            level: stronghold.level(),
            resources: stronghold.available_resources(),
        }
    }

    /// Health as a fraction in `[0, 1]`.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.health as f32 / self.max_health as f32;
        fraction
    }
}

/// The whole battle at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Completed ticks.
    pub tick: u64,
    /// Simulated seconds.
    pub elapsed_secs: f32,
    /// Lane width.
    pub arena_width: f32,
    /// Player stronghold.
    pub player_stronghold: StrongholdView,
    /// Enemy stronghold.
    pub enemy_stronghold: StrongholdView,
    /// Every unit, player units first, each side in spawn order.
    pub units: Vec<UnitView>,
    /// Set once the battle is over.
    pub outcome: Option<Outcome>,
}

impl SimulationSnapshot {
    /// Copy out everything a renderer needs.
    #[must_use]
    pub fn capture(state: &SimulationState) -> Self {
        let units = Side::ALL
            .iter()
            .flat_map(|&side| state.units(side).iter().map(UnitView::of))
            .collect();
        Self {
            tick: state.tick(),
            elapsed_secs: to_f32(state.elapsed()),
            arena_width: to_f32(state.arena_width()),
            player_stronghold: StrongholdView::of(state.stronghold(Side::Player)),
            enemy_stronghold: StrongholdView::of(state.stronghold(Side::Enemy)),
            units,
            outcome: state.outcome(),
        }
    }

    /// Stronghold of a side.
    #[must_use]
    pub const fn stronghold(&self, side: Side) -> &StrongholdView {
        match side {
            Side::Player => &self.player_stronghold,
            Side::Enemy => &self.enemy_stronghold,
        }
    }

    /// Units of a side.
    pub fn units_of(&self, side: Side) -> impl Iterator<Item = &UnitView> {
        self.units.iter().filter(move |u| u.side == side)
    }
}
