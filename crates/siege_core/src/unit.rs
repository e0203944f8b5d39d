//! Mobile combatants.
//!
//! A unit marches along the lane toward the opposing stronghold, stops
//! when it touches an opponent, and strikes whenever its attack timer has
//! run down. Units never leave their lane: the vertical position is fixed
//! at spawn and only `x` changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::UnitStats;
use crate::geometry::Bounds;
use crate::health::Health;
use crate::math::{fixed_serde, Fixed};
use crate::side::{Facing, Side};

/// Unique identifier for units within one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single combatant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    owner: Side,
    facing: Facing,
    bounds: Bounds,
    health: Health,
    damage: u32,
    #[serde(with = "fixed_serde")]
    speed: Fixed,
    #[serde(with = "fixed_serde")]
    attack_cooldown: Fixed,
    #[serde(with = "fixed_serde")]
    attack_timer: Fixed,
    engaged: bool,
}

impl Unit {
    /// Create a unit standing on `ground_y` with its left edge at `x`.
    ///
    /// Fresh units are ready to attack immediately.
    #[must_use]
    pub fn new(id: UnitId, owner: Side, x: Fixed, ground_y: Fixed, stats: &UnitStats) -> Self {
        Self {
            id,
            owner,
            facing: owner.facing(),
            bounds: Bounds::new(x, ground_y - stats.height, stats.width, stats.height),
            health: Health::new(stats.max_health),
            damage: stats.damage,
            speed: stats.speed,
            attack_cooldown: stats.attack_cooldown,
            attack_timer: Fixed::ZERO,
            engaged: false,
        }
    }

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Owning side.
    #[must_use]
    pub const fn owner(&self) -> Side {
        self.owner
    }

    /// Marching direction.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }

    /// Horizontal position (left edge).
    #[must_use]
    pub const fn position(&self) -> Fixed {
        self.bounds.x
    }

    /// Bounding box.
    #[must_use]
    pub const fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Hit points.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Damage per attack.
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }

    /// Distance per second.
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Seconds between attacks.
    #[must_use]
    pub const fn attack_cooldown(&self) -> Fixed {
        self.attack_cooldown
    }

    /// Seconds until the next attack is allowed.
    #[must_use]
    pub const fn attack_timer(&self) -> Fixed {
        self.attack_timer
    }

    /// Whether the unit touched an opponent or the enemy stronghold on the
    /// most recent tick.
    #[must_use]
    pub const fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Alive iff health is above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// March forward by `speed * dt`. Dead units stay where they fell.
    pub fn advance(&mut self, dt: Fixed) {
        debug_assert!(dt >= Fixed::ZERO, "negative dt reached Unit::advance");
        if !self.is_alive() {
            return;
        }
        let step = self
            .speed
            .saturating_mul(dt)
            .saturating_mul(self.facing.multiplier());
        self.bounds.translate_x(step);
    }

    /// Run the attack timer down by `dt`, stopping at zero.
    pub fn tick_cooldown(&mut self, dt: Fixed) {
        debug_assert!(dt >= Fixed::ZERO, "negative dt reached Unit::tick_cooldown");
        if self.attack_timer > Fixed::ZERO {
            self.attack_timer = (self.attack_timer - dt).max(Fixed::ZERO);
        }
    }

    /// Whether the attack timer has run out.
    #[must_use]
    pub fn ready_to_attack(&self) -> bool {
        self.attack_timer <= Fixed::ZERO
    }

    /// Re-arm the attack timer after landing a blow.
    pub fn register_attack(&mut self) {
        self.attack_timer = self.attack_cooldown;
    }

    /// Lose health, never below zero. Returns the damage actually taken.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.health.apply_damage(amount)
    }

    /// Raise marching speed (speed upgrade).
    pub fn boost_speed(&mut self, amount: Fixed) {
        self.speed = self.speed.saturating_add(amount);
    }

    /// Raise damage per attack (damage upgrade).
    pub fn boost_damage(&mut self, amount: u32) {
        self.damage = self.damage.saturating_add(amount);
    }

    pub(crate) fn set_engaged(&mut self, engaged: bool) {
        self.engaged = engaged;
    }
}
