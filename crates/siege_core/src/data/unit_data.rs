//! Unit stat blocks for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::error::InvalidArgument;
use crate::math::{decimal_serde, Fixed};

/// Default footprint edge for a unit, in world units.
fn default_unit_size() -> Fixed {
    Fixed::from_num(64)
}

/// Stats a unit is spawned with.
///
/// Each side keeps one of these as its template; speed and damage
/// upgrades raise the template so future spawns inherit them.
///
/// # Example RON
///
/// ```ron
/// UnitStats(
///     speed: 140.0,
///     max_health: 60,
///     damage: 12,
///     attack_cooldown: 0.8,
///     width: 64.0,
///     height: 64.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStats {
    /// Horizontal distance covered per second.
    #[serde(with = "decimal_serde")]
    pub speed: Fixed,

    /// Maximum (and starting) health points.
    pub max_health: u32,

    /// Damage dealt per attack.
    pub damage: u32,

    /// Seconds between attacks.
    #[serde(with = "decimal_serde")]
    pub attack_cooldown: Fixed,

    /// Bounding box width.
    #[serde(with = "decimal_serde", default = "default_unit_size")]
    pub width: Fixed,

    /// Bounding box height.
    #[serde(with = "decimal_serde", default = "default_unit_size")]
    pub height: Fixed,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            speed: Fixed::from_num(140),
            max_health: 60,
            damage: 12,
            attack_cooldown: Fixed::from_num(0.8),
            width: default_unit_size(),
            height: default_unit_size(),
        }
    }
}

impl UnitStats {
    /// Builder method to set speed.
    #[must_use]
    pub fn with_speed(mut self, speed: Fixed) -> Self {
        self.speed = speed;
        self
    }

    /// Builder method to set health.
    #[must_use]
    pub fn with_health(mut self, max_health: u32) -> Self {
        self.max_health = max_health;
        self
    }

    /// Builder method to set damage.
    #[must_use]
    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    /// Builder method to set the attack cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, attack_cooldown: Fixed) -> Self {
        self.attack_cooldown = attack_cooldown;
        self
    }

    /// Check that a unit built from these stats can live, move and fight.
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        if self.max_health == 0 {
            return Err(InvalidArgument::InvalidStats(
                "max_health must be positive".to_string(),
            ));
        }
        if self.speed < Fixed::ZERO {
            return Err(InvalidArgument::InvalidStats(format!(
                "speed must be non-negative, got {}",
                self.speed
            )));
        }
        if self.attack_cooldown < Fixed::ZERO {
            return Err(InvalidArgument::InvalidStats(format!(
                "attack_cooldown must be non-negative, got {}",
                self.attack_cooldown
            )));
        }
        if self.width <= Fixed::ZERO || self.height <= Fixed::ZERO {
            return Err(InvalidArgument::InvalidStats(format!(
                "footprint must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
