//! Complete battle definition.

use serde::{Deserialize, Serialize};

use super::stronghold_data::StrongholdConfig;
use super::unit_data::UnitStats;
use crate::economy::PriceList;
use crate::error::{Result, SiegeError};
use crate::math::{decimal_serde, Fixed};
use crate::side::Side;

/// Default simulation rate.
const fn default_tick_rate() -> u32 {
    60
}

/// Everything needed to set up a battle.
///
/// Loaded from a RON scenario file by the headless runner; the default
/// reproduces the classic 1600-wide two-castle lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Scenario name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Width of the lane.
    #[serde(with = "decimal_serde")]
    pub arena_width: Fixed,

    /// Fixed ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,

    /// Left stronghold.
    pub player_stronghold: StrongholdConfig,

    /// Right stronghold.
    pub enemy_stronghold: StrongholdConfig,

    /// Starting unit template for the player.
    #[serde(default)]
    pub player_unit: UnitStats,

    /// Starting unit template for the enemy.
    #[serde(default)]
    pub enemy_unit: UnitStats,

    /// Shop prices used by controllers.
    #[serde(default)]
    pub prices: PriceList,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            name: "Classic Siege".to_string(),
            description: "Two castles, one lane, 60 Hz".to_string(),
            arena_width: Fixed::from_num(1600),
            tick_rate: default_tick_rate(),
            player_stronghold: StrongholdConfig::castle("LeftCastle", 50),
            enemy_stronghold: StrongholdConfig::castle("RightCastle", 1350),
            player_unit: UnitStats::default(),
            enemy_unit: UnitStats::default(),
            prices: PriceList::default(),
        }
    }
}

impl BattleConfig {
    /// Parse a battle from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| SiegeError::InvalidConfig(e.to_string()))
    }

    /// Render this battle as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SiegeError::InvalidConfig(e.to_string()))
    }

    /// Stronghold definition for a side.
    #[must_use]
    pub fn stronghold(&self, side: Side) -> &StrongholdConfig {
        match side {
            Side::Player => &self.player_stronghold,
            Side::Enemy => &self.enemy_stronghold,
        }
    }

    /// Unit template for a side.
    #[must_use]
    pub fn unit(&self, side: Side) -> &UnitStats {
        match side {
            Side::Player => &self.player_unit,
            Side::Enemy => &self.enemy_unit,
        }
    }

    /// Validate the whole battle.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            return Err(SiegeError::InvalidConfig(
                "tick_rate must be positive".to_string(),
            ));
        }

        for side in Side::ALL {
            if let Some(problem) = self.stronghold(side).problem() {
                return Err(SiegeError::InvalidConfig(problem));
            }
            self.unit(side).validate().map_err(|e| {
                SiegeError::InvalidConfig(format!("{side} unit: {e}"))
            })?;
        }

        let left = self.player_stronghold.bounds();
        let right = self.enemy_stronghold.bounds();
        if left.right() > right.x {
            return Err(SiegeError::InvalidConfig(format!(
                "player stronghold (ends at {}) must sit left of the enemy stronghold (starts at {})",
                left.right(),
                right.x
            )));
        }
        if right.right() > self.arena_width || left.x < Fixed::ZERO {
            return Err(SiegeError::InvalidConfig(format!(
                "strongholds must fit inside the {}-wide arena",
                self.arena_width
            )));
        }

        self.prices.validate()?;
        Ok(())
    }
}
