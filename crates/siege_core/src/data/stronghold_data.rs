//! Stronghold definitions.

use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;
use crate::math::{decimal_serde, Fixed};

/// Default starting level.
const fn default_level() -> u32 {
    1
}

/// Data-driven stronghold definition.
///
/// # Example RON
///
/// ```ron
/// StrongholdConfig(
///     name: "LeftCastle",
///     x: 50.0,
///     y: 50.0,
///     width: 200.0,
///     height: 300.0,
///     max_health: 500,
///     starting_resources: 0,
///     base_gain: 5,
///     gain_interval: 0.5,
///     level: 1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongholdConfig {
    /// Display name.
    pub name: String,

    /// Left edge.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,

    /// Top edge.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,

    /// Footprint width.
    #[serde(with = "decimal_serde")]
    pub width: Fixed,

    /// Footprint height. Units stand on the bottom edge.
    #[serde(with = "decimal_serde")]
    pub height: Fixed,

    /// Hit points.
    pub max_health: u32,

    /// Resources banked at the start of the battle.
    #[serde(default)]
    pub starting_resources: u32,

    /// Resources per cycle at level 1.
    pub base_gain: u32,

    /// Seconds per resource cycle.
    #[serde(with = "decimal_serde")]
    pub gain_interval: Fixed,

    /// Starting level.
    #[serde(default = "default_level")]
    pub level: u32,
}

impl StrongholdConfig {
    /// The classic 200x300 castle at the given left edge.
    #[must_use]
    pub fn castle(name: &str, x: i32) -> Self {
        Self {
            name: name.to_string(),
            x: Fixed::from_num(x),
            y: Fixed::from_num(50),
            width: Fixed::from_num(200),
            height: Fixed::from_num(300),
            max_health: 500,
            starting_resources: 0,
            base_gain: 5,
            gain_interval: Fixed::from_num(0.5),
            level: 1,
        }
    }

    /// Footprint as a bounding box.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    /// Describe the first problem with this definition, if any.
    pub fn problem(&self) -> Option<String> {
        if self.max_health == 0 {
            return Some(format!("{}: max_health must be positive", self.name));
        }
        if self.gain_interval <= Fixed::ZERO {
            return Some(format!(
                "{}: gain_interval must be positive, got {}",
                self.name, self.gain_interval
            ));
        }
        if self.level == 0 {
            return Some(format!("{}: level starts at 1", self.name));
        }
        if self.width <= Fixed::ZERO || self.height <= Fixed::ZERO {
            return Some(format!("{}: footprint must be positive", self.name));
        }
        None
    }
}
