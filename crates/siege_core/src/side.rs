//! The two sides of a siege.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidArgument;
use crate::math::Fixed;

/// One of the two opposing sides.
///
/// The player holds the left stronghold and marches right; the enemy holds
/// the right stronghold and marches left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Left side, usually human-controlled.
    Player,
    /// Right side, usually AI-controlled.
    Enemy,
}

impl Side {
    /// Both sides in iteration order.
    pub const ALL: [Side; 2] = [Side::Player, Side::Enemy];

    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// Direction this side's units march in.
    #[must_use]
    pub const fn facing(self) -> Facing {
        match self {
            Self::Player => Facing::Right,
            Self::Enemy => Facing::Left,
        }
    }

    /// Lowercase identifier used in configs, CLIs and metrics.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Enemy => "enemy",
        }
    }

    /// Which stronghold this side owns, as seen on screen.
    #[must_use]
    pub const fn flank(self) -> &'static str {
        match self {
            Self::Player => "left",
            Self::Enemy => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Side {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" | "left" => Ok(Self::Player),
            "enemy" | "right" => Ok(Self::Enemy),
            _ => Err(InvalidArgument::UnknownSide(s.to_string())),
        }
    }
}

/// Horizontal marching direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Towards increasing x.
    Right,
    /// Towards decreasing x.
    Left,
}

impl Facing {
    /// +1 or -1.
    #[must_use]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Right => 1,
            Self::Left => -1,
        }
    }

    /// The sign as a fixed-point multiplier.
    #[must_use]
    pub fn multiplier(self) -> Fixed {
        match self {
            Self::Right => Fixed::ONE,
            Self::Left => -Fixed::ONE,
        }
    }
}
