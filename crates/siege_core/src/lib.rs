//! # Siege Core
//!
//! Deterministic battle simulation core for Castle Siege.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables headless batch runs, replays and determinism
//! testing from the same code that drives an interactive game.
//!
//! ## Crate Structure
//!
//! - [`unit`] - Mobile combatants
//! - [`stronghold`] - Castles and resource accrual
//! - [`simulation`] - Core simulation loop
//! - [`economy`] - Prices, upgrades and purchases
//! - [`snapshot`] - Read-only presentation view
//! - [`data`] - RON-loadable battle configuration
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod data;
pub mod economy;
pub mod error;
pub mod geometry;
pub mod health;
pub mod math;
pub mod side;
pub mod simulation;
pub mod snapshot;
pub mod stronghold;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::data::{BattleConfig, StrongholdConfig, UnitStats};
    pub use crate::economy::{
        affordable_purchases, purchase, PriceList, Purchase, PurchaseOutcome, UpgradeKind,
    };
    pub use crate::error::{InvalidArgument, Result, SiegeError};
    pub use crate::geometry::Bounds;
    pub use crate::health::Health;
    pub use crate::math::Fixed;
    pub use crate::side::{Facing, Side};
    pub use crate::simulation::{
        AttackEvent, DeathEvent, Outcome, Phase, SimulationState, Target, TickEvents, TickResult,
    };
    pub use crate::snapshot::SimulationSnapshot;
    pub use crate::stronghold::Stronghold;
    pub use crate::unit::{Unit, UnitId};
}
