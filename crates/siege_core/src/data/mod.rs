//! Data structures for battle configuration.
//!
//! This module contains pure data structures that define strongholds,
//! unit templates and whole battles. All structs are designed to be
//! deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `siege_headless`.

mod battle_data;
mod stronghold_data;
mod unit_data;

pub use battle_data::BattleConfig;
pub use stronghold_data::StrongholdConfig;
pub use unit_data::UnitStats;
