//! Scenario loading and configuration.
//!
//! A scenario is a [`BattleConfig`] stored as RON. Built-in presets cover
//! the classic game and a couple of variants useful for quick testing;
//! anything else is read from disk.

use std::path::Path;

use siege_core::data::BattleConfig;
use siege_core::error::SiegeError;
use siege_core::math::Fixed;
use thiserror::Error;

/// Scenario shipped with the repository.
pub const DEFAULT_SCENARIO_PATH: &str = "assets/scenarios/classic.ron";

/// Names accepted by [`builtin`].
pub const BUILTIN_SCENARIOS: [&str; 3] = ["classic", "short_lane", "rich_start"];

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed, but the battle does not validate.
    #[error("Scenario rejected: {0}")]
    Invalid(#[from] SiegeError),
}

/// Load and validate a scenario from a RON file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<BattleConfig, ScenarioError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let config = from_ron_str(&contents)?;
    tracing::debug!(path = %path.display(), name = %config.name, "Scenario loaded");
    Ok(config)
}

/// Parse and validate a scenario from RON text.
pub fn from_ron_str(ron: &str) -> Result<BattleConfig, ScenarioError> {
    let config: BattleConfig = ron::from_str(ron)?;
    config.validate()?;
    Ok(config)
}

/// A built-in scenario by name.
#[must_use]
pub fn builtin(name: &str) -> Option<BattleConfig> {
    match name {
        "classic" => Some(BattleConfig::default()),
        "short_lane" => Some(short_lane()),
        "rich_start" => Some(rich_start()),
        _ => None,
    }
}

/// Resolve a scenario argument: a built-in name, a RON path, or `None` for
/// the classic battle.
pub fn resolve(name_or_path: Option<&str>) -> Result<BattleConfig, ScenarioError> {
    match name_or_path {
        None => Ok(BattleConfig::default()),
        Some(arg) => match builtin(arg) {
            Some(config) => Ok(config),
            None => load(arg),
        },
    }
}

/// A narrow lane with weaker castles, for fast-finishing matches.
#[must_use]
pub fn short_lane() -> BattleConfig {
    let mut config = BattleConfig {
        name: "Short Lane".to_string(),
        description: "Castles 400 apart with 200 hp".to_string(),
        arena_width: Fixed::from_num(900),
        ..BattleConfig::default()
    };
    config.player_stronghold.max_health = 200;
    config.enemy_stronghold.x = Fixed::from_num(650);
    config.enemy_stronghold.max_health = 200;
    config
}

/// The classic battle with a banked opening purse on both sides.
#[must_use]
pub fn rich_start() -> BattleConfig {
    let mut config = BattleConfig {
        name: "Rich Start".to_string(),
        description: "Classic lane, both sides open with 200 food".to_string(),
        ..BattleConfig::default()
    };
    config.player_stronghold.starting_resources = 200;
    config.enemy_stronghold.starting_resources = 200;
    config
}
