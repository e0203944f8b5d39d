//! Scripted controllers for headless matches.
//!
//! A [`Strategy`] describes how a side spends its food: an optional opening
//! bought in order, then a standing behavior. A [`SideController`] executes
//! one strategy for one side, tick by tick, through the affordability-checked
//! purchase layer.

use std::collections::VecDeque;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use siege_core::economy::{
    affordable_purchases, purchase, PriceList, Purchase, PurchaseOutcome, UpgradeKind,
};
use siege_core::error::Result as SiegeResult;
use siege_core::math::Fixed;
use siege_core::side::Side;
use siege_core::simulation::SimulationState;
use thiserror::Error;

/// Seconds between random-controller decisions after acting.
const DECISION_INTERVAL_SECS: i32 = 3;

/// Seconds before retrying when a decision bought nothing.
const RETRY_INTERVAL_SECS: i32 = 1;

/// Names accepted by [`Strategy::from_str`].
pub const PRESET_STRATEGIES: [&str; 4] = ["random", "rush", "economic", "passive"];

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// Not a preset name.
    #[error("Unknown strategy '{0}' (expected one of random, rush, economic, passive or a .ron file)")]
    Unknown(String),
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// What a controller does once its opening is bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    /// Every few seconds, while it can afford more than a unit, pick
    /// uniformly among saving, spawning and each affordable upgrade.
    Random,
    /// Spawn a unit whenever one is affordable.
    Rush,
    /// Buy tower upgrades until the stronghold reaches `tower_level`, then
    /// rush.
    Economic {
        /// Stronghold level to reach before spending on units.
        tower_level: u32,
    },
    /// Never spend.
    Passive,
}

/// A complete controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Purchases made in order, each as soon as it is affordable, before
    /// the behavior takes over.
    #[serde(default)]
    pub opening: Vec<Purchase>,
    /// Standing behavior.
    pub behavior: Behavior,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::random()
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// A preset name or a path to a `.ron` strategy file.
    pub fn resolve(name_or_path: &str) -> Result<Self, StrategyError> {
        if name_or_path.ends_with(".ron") {
            Self::load(name_or_path)
        } else {
            name_or_path.parse()
        }
    }

    /// The castle AI of the classic game.
    #[must_use]
    pub fn random() -> Self {
        Self {
            name: "Random".to_string(),
            description: "Coin-flip between saving, spawning and upgrading every 3 s".to_string(),
            opening: Vec::new(),
            behavior: Behavior::Random,
        }
    }

    /// Spend everything on units.
    #[must_use]
    pub fn rush() -> Self {
        Self {
            name: "Rush".to_string(),
            description: "A unit the moment one is affordable".to_string(),
            opening: Vec::new(),
            behavior: Behavior::Rush,
        }
    }

    /// Grow income first.
    #[must_use]
    pub fn economic() -> Self {
        Self {
            name: "Economic".to_string(),
            description: "Tower to level 3, then units".to_string(),
            opening: Vec::new(),
            behavior: Behavior::Economic { tower_level: 3 },
        }
    }

    /// Do nothing. Useful as a punching bag.
    #[must_use]
    pub fn passive() -> Self {
        Self {
            name: "Passive".to_string(),
            description: "Never spends".to_string(),
            opening: Vec::new(),
            behavior: Behavior::Passive,
        }
    }
}

impl FromStr for Strategy {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "classic" => Ok(Self::random()),
            "rush" => Ok(Self::rush()),
            "economic" | "eco" => Ok(Self::economic()),
            "passive" => Ok(Self::passive()),
            _ => Err(StrategyError::Unknown(s.to_string())),
        }
    }
}

/// Drives one side of a battle.
#[derive(Debug, Clone)]
pub struct SideController {
    side: Side,
    strategy: Strategy,
    opening: VecDeque<Purchase>,
    decision_timer: Fixed,
    rng: SimpleRng,
}

impl SideController {
    /// Create a controller. The seed only matters for random behavior.
    #[must_use]
    pub fn new(side: Side, strategy: Strategy, seed: u64) -> Self {
        let salt = match side {
            Side::Player => 0,
            Side::Enemy => 0x9E37_79B9_7F4A_7C15,
        };
        Self {
            side,
            opening: strategy.opening.iter().copied().collect(),
            strategy,
            decision_timer: Fixed::from_num(DECISION_INTERVAL_SECS),
            rng: SimpleRng::new(seed ^ salt),
        }
    }

    /// Controlled side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Strategy being executed.
    #[must_use]
    pub const fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Seconds until the next random decision.
    #[must_use]
    pub const fn decision_timer(&self) -> Fixed {
        self.decision_timer
    }

    /// Opening purchases not yet made.
    #[must_use]
    pub fn opening_remaining(&self) -> usize {
        self.opening.len()
    }

    /// Spend for this tick. Returns every successful purchase.
    ///
    /// # Errors
    ///
    /// Fails when the strategy names an upgrade the price list does not
    /// sell.
    pub fn act(
        &mut self,
        state: &mut SimulationState,
        prices: &PriceList,
        dt: Fixed,
    ) -> SiegeResult<Vec<PurchaseOutcome>> {
        let mut bought = Vec::new();
        if state.is_terminated() {
            return Ok(bought);
        }

        while let Some(&next) = self.opening.front() {
            let outcome = purchase(state, self.side, next, prices)?;
            if !outcome.succeeded() {
                return Ok(bought);
            }
            self.opening.pop_front();
            bought.push(outcome);
        }

        match self.strategy.behavior {
            Behavior::Passive => {}
            Behavior::Rush => self.rush(state, prices, &mut bought)?,
            Behavior::Economic { tower_level } => {
                if state.stronghold(self.side).level() < tower_level {
                    let tower = Purchase::Upgrade(UpgradeKind::Tower);
                    let outcome = purchase(state, self.side, tower, prices)?;
                    if outcome.succeeded() {
                        bought.push(outcome);
                    }
                } else {
                    self.rush(state, prices, &mut bought)?;
                }
            }
            Behavior::Random => self.decide_randomly(state, prices, dt, &mut bought)?,
        }
        Ok(bought)
    }

    fn rush(
        &mut self,
        state: &mut SimulationState,
        prices: &PriceList,
        bought: &mut Vec<PurchaseOutcome>,
    ) -> SiegeResult<()> {
        loop {
            let outcome = purchase(state, self.side, Purchase::Unit, prices)?;
            if !outcome.succeeded() {
                return Ok(());
            }
            bought.push(outcome);
        }
    }

    /// The classic castle AI. The timer only runs while the side can afford
    /// more than a unit; otherwise it is held at zero so the next windfall
    /// triggers a decision at once.
    fn decide_randomly(
        &mut self,
        state: &mut SimulationState,
        prices: &PriceList,
        dt: Fixed,
        bought: &mut Vec<PurchaseOutcome>,
    ) -> SiegeResult<()> {
        let balance = state.stronghold(self.side).available_resources();
        if balance <= prices.unit {
            self.decision_timer = Fixed::ZERO;
            return Ok(());
        }

        self.decision_timer -= dt;
        if self.decision_timer > Fixed::ZERO {
            return Ok(());
        }

        // Index 0 is "save"
        let options = affordable_purchases(balance, prices);
        let pick = self.rng.next_index(options.len() + 1);
        let acted = match pick.checked_sub(1).map(|i| options[i]) {
            None => {
                tracing::trace!(side = %self.side, "Controller saves");
                true
            }
            Some(item) => {
                let outcome = purchase(state, self.side, item, prices)?;
                let succeeded = outcome.succeeded();
                if succeeded {
                    bought.push(outcome);
                }
                succeeded
            }
        };

        let wait = if acted {
            DECISION_INTERVAL_SECS
        } else {
            RETRY_INTERVAL_SECS
        };
        self.decision_timer = Fixed::from_num(wait);
        Ok(())
    }
}

/// Simple deterministic RNG for controller decisions.
#[derive(Debug, Clone)]
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        // xorshift never leaves an all-zero state
        let state = match seed.wrapping_add(1) {
            0 => 0x9E37_79B9_7F4A_7C15,
            state => state,
        };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform-enough index into a non-empty range.
    fn next_index(&mut self, len: usize) -> usize {
        (self.next_u64() % len.max(1) as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario;

    fn rich_state() -> SimulationState {
        SimulationState::new(&scenario::rich_start()).unwrap()
    }

    #[test]
    fn test_presets_parse() {
        for name in PRESET_STRATEGIES {
            let strategy: Strategy = name.parse().unwrap();
            assert_eq!(strategy.name.to_lowercase(), name);
        }
        assert_eq!("ECO".parse::<Strategy>().unwrap(), Strategy::economic());
        assert!(matches!(
            "turtle".parse::<Strategy>(),
            Err(StrategyError::Unknown(_))
        ));
    }

    #[test]
    fn test_resolve_ron_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opener.ron");
        std::fs::write(
            &path,
            r#"Strategy(
                name: "Opener",
                opening: [Upgrade(damage), Unit],
                behavior: Passive,
            )"#,
        )
        .unwrap();

        let strategy = Strategy::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(
            strategy.opening,
            vec![Purchase::Upgrade(UpgradeKind::Damage), Purchase::Unit]
        );
        assert_eq!(strategy.behavior, Behavior::Passive);

        assert!(matches!(
            Strategy::resolve("missing.ron"),
            Err(StrategyError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_shipped_strategy_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets/strategies/damage_opener.ron");
        let strategy = Strategy::load(path).unwrap();
        assert_eq!(strategy.behavior, Behavior::Random);
        assert_eq!(strategy.opening.len(), 3);
    }

    #[test]
    fn test_passive_never_spends() {
        let mut state = rich_state();
        let mut controller = SideController::new(Side::Player, Strategy::passive(), 1);
        let bought = controller
            .act(&mut state, &PriceList::default(), Fixed::from_num(10))
            .unwrap();
        assert!(bought.is_empty());
        assert_eq!(state.stronghold(Side::Player).available_resources(), 200);
    }

    #[test]
    fn test_rush_spends_everything_on_units() {
        let mut state = rich_state();
        let mut controller = SideController::new(Side::Enemy, Strategy::rush(), 1);
        let bought = controller
            .act(&mut state, &PriceList::default(), Fixed::ONE)
            .unwrap();
        assert_eq!(bought.len(), 5);
        assert_eq!(state.units(Side::Enemy).len(), 5);
        assert_eq!(state.stronghold(Side::Enemy).available_resources(), 0);
    }

    #[test]
    fn test_economic_builds_tower_first() {
        let mut state = rich_state();
        let strategy = Strategy {
            behavior: Behavior::Economic { tower_level: 2 },
            ..Strategy::economic()
        };
        let mut controller = SideController::new(Side::Player, strategy, 1);
        let prices = PriceList::default();

        let first = controller.act(&mut state, &prices, Fixed::ONE).unwrap();
        assert_eq!(first, vec![PurchaseOutcome::Upgraded(UpgradeKind::Tower)]);
        assert_eq!(state.stronghold(Side::Player).level(), 2);

        let second = controller.act(&mut state, &prices, Fixed::ONE).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(state.stronghold(Side::Player).available_resources(), 20);
    }

    #[test]
    fn test_opening_waits_until_affordable() {
        let mut state = SimulationState::new(&siege_core::data::BattleConfig::default()).unwrap();
        let strategy = Strategy {
            opening: vec![Purchase::Upgrade(UpgradeKind::Speed)],
            ..Strategy::rush()
        };
        let mut controller = SideController::new(Side::Player, strategy, 1);
        let prices = PriceList::default();

        assert!(controller.act(&mut state, &prices, Fixed::ONE).unwrap().is_empty());
        assert_eq!(controller.opening_remaining(), 1);

        // 6 seconds of income buys the speed upgrade, nothing left for units
        state.step(Fixed::from_num(6)).unwrap();
        let bought = controller.act(&mut state, &prices, Fixed::ONE).unwrap();
        assert_eq!(bought, vec![PurchaseOutcome::Upgraded(UpgradeKind::Speed)]);
        assert_eq!(controller.opening_remaining(), 0);
    }

    #[test]
    fn test_random_timer_held_at_zero_when_poor() {
        let mut state = SimulationState::new(&siege_core::data::BattleConfig::default()).unwrap();
        let mut controller = SideController::new(Side::Enemy, Strategy::random(), 7);
        assert_eq!(controller.decision_timer(), Fixed::from_num(3));

        controller
            .act(&mut state, &PriceList::default(), Fixed::ONE)
            .unwrap();
        assert_eq!(controller.decision_timer(), Fixed::ZERO);
    }

    #[test]
    fn test_random_decides_every_three_seconds() {
        let mut state = rich_state();
        let mut controller = SideController::new(Side::Enemy, Strategy::random(), 7);
        let prices = PriceList::default();

        assert!(controller.act(&mut state, &prices, Fixed::ONE).unwrap().is_empty());
        assert!(controller.act(&mut state, &prices, Fixed::ONE).unwrap().is_empty());
        assert_eq!(controller.decision_timer(), Fixed::ONE);

        let bought = controller.act(&mut state, &prices, Fixed::ONE).unwrap();
        assert!(bought.len() <= 1);
        assert_eq!(controller.decision_timer(), Fixed::from_num(3));
    }

    #[test]
    fn test_random_is_seed_deterministic() {
        let run = |seed: u64| {
            let mut state = rich_state();
            let mut controller = SideController::new(Side::Enemy, Strategy::random(), seed);
            let prices = PriceList::default();
            let dt = state.tick_duration();
            for _ in 0..3600 {
                controller.act(&mut state, &prices, dt).unwrap();
                state.step(dt).unwrap();
            }
            state.state_hash()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_rng_sequence() {
        let mut a = SimpleRng::new(5);
        let mut b = SimpleRng::new(5);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        assert!((0..1000).all(|_| a.next_index(4) < 4));
    }

    #[test]
    fn test_rng_max_seed_still_varies() {
        let mut rng = SimpleRng::new(u64::MAX);
        let draws: Vec<u64> = (0..100).map(|_| rng.next_u64()).collect();
        assert!(draws.iter().all(|&v| v != 0));

        let indices: std::collections::HashSet<usize> =
            (0..100).map(|_| rng.next_index(4)).collect();
        assert!(indices.len() > 1);
    }
}
