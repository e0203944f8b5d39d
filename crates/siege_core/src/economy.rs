//! Prices, upgrades and purchases.
//!
//! The simulation's own spawn and upgrade operations trust the caller. This
//! module is the caller-side layer that checks the stronghold balance, spends
//! it and only then mutates the state. Prices are data so scenarios can
//! rebalance the shop without code changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidArgument, Result, SiegeError};
use crate::simulation::SimulationState;
use crate::side::Side;
use crate::unit::UnitId;

/// Speed added to a side's units by one speed upgrade.
pub const SPEED_UPGRADE_STEP: u32 = 5;

/// Damage added to a side's units by one damage upgrade.
pub const DAMAGE_UPGRADE_STEP: u32 = 2;

/// Purchasable upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeKind {
    /// Raise the stronghold level, multiplying income.
    Tower,
    /// Faster units, present and future.
    Speed,
    /// Harder-hitting units, present and future.
    Damage,
}

impl UpgradeKind {
    /// All upgrades in shop order.
    pub const ALL: [UpgradeKind; 3] = [UpgradeKind::Tower, UpgradeKind::Speed, UpgradeKind::Damage];

    /// Key accepted by [`SimulationState::apply_upgrade`].
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Tower => "tower",
            Self::Speed => "speed",
            Self::Damage => "damage",
        }
    }
}

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for UpgradeKind {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tower" => Ok(Self::Tower),
            "speed" => Ok(Self::Speed),
            "damage" => Ok(Self::Damage),
            _ => Err(InvalidArgument::UnknownUpgrade(s.to_string())),
        }
    }
}

/// One shop entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeOption {
    /// What the upgrade does.
    pub kind: UpgradeKind,
    /// Price in resources.
    pub cost: u32,
}

impl UpgradeOption {
    /// Create a shop entry.
    #[must_use]
    pub const fn new(kind: UpgradeKind, cost: u32) -> Self {
        Self { kind, cost }
    }
}

/// Shop prices for both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    /// Price of one unit.
    pub unit: u32,
    /// Upgrades on sale. Kinds missing from the list cannot be bought.
    pub upgrades: Vec<UpgradeOption>,
}

impl Default for PriceList {
    fn default() -> Self {
        Self {
            unit: 40,
            upgrades: vec![
                UpgradeOption::new(UpgradeKind::Tower, 100),
                UpgradeOption::new(UpgradeKind::Speed, 60),
                UpgradeOption::new(UpgradeKind::Damage, 50),
            ],
        }
    }
}

impl PriceList {
    /// Price of an upgrade, if it is on sale.
    #[must_use]
    pub fn upgrade_cost(&self, kind: UpgradeKind) -> Option<u32> {
        self.upgrades.iter().find(|o| o.kind == kind).map(|o| o.cost)
    }

    /// Price of any purchase, if it is on sale.
    #[must_use]
    pub fn cost_of(&self, item: Purchase) -> Option<u32> {
        match item {
            Purchase::Unit => Some(self.unit),
            Purchase::Upgrade(kind) => self.upgrade_cost(kind),
        }
    }

    /// Reject free items and duplicate shop entries.
    ///
    /// A free item would let a greedy controller buy forever in one tick.
    pub fn validate(&self) -> Result<()> {
        if self.unit == 0 {
            return Err(SiegeError::InvalidConfig(
                "unit price must be positive".to_string(),
            ));
        }
        for (i, option) in self.upgrades.iter().enumerate() {
            if option.cost == 0 {
                return Err(SiegeError::InvalidConfig(format!(
                    "{} upgrade price must be positive",
                    option.kind
                )));
            }
            if self.upgrades[..i].iter().any(|o| o.kind == option.kind) {
                return Err(SiegeError::InvalidConfig(format!(
                    "{} upgrade listed twice",
                    option.kind
                )));
            }
        }
        Ok(())
    }
}

/// Something a side can buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purchase {
    /// Spawn one unit from the side's template.
    Unit,
    /// Buy an upgrade.
    Upgrade(UpgradeKind),
}

impl fmt::Display for Purchase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("unit"),
            Self::Upgrade(kind) => write!(f, "{kind} upgrade"),
        }
    }
}

/// Result of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOutcome {
    /// A unit was bought and spawned.
    Spawned(UnitId),
    /// An upgrade was bought and applied.
    Upgraded(UpgradeKind),
    /// The balance did not cover the price; nothing changed.
    Unaffordable {
        /// Price of the item.
        cost: u32,
        /// Balance at the time of the attempt.
        available: u32,
    },
}

impl PurchaseOutcome {
    /// Whether anything was bought.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        !matches!(self, Self::Unaffordable { .. })
    }
}

/// Buy `item` for `side` if its stronghold can afford it.
///
/// # Errors
///
/// Returns [`InvalidArgument::UnknownUpgrade`] for an upgrade that is not on
/// sale. Being unable to afford an item is not an error.
pub fn purchase(
    state: &mut SimulationState,
    side: Side,
    item: Purchase,
    prices: &PriceList,
) -> Result<PurchaseOutcome> {
    let cost = match item {
        Purchase::Unit => prices.unit,
        Purchase::Upgrade(kind) => prices
            .upgrade_cost(kind)
            .ok_or_else(|| InvalidArgument::UnknownUpgrade(kind.key().to_string()))?,
    };

    let available = state.stronghold(side).available_resources();
    if !state.army_mut(side).stronghold_mut().spend(cost) {
        return Ok(PurchaseOutcome::Unaffordable { cost, available });
    }

    let outcome = match item {
        Purchase::Unit => PurchaseOutcome::Spawned(state.spawn_default_unit(side)?),
        Purchase::Upgrade(kind) => {
            state.apply_upgrade_kind(side, kind);
            PurchaseOutcome::Upgraded(kind)
        }
    };
    tracing::debug!(%side, %item, cost, balance = available - cost, "Purchase");
    Ok(outcome)
}

/// Everything `balance` can pay for, units first, then upgrades in shop
/// order.
#[must_use]
pub fn affordable_purchases(balance: u32, prices: &PriceList) -> Vec<Purchase> {
    let mut options = Vec::with_capacity(1 + prices.upgrades.len());
    if prices.unit <= balance {
        options.push(Purchase::Unit);
    }
    options.extend(
        prices
            .upgrades
            .iter()
            .filter(|o| o.cost <= balance)
            .map(|o| Purchase::Upgrade(o.kind)),
    );
    options
}
