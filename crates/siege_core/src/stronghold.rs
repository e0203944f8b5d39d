//! Stationary, destructible strongholds.
//!
//! A stronghold banks resources on a fixed cycle. Accrual counts whole
//! cycles on the raw fixed-point bits and keeps the exact remainder, so a
//! second of game time yields the same income whether it arrives as one
//! tick or sixty.

use serde::{Deserialize, Serialize};

use crate::data::StrongholdConfig;
use crate::error::{InvalidArgument, Result};
use crate::geometry::Bounds;
use crate::health::Health;
use crate::math::{fixed_serde, Fixed};
use crate::side::Side;

/// A castle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stronghold {
    side: Side,
    name: String,
    bounds: Bounds,
    health: Health,
    level: u32,
    base_gain: u32,
    gain_rate: u32,
    #[serde(with = "fixed_serde")]
    gain_interval: Fixed,
    #[serde(with = "fixed_serde")]
    resource_timer: Fixed,
    resource_total: u32,
    resources_spent: u32,
}

impl Stronghold {
    /// Build a stronghold from its definition.
    #[must_use]
    pub fn new(side: Side, config: &StrongholdConfig) -> Self {
        let level = config.level.max(1);
        Self {
            side,
            name: config.name.clone(),
            bounds: config.bounds(),
            health: Health::new(config.max_health),
            level,
            base_gain: config.base_gain,
            gain_rate: config.base_gain.saturating_mul(level),
            gain_interval: config.gain_interval,
            resource_timer: Fixed::ZERO,
            resource_total: config.starting_resources,
            resources_spent: 0,
        }
    }

    /// Owning side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Footprint.
    #[must_use]
    pub const fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Hit points.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Resources per completed cycle at the current level.
    #[must_use]
    pub const fn resource_gain_rate(&self) -> u32 {
        self.gain_rate
    }

    /// Seconds per cycle.
    #[must_use]
    pub const fn resource_gain_interval(&self) -> Fixed {
        self.gain_interval
    }

    /// Time banked toward the next cycle.
    #[must_use]
    pub const fn resource_timer(&self) -> Fixed {
        self.resource_timer
    }

    /// Everything ever accrued, including the starting bank.
    #[must_use]
    pub const fn resource_total(&self) -> u32 {
        self.resource_total
    }

    /// Everything ever spent.
    #[must_use]
    pub const fn resources_spent(&self) -> u32 {
        self.resources_spent
    }

    /// Spendable balance.
    #[must_use]
    pub const fn available_resources(&self) -> u32 {
        self.resource_total.saturating_sub(self.resources_spent)
    }

    /// Bank `dt` seconds of income.
    ///
    /// Every whole `resource_gain_interval` contained in the banked time
    /// pays out `resource_gain_rate`; the remainder carries to the next
    /// call. Returns the resources gained.
    ///
    /// # Errors
    ///
    /// Rejects a negative `dt`.
    pub fn accumulate_resources(&mut self, dt: Fixed) -> Result<u32> {
        if dt < Fixed::ZERO {
            return Err(InvalidArgument::NegativeDelta(dt).into());
        }

        self.resource_timer = self.resource_timer.saturating_add(dt);

        let interval_bits = self.gain_interval.to_bits();
        if interval_bits <= 0 {
            return Ok(0);
        }

        let timer_bits = self.resource_timer.to_bits();
        let cycles = timer_bits / interval_bits;
        if cycles == 0 {
            return Ok(0);
        }
        self.resource_timer = Fixed::from_bits(timer_bits % interval_bits);

        let cycles = u32::try_from(cycles).unwrap_or(u32::MAX);
        let gained = cycles.saturating_mul(self.gain_rate);
        self.resource_total = self.resource_total.saturating_add(gained);

        tracing::trace!(
            stronghold = %self.name,
            cycles,
            gained,
            total = self.resource_total,
            "Resources accrued"
        );
        Ok(gained)
    }

    /// Raise the level by one and recompute income from the base rate.
    pub fn upgrade(&mut self) {
        self.level = self.level.saturating_add(1);
        self.gain_rate = self.base_gain.saturating_mul(self.level);
        tracing::debug!(
            stronghold = %self.name,
            level = self.level,
            gain_rate = self.gain_rate,
            "Stronghold upgraded"
        );
    }

    /// Lose health, never below zero. Returns the damage actually taken.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.health.apply_damage(amount)
    }

    /// Whether the stronghold has fallen.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.health.is_dead()
    }

    /// Spend from the balance. Refuses, leaving the balance untouched, when
    /// there is not enough.
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.available_resources() < amount {
            return false;
        }
        self.resources_spent += amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn castle() -> Stronghold {
        Stronghold::new(Side::Player, &StrongholdConfig::castle("LeftCastle", 50))
    }

    #[test]
    fn test_two_cycles_in_one_large_tick() {
        let mut keep = castle();
        let dt = Fixed::from_num(1.2);
        let gained = keep.accumulate_resources(dt).unwrap();

        assert_eq!(gained, 10);
        assert_eq!(keep.resource_total(), 10);
        assert_eq!(keep.resource_timer(), dt - Fixed::from_num(1));

        let epsilon = Fixed::from_num(1) / Fixed::from_num(1_000_000);
        assert!((keep.resource_timer() - Fixed::from_num(0.2)).abs() < epsilon);
    }

    #[test]
    fn test_below_interval_banks_time() {
        let mut keep = castle();
        assert_eq!(keep.accumulate_resources(Fixed::from_num(0.25)).unwrap(), 0);
        assert_eq!(keep.resource_timer(), Fixed::from_num(0.25));
        assert_eq!(keep.accumulate_resources(Fixed::from_num(0.25)).unwrap(), 5);
        assert_eq!(keep.resource_timer(), Fixed::ZERO);
    }

    #[test]
    fn test_negative_dt_rejected() {
        let mut keep = castle();
        let err = keep.accumulate_resources(Fixed::from_num(-0.1)).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(keep.resource_timer(), Fixed::ZERO);
    }

    #[test]
    fn test_upgrade_replaces_rate() {
        let mut keep = castle();
        keep.upgrade();
        assert_eq!(keep.level(), 2);
        assert_eq!(keep.resource_gain_rate(), 10);
        keep.upgrade();
        keep.upgrade();
        assert_eq!(keep.level(), 4);
        assert_eq!(keep.resource_gain_rate(), 20);
    }

    #[test]
    fn test_upgrade_applies_to_following_cycles() {
        let mut keep = castle();
        keep.upgrade();
        assert_eq!(keep.accumulate_resources(Fixed::from_num(1)).unwrap(), 20);
    }

    #[test]
    fn test_damage_and_destruction() {
        let mut keep = castle();
        assert_eq!(keep.take_damage(120), 120);
        assert_eq!(keep.health().current, 380);
        assert!(!keep.is_destroyed());
        keep.take_damage(10_000);
        assert_eq!(keep.health().current, 0);
        assert!(keep.is_destroyed());
    }

    #[test]
    fn test_spend_respects_balance() {
        let mut keep = castle();
        keep.accumulate_resources(Fixed::from_num(4)).unwrap();
        assert_eq!(keep.available_resources(), 40);

        assert!(!keep.spend(41));
        assert!(keep.spend(40));
        assert_eq!(keep.available_resources(), 0);
        assert_eq!(keep.resource_total(), 40);
        assert_eq!(keep.resources_spent(), 40);
    }
}
