//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, batch statistics and save files all rely on a battle being a
//! pure function of its configuration and inputs. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`siege_core::math::Fixed`] throughout.
//!
//! - **Iteration order**: units are kept in spawn order in plain vectors;
//!   nothing iterates a hash map.
//!
//! - **System randomness**: controllers draw from seeded PRNGs only.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual operations (accrual, cooldowns, movement)
//! 2. **Property tests**: random inputs must still produce deterministic outputs
//! 3. **Integration tests**: full battles are reproducible
//! 4. **Parallel tests**: running N battles on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use siege_core::simulation::SimulationState;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use siege_test_utils::determinism::verify_determinism;
/// use siege_test_utils::fixtures::crowded_battle;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     600, // 600 ticks each
///     || crowded_battle(4),
///     |state| { state.step_tick().unwrap(); },
///     |state| state.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Advance one fixed tick, ignoring the terminal state.
///
/// # Panics
///
/// Panics if the step is rejected, which a fixed positive tick never is.
pub fn fixed_tick(state: &mut SimulationState) {
    state.step_tick().expect("fixed tick step must succeed");
}

/// Run a battle twice from the same setup and compare final hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> SimulationState,
{
    verify_determinism(2, num_ticks, &setup_fn, fixed_tick, SimulationState::state_hash)
        .is_deterministic
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of ticks each battle ran.
    pub ticks: u64,
    /// Number of battles run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N battles on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_battles<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    F: Fn() -> SimulationState + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut state = setup_fn();
                    for _ in 0..num_ticks {
                        fixed_tick(&mut state);
                    }
                    state.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two battle runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs agree, `Some(tick)` for the first tick they differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> SimulationState,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        fixed_tick(&mut first);
        fixed_tick(&mut second);

        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a serialization round trip preserves the state exactly and
/// that the restored battle keeps pace with the original.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> SimulationState,
{
    let mut original = setup_fn();
    for _ in 0..num_ticks {
        fixed_tick(&mut original);
    }

    let Ok(bytes) = original.serialize() else {
        return false;
    };
    let Ok(mut restored) = SimulationState::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != original.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        fixed_tick(&mut original);
        fixed_tick(&mut restored);
    }
    restored.state_hash() == original.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the battle simulation.
pub mod strategies {
    use proptest::prelude::*;
    use siege_core::data::UnitStats;
    use siege_core::economy::UpgradeKind;
    use siege_core::math::Fixed;
    use siege_core::side::Side;

    /// A non-negative time step up to a quarter second, in 1/1024 s steps.
    pub fn arb_dt() -> impl Strategy<Value = Fixed> {
        (0i64..=256).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(1024))
    }

    /// A sequence of time steps.
    pub fn arb_dt_sequence(max_len: usize) -> impl Strategy<Value = Vec<Fixed>> {
        prop::collection::vec(arb_dt(), 1..max_len)
    }

    /// Either side.
    pub fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Player), Just(Side::Enemy)]
    }

    /// Any upgrade.
    pub fn arb_upgrade() -> impl Strategy<Value = UpgradeKind> {
        prop_oneof![
            Just(UpgradeKind::Tower),
            Just(UpgradeKind::Speed),
            Just(UpgradeKind::Damage),
        ]
    }

    /// Valid unit stats around the classic values.
    pub fn arb_unit_stats() -> impl Strategy<Value = UnitStats> {
        (40i32..=240, 1u32..=200, 0u32..=60, 0i32..=20).prop_map(
            |(speed, max_health, damage, cooldown_tenths)| {
                UnitStats::default()
                    .with_speed(Fixed::from_num(speed))
                    .with_health(max_health)
                    .with_damage(damage)
                    .with_cooldown(Fixed::from_num(cooldown_tenths) / Fixed::from_num(10))
            },
        )
    }

    /// A horizontal position on the classic lane between the strongholds.
    pub fn arb_lane_x() -> impl Strategy<Value = i32> {
        250i32..1286
    }

    /// A list of damage amounts.
    pub fn arb_damage_sequence(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(0u32..200, 0..max_len)
    }
}
