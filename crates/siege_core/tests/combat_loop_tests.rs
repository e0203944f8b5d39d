//! Integration tests for the combat loop.
//!
//! Scenario tests pin exact outcomes of small hand-built battles; the
//! property tests at the bottom check the invariants over random input.

use proptest::prelude::*;
use siege_core::prelude::*;
use siege_test_utils::determinism::strategies::{
    arb_damage_sequence, arb_dt, arb_dt_sequence, arb_lane_x, arb_side, arb_unit_stats,
    arb_upgrade,
};
use siege_test_utils::fixtures::{
    battle_with, brawler, classic_battle, fixed, fixed_f, fragile_strongholds, place_unit,
    run_ticks,
};

// ============================================================================
// Unit combat
// ============================================================================

#[test]
fn lopsided_exchange_resolves_simultaneously() {
    let mut state = classic_battle();
    let a = place_unit(&mut state, Side::Player, 700, &brawler(60, 12));
    let b = place_unit(&mut state, Side::Enemy, 720, &brawler(60, 100));

    let result = state.step(fixed_f(0.1)).unwrap();

    // A is gone, B survived A's blow
    assert!(state.unit(a).is_none());
    assert_eq!(result.events.deaths, vec![DeathEvent { unit: a, side: Side::Player }]);
    let b_unit = state.unit(b).unwrap();
    assert_eq!(b_unit.health().current, 48);
    assert!(b_unit.is_engaged());
    assert_eq!(b_unit.attack_timer(), fixed_f(0.8));
    assert_eq!(b_unit.position(), fixed(720));

    // Both attacked in the same tick
    assert!(result.events.attacks.contains(&AttackEvent {
        attacker: a,
        side: Side::Player,
        target: Target::Unit(b),
        damage: 12,
    }));
    assert!(result.events.attacks.contains(&AttackEvent {
        attacker: b,
        side: Side::Enemy,
        target: Target::Unit(a),
        damage: 60,
    }));
    assert_eq!(result.player_units_alive, 0);
    assert_eq!(result.enemy_units_alive, 1);
}

#[test]
fn mutual_lethal_blows_kill_both() {
    let mut state = classic_battle();
    place_unit(&mut state, Side::Player, 700, &brawler(12, 12));
    place_unit(&mut state, Side::Enemy, 740, &brawler(12, 12));

    let result = state.step(fixed_f(0.1)).unwrap();

    assert_eq!(result.events.deaths.len(), 2);
    assert_eq!(result.events.losses(Side::Player), 1);
    assert_eq!(result.events.losses(Side::Enemy), 1);
    assert!(state.units(Side::Player).is_empty());
    assert!(state.units(Side::Enemy).is_empty());
}

#[test]
fn engaged_units_hold_position_while_cooling_down() {
    let mut state = classic_battle();
    let a = place_unit(&mut state, Side::Player, 700, &brawler(500, 1));
    let b = place_unit(&mut state, Side::Enemy, 720, &brawler(500, 1));

    let first = state.step(fixed_f(0.1)).unwrap();
    assert_eq!(first.events.attacks.len(), 2);

    // Still overlapping, cooling down: engaged but no attacks
    let second = state.step(fixed_f(0.1)).unwrap();
    assert!(second.events.attacks.is_empty());
    assert_eq!(state.unit(a).unwrap().position(), fixed(700));
    assert_eq!(state.unit(b).unwrap().position(), fixed(720));
    assert!(state.unit(a).unwrap().is_engaged());

    // Cooldown elapses after 0.8 s in total
    for _ in 0..6 {
        assert!(state.step(fixed_f(0.1)).unwrap().events.attacks.is_empty());
    }
    let ready = state.step(fixed_f(0.1)).unwrap();
    assert_eq!(ready.events.attacks.len(), 2);
    assert_eq!(state.unit(a).unwrap().health().current, 498);
}

#[test]
fn ready_unit_strikes_first_overlapping_opponent_only() {
    let mut state = classic_battle();
    let a = place_unit(&mut state, Side::Player, 700, &brawler(500, 10));
    let first = place_unit(&mut state, Side::Enemy, 730, &brawler(100, 0));
    let second = place_unit(&mut state, Side::Enemy, 710, &brawler(100, 0));

    let result = state.step(fixed_f(0.1)).unwrap();

    let from_a: Vec<_> = result
        .events
        .attacks
        .iter()
        .filter(|e| e.attacker == a)
        .collect();
    assert_eq!(from_a.len(), 1);
    assert_eq!(from_a[0].target, Target::Unit(first));
    assert_eq!(state.unit(first).unwrap().health().current, 90);
    assert_eq!(state.unit(second).unwrap().health().current, 100);

    // Both enemies engaged, neither moved
    assert_eq!(state.unit(first).unwrap().position(), fixed(730));
    assert_eq!(state.unit(second).unwrap().position(), fixed(710));
}

#[test]
fn touching_edges_do_not_engage() {
    let mut state = classic_battle();
    let a = place_unit(&mut state, Side::Player, 700, &UnitStats::default());
    let b = place_unit(&mut state, Side::Enemy, 764, &UnitStats::default());

    let result = state.step(fixed_f(0.5)).unwrap();

    assert!(result.events.attacks.is_empty());
    assert_eq!(state.unit(a).unwrap().position(), fixed(770));
    assert_eq!(state.unit(b).unwrap().position(), fixed(694));
}

#[test]
fn free_unit_advances_full_step() {
    let mut state = classic_battle();
    let a = place_unit(&mut state, Side::Player, 400, &UnitStats::default());

    state.step(fixed_f(0.5)).unwrap();

    let unit = state.unit(a).unwrap();
    assert_eq!(unit.position(), fixed(470));
    assert!(!unit.is_engaged());
}

#[test]
fn enemy_units_march_left() {
    let mut state = classic_battle();
    let id = state.spawn_default_unit(Side::Enemy).unwrap();
    state.step(fixed_f(0.5)).unwrap();
    assert_eq!(state.unit(id).unwrap().position(), fixed(1216));
}

#[test]
fn speed_upgrade_reaches_units_in_the_field() {
    let mut state = classic_battle();
    let a = place_unit(&mut state, Side::Player, 400, &UnitStats::default());
    state.apply_upgrade(Side::Player, "speed").unwrap();

    state.step(fixed(1)).unwrap();

    assert_eq!(state.unit(a).unwrap().position(), fixed(545));
}

// ============================================================================
// Strongholds
// ============================================================================

#[test]
fn unit_at_enemy_gate_batters_stronghold() {
    let mut state = classic_battle();
    let a = place_unit(&mut state, Side::Player, 1300, &UnitStats::default());

    let result = state.step(fixed_f(0.1)).unwrap();

    assert_eq!(state.stronghold(Side::Enemy).health().current, 488);
    assert_eq!(result.events.stronghold_damage_by(Side::Player), 12);
    assert_eq!(
        result.events.attacks,
        vec![AttackEvent {
            attacker: a,
            side: Side::Player,
            target: Target::Stronghold(Side::Enemy),
            damage: 12,
        }]
    );
    let unit = state.unit(a).unwrap();
    assert!(unit.is_engaged());
    assert_eq!(unit.position(), fixed(1300));
}

#[test]
fn spawned_unit_walks_away_from_own_gate() {
    let mut state = classic_battle();
    let id = state.spawn_default_unit(Side::Player).unwrap();
    let result = state.step(fixed_f(0.5)).unwrap();
    assert!(result.events.attacks.is_empty());
    assert_eq!(state.unit(id).unwrap().position(), fixed(320));
}

#[test]
fn unit_that_dies_in_melee_does_not_assault() {
    let mut state = battle_with(&fragile_strongholds(100));
    // Player unit overlaps both an enemy and the enemy stronghold
    let a = place_unit(&mut state, Side::Player, 1300, &brawler(10, 50));
    place_unit(&mut state, Side::Enemy, 1310, &brawler(100, 50));

    let result = state.step(fixed_f(0.1)).unwrap();

    assert!(state.unit(a).is_none());
    assert_eq!(result.events.stronghold_damage_by(Side::Player), 0);
    assert_eq!(state.stronghold(Side::Enemy).health().current, 100);
}

#[test]
fn stronghold_income_from_large_tick() {
    let mut state = classic_battle();
    let dt = fixed_f(1.2);

    let result = state.step(dt).unwrap();

    assert_eq!(result.events.player_resources_gained, 10);
    assert_eq!(result.events.enemy_resources_gained, 10);
    let keep = state.stronghold(Side::Player);
    assert_eq!(keep.resource_total(), 10);
    assert_eq!(keep.resource_timer(), dt - fixed(1));
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn both_strongholds_falling_together_is_a_draw() {
    let mut state = battle_with(&fragile_strongholds(10));
    place_unit(&mut state, Side::Player, 1300, &UnitStats::default());
    place_unit(&mut state, Side::Enemy, 200, &UnitStats::default());

    let result = state.step(fixed_f(0.1)).unwrap();

    assert!(result.left_destroyed);
    assert!(result.right_destroyed);
    assert_eq!(result.outcome, Some(Outcome::Draw));
    assert_eq!(state.phase(), Phase::Terminated(Outcome::Draw));
}

#[test]
fn surviving_stronghold_wins() {
    let mut state = battle_with(&fragile_strongholds(24));
    place_unit(&mut state, Side::Enemy, 200, &UnitStats::default());

    let first = state.step(fixed_f(0.1)).unwrap();
    assert!(first.outcome.is_none());
    assert_eq!(state.stronghold(Side::Player).health().current, 12);

    let ticks = run_ticks(&mut state, 60);
    assert!(ticks > 0);
    assert_eq!(state.outcome(), Some(Outcome::Victory(Side::Enemy)));
    assert_eq!(state.outcome().and_then(Outcome::winner), Some(Side::Enemy));
}

#[test]
fn terminated_battle_is_frozen() {
    let mut state = battle_with(&fragile_strongholds(10));
    place_unit(&mut state, Side::Player, 1300, &UnitStats::default());
    place_unit(&mut state, Side::Player, 600, &UnitStats::default());
    state.step(fixed_f(0.1)).unwrap();
    assert!(state.is_terminated());

    let frozen = state.clone();
    let result = state.step(fixed(5)).unwrap();

    assert_eq!(state, frozen);
    assert_eq!(result.tick, 1);
    assert_eq!(result.outcome, Some(Outcome::Victory(Side::Player)));
    assert_eq!(result.events, TickEvents::default());
}

#[test]
fn negative_dt_is_rejected() {
    let mut state = classic_battle();
    let err = step_with(&mut state, fixed_f(-0.016)).unwrap_err();
    assert_eq!(
        err,
        SiegeError::InvalidArgument(InvalidArgument::NegativeDelta(fixed_f(-0.016)))
    );
    assert_eq!(state.tick(), 0);
}

#[test]
fn huge_dt_pins_marchers_at_range_edge() {
    let mut state = classic_battle();
    let p = place_unit(&mut state, Side::Player, 300, &UnitStats::default());
    let e = place_unit(&mut state, Side::Enemy, 1200, &UnitStats::default());

    state.step(Fixed::MAX).unwrap();
    assert_eq!(state.unit(p).unwrap().position(), Fixed::MAX);
    assert!(state.unit(e).unwrap().position() < fixed(0));

    // Already past the lane: a second step must still not wrap
    state.step(Fixed::MAX).unwrap();
    assert_eq!(state.unit(p).unwrap().position(), Fixed::MAX);
    assert_eq!(state.unit(e).unwrap().position(), Fixed::MIN);
    assert_eq!(state.elapsed(), Fixed::MAX);
}

#[test]
fn extreme_speed_stat_saturates_instead_of_wrapping() {
    let mut state = classic_battle();
    let racer = UnitStats::default().with_speed(Fixed::from_num(2_000_000_000));
    let p = place_unit(&mut state, Side::Player, 300, &racer);
    let e = place_unit(&mut state, Side::Enemy, 1200, &racer);

    for _ in 0..3 {
        state.step(fixed(2)).unwrap();
    }

    assert_eq!(state.unit(p).unwrap().position(), Fixed::MAX);
    assert_eq!(state.unit(e).unwrap().position(), Fixed::MIN);
    assert!(!state.is_terminated());
}

fn step_with(state: &mut SimulationState, dt: Fixed) -> Result<TickResult> {
    siege_core::simulation::step(state, dt)
}

#[test]
fn sides_parse_from_names() {
    assert_eq!("Player".parse::<Side>().unwrap(), Side::Player);
    assert_eq!("enemy".parse::<Side>().unwrap(), Side::Enemy);
    assert!(matches!(
        "neutral".parse::<Side>(),
        Err(InvalidArgument::UnknownSide(_))
    ));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn unit_health_stays_in_range(hits in arb_damage_sequence(32), stats in arb_unit_stats()) {
        let mut state = classic_battle();
        let id = state.spawn_unit_at(Side::Player, fixed(500), &stats).unwrap();
        let mut unit = state.unit(id).unwrap().clone();
        for hit in hits {
            let before = unit.health().current;
            let dealt = unit.take_damage(hit);
            prop_assert!(unit.health().current <= unit.health().max);
            prop_assert_eq!(before - dealt, unit.health().current);
        }
    }

    #[test]
    fn stronghold_health_stays_in_range(hits in arb_damage_sequence(64)) {
        let mut keep = Stronghold::new(Side::Enemy, &StrongholdConfig::castle("RightCastle", 1350));
        for hit in hits {
            keep.take_damage(hit);
            prop_assert!(keep.health().current <= 500);
        }
        prop_assert_eq!(keep.is_destroyed(), keep.health().current == 0);
    }

    #[test]
    fn income_independent_of_tick_granularity(dts in arb_dt_sequence(64)) {
        let config = StrongholdConfig::castle("LeftCastle", 50);
        let mut split = Stronghold::new(Side::Player, &config);
        let mut whole = Stronghold::new(Side::Player, &config);

        let mut total = Fixed::ZERO;
        for dt in &dts {
            split.accumulate_resources(*dt).unwrap();
            total += *dt;
        }
        whole.accumulate_resources(total).unwrap();

        prop_assert_eq!(split.resource_total(), whole.resource_total());
        prop_assert_eq!(split.resource_timer(), whole.resource_timer());
    }

    #[test]
    fn engaged_units_never_advance(
        placements in prop::collection::vec((arb_side(), arb_lane_x(), arb_unit_stats()), 1..12),
        dt in arb_dt(),
    ) {
        let mut state = classic_battle();
        for (side, x, stats) in &placements {
            state.spawn_unit_at(*side, fixed(*x), stats).unwrap();
        }
        let before = state.clone();

        state.step(dt).unwrap();

        for side in Side::ALL {
            for unit in state.units(side) {
                let old = before.unit(unit.id()).unwrap();
                if unit.is_engaged() {
                    prop_assert_eq!(unit.position(), old.position());
                } else {
                    let expected = old.position()
                        + unit.facing().multiplier() * old.speed() * dt;
                    prop_assert_eq!(unit.position(), expected);
                }
            }
        }
    }

    #[test]
    fn random_battles_are_deterministic(
        placements in prop::collection::vec((arb_side(), arb_lane_x(), arb_unit_stats()), 0..10),
        upgrades in prop::collection::vec((arb_side(), arb_upgrade()), 0..4),
    ) {
        let setup = || {
            let mut state = classic_battle();
            for (side, x, stats) in &placements {
                state.spawn_unit_at(*side, fixed(*x), stats).unwrap();
            }
            for (side, kind) in &upgrades {
                state.apply_upgrade_kind(*side, *kind);
            }
            state
        };

        let mut first = setup();
        let mut second = setup();
        run_ticks(&mut first, 240);
        run_ticks(&mut second, 240);
        prop_assert_eq!(first.state_hash(), second.state_hash());
        prop_assert_eq!(first, second);
    }
}
