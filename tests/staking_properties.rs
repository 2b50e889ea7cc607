use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use sportsbet::domain::betting::staking::{StakeLimits, StakingPolicy};
use sportsbet::domain::betting::value_bet::Confidence;

fn limits() -> StakeLimits {
    StakeLimits {
        max_stake_pct: 0.05,
        max_stake_abs: 40.0,
    }
}

#[test]
fn test_example_scenario_stake() {
    // bankroll 1000, k = 0.25, p = 0.55, o = 2.10
    let uncapped = StakingPolicy::kelly(
        0.25,
        StakeLimits {
            max_stake_pct: 1.0,
            max_stake_abs: 1e6,
        },
    );
    let decision = uncapped.size(0.55, 2.10, 1000.0);
    assert!((decision.edge - 0.155).abs() < 1e-12);
    assert!((decision.kelly_fraction - 0.155 / 1.10).abs() < 1e-12);
    assert_eq!(Decimal::from_f64_retain(decision.stake).map(|d| d.round_dp(2)), Some(dec!(35.22)));
    assert_eq!(decision.confidence, Confidence::High);

    let capped = StakingPolicy::kelly(0.25, limits()).size(0.55, 2.10, 1000.0);
    assert_eq!(capped.stake, 35.22_f64.min(40.0).min(50.0));
}

#[test]
fn test_non_positive_edge_never_stakes() {
    let policy = StakingPolicy::kelly(1.0, limits());
    for (p, o) in [(0.40, 2.00), (0.5, 2.0), (0.2, 4.5), (0.99, 1.0), (0.9, 1.05)] {
        let decision = policy.size(p, o, 1000.0);
        if p * o - 1.0 <= 0.0 {
            assert_eq!(decision.stake, 0.0, "p={} o={}", p, o);
        }
    }
}

#[test]
fn test_stake_within_bounds_on_a_sweep() {
    let policy = StakingPolicy::kelly(1.0, limits());
    let bankrolls = [dec!(0), dec!(12.5), dec!(800), dec!(1000), dec!(250000)];
    for bankroll in bankrolls {
        let b = bankroll.to_f64().unwrap_or(0.0);
        for pi in 1..100 {
            let p = pi as f64 / 100.0;
            for oi in 101..600 {
                let o = oi as f64 / 100.0;
                let stake = policy.size(p, o, b).stake;
                assert!(stake >= 0.0);
                assert!(stake <= (0.05 * b).min(40.0) + 1e-9, "p={} o={} b={}", p, o, b);
            }
        }
    }
}
