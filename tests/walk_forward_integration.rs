use sportsbet::application::bettors::{BettorSpec, BettorTemplate};
use sportsbet::application::optimization::{
    FoldMode, FoldOutcome, WalkForwardConfig, backtest, value_bet_backtest,
};
use sportsbet::domain::betting::staking::{StakeLimits, StakingPolicy};
use sportsbet::domain::betting::types::OddsType;
use sportsbet::domain::betting::value_bet::Settlement;
use sportsbet::domain::ports::OddsDataLoader;
use sportsbet::infrastructure::SyntheticMatchGenerator;

fn league(days: u32) -> Vec<sportsbet::domain::betting::types::OddsOutcomeRecord> {
    SyntheticMatchGenerator::new(11)
        .with_days(days)
        .load(&OddsType::MarketMaximum, 0.5)
        .expect("synthetic league")
}

fn policy() -> StakingPolicy {
    StakingPolicy::kelly(
        0.5,
        StakeLimits {
            max_stake_pct: 0.05,
            max_stake_abs: 300.0,
        },
    )
}

#[test]
fn test_synthetic_backtest_never_trains_on_future_matches() {
    let records = league(120);
    for mode in [FoldMode::Expanding, FoldMode::Rolling] {
        let config = WalkForwardConfig {
            n_folds: 4,
            mode,
            ..Default::default()
        };
        let spec = BettorTemplate::Logistic.spec(0.0, policy());
        let report = backtest(&spec, &records, &config).expect("backtest");

        assert_eq!(report.folds.len(), 4);
        assert!(report.folds[0].is_excluded());

        for fold in report.completed_folds() {
            let train_end = fold.train_end.expect("completed folds have training data");
            assert!(train_end < fold.test_start);

            let FoldOutcome::Completed {
                trajectory, bets, ..
            } = &fold.outcome
            else {
                unreachable!()
            };
            assert!(bets.iter().all(|b| b.kickoff > train_end));
            assert!(trajectory.iter().all(|c| *c >= 0.0));
            assert!(trajectory.len() >= bets.len());
        }
    }
}

#[test]
fn test_stakes_respect_caps_and_settle() {
    let records = league(90);
    let spec = BettorSpec::odds_comparison(0.0, policy());
    let report = backtest(&spec, &records, &WalkForwardConfig::default()).unwrap();

    let bets = report.placed_bets();
    for bet in &bets {
        assert!(bet.stake > 0.0);
        assert!(bet.stake <= 300.0);
        assert!(bet.edge > 0.0);
        assert_ne!(bet.settlement, Settlement::Pending);
        match bet.settlement {
            Settlement::Won => assert!((bet.profit - bet.stake * (bet.price - 1.0)).abs() < 1e-9),
            Settlement::Lost => assert_eq!(bet.profit, -bet.stake),
            _ => {}
        }
    }

    let combined = &report.combined;
    assert_eq!(combined.bets_placed, bets.len());
    assert_eq!(combined.folds_completed + report.excluded_folds, 3);
}

#[test]
fn test_value_bet_backtest_returns_placed_bets() {
    let records = league(90);
    let spec = BettorTemplate::Logistic.spec(0.0, policy());
    let config = WalkForwardConfig::default();

    let report = backtest(&spec, &records, &config).unwrap();
    let bets = value_bet_backtest(&spec, &records, &config).unwrap();

    assert_eq!(bets, report.placed_bets());
    assert!(bets.iter().all(|b| b.is_value_bet()));
}

#[test]
fn test_backtest_is_reproducible() {
    let records = league(90);
    let spec = BettorTemplate::Logistic.spec(0.0, policy());
    let config = WalkForwardConfig::default();

    let a = backtest(&spec, &records, &config).unwrap();
    let b = backtest(&spec, &records, &config).unwrap();
    assert_eq!(a.placed_bets(), b.placed_bets());
    assert_eq!(a.combined.total_return, b.combined.total_return);
}

#[test]
fn test_every_fold_starts_from_fresh_bankroll() {
    let records = league(90);
    let config = WalkForwardConfig {
        initial_capital: 2500.0,
        ..Default::default()
    };
    let spec = BettorSpec::odds_comparison(0.0, policy());
    let report = backtest(&spec, &records, &config).unwrap();

    for fold in report.completed_folds() {
        let metrics = fold.metrics().unwrap();
        assert_eq!(metrics.initial_capital, 2500.0);
    }
}
