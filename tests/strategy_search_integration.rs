use sportsbet::application::bettors::BettorSpec;
use sportsbet::application::optimization::{
    Objective, ParameterGrid, StrategySearch, WalkForwardConfig,
};
use sportsbet::domain::betting::staking::StakingPolicy;
use sportsbet::domain::betting::types::OddsType;
use sportsbet::domain::errors::BettingError;
use sportsbet::infrastructure::SyntheticMatchGenerator;

fn templates() -> Vec<BettorSpec> {
    vec![
        BettorSpec::odds_comparison(0.0, StakingPolicy::default()),
        BettorSpec::odds_comparison(0.05, StakingPolicy::default()),
    ]
}

fn grid() -> ParameterGrid {
    ParameterGrid {
        kelly_fraction: vec![0.25, 0.5],
        max_stake_pct: vec![0.02],
        max_stake_abs: vec![500.0],
    }
}

#[test]
fn test_search_ranks_every_configuration() {
    let records = SyntheticMatchGenerator::new(21)
        .with_days(90)
        .generate(&OddsType::MarketMaximum);

    let search = StrategySearch::new(
        templates(),
        grid(),
        Objective::TotalReturn,
        WalkForwardConfig::default(),
    )
    .sequential();
    let outcome = search.run(&records).unwrap();

    assert_eq!(outcome.ranking.len(), 4);
    assert!(outcome.failures.is_empty());
    assert!(!outcome.cancelled);
    assert!(
        outcome
            .ranking
            .windows(2)
            .all(|w| w[0].score >= w[1].score || w[1].score.is_nan())
    );
    assert_eq!(outcome.best_spec, outcome.ranking[0].spec);
    assert_eq!(
        outcome.best_report.combined.total_return,
        outcome.ranking[0].score
    );
}

#[test]
fn test_parallel_and_sequential_agree() {
    let records = SyntheticMatchGenerator::new(22)
        .with_days(60)
        .generate(&OddsType::MarketAverage);
    let make = || {
        StrategySearch::new(
            templates(),
            grid(),
            Objective::Roi,
            WalkForwardConfig::default(),
        )
    };

    let sequential = make().sequential().run(&records).unwrap();
    let parallel = make().run(&records).unwrap();

    let labels = |o: &sportsbet::application::optimization::SearchOutcome| {
        o.ranking.iter().map(|r| r.index).collect::<Vec<_>>()
    };
    assert_eq!(labels(&sequential), labels(&parallel));
}

#[test]
fn test_configurations_without_completed_folds_are_failures() {
    let records = SyntheticMatchGenerator::new(24)
        .with_days(60)
        .generate(&OddsType::MarketMaximum);
    let config = WalkForwardConfig {
        min_train_records: records.len() + 1,
        ..Default::default()
    };
    let search = StrategySearch::new(templates(), grid(), Objective::TotalReturn, config);

    assert!(matches!(
        search.run(&records),
        Err(BettingError::SearchExhausted { failed: 4 })
    ));
}

#[test]
fn test_cancelled_before_start_evaluates_nothing() {
    let records = SyntheticMatchGenerator::new(23)
        .with_days(30)
        .generate(&OddsType::MarketMaximum);
    let search = StrategySearch::new(
        templates(),
        grid(),
        Objective::SharpeRatio,
        WalkForwardConfig::default(),
    );
    search
        .cancel_handle()
        .store(true, std::sync::atomic::Ordering::SeqCst);

    assert!(matches!(
        search.run(&records),
        Err(BettingError::SearchExhausted { failed: 0 })
    ));
}
