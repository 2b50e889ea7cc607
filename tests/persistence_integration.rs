use sportsbet::application::bettors::{
    Bettor, BettorSpec, BettorTemplate, load_bettor, load_snapshot, save_bettor,
};
use sportsbet::application::ml::{ForecasterSpec, ForestParams};
use sportsbet::domain::betting::staking::StakingPolicy;
use sportsbet::domain::betting::types::OddsType;
use sportsbet::domain::errors::BettingError;
use sportsbet::infrastructure::{FileBettorStore, SyntheticMatchGenerator};

fn split() -> (
    Vec<sportsbet::domain::betting::types::OddsOutcomeRecord>,
    Vec<sportsbet::domain::betting::types::OddsOutcomeRecord>,
) {
    let mut records = SyntheticMatchGenerator::new(31)
        .with_days(60)
        .generate(&OddsType::MarketMaximum);
    let test = records.split_off(100);
    (records, test)
}

#[test]
fn test_round_trip_reproduces_predictions_for_every_bettor() {
    let (train, test) = split();
    let specs = vec![
        BettorTemplate::Logistic.spec(0.0, StakingPolicy::default()),
        BettorSpec::classifier(
            ForecasterSpec::RandomForest(ForestParams {
                n_trees: 10,
                max_depth: 4,
                min_samples_split: 4,
            }),
            StakingPolicy::default(),
        ),
        BettorTemplate::OddsComparison.spec(0.02, StakingPolicy::default()),
    ];

    for spec in specs {
        let mut bettor = spec.build();
        bettor.fit(&train).unwrap();

        let restored = load_bettor(&save_bettor(&bettor).unwrap()).unwrap();
        assert!(restored.is_fitted());
        assert_eq!(
            restored.predict(&test).unwrap(),
            bettor.predict(&test).unwrap(),
            "{}",
            spec.label()
        );
        assert_eq!(
            restored.decide(&test, 1000.0).unwrap(),
            bettor.decide(&test, 1000.0).unwrap()
        );
    }
}

#[test]
fn test_unfitted_bettor_round_trips_unfitted() {
    let bettor = BettorTemplate::Logistic
        .spec(0.0, StakingPolicy::default())
        .build();
    let restored = load_bettor(&save_bettor(&bettor).unwrap()).unwrap();
    assert!(!restored.is_fitted());
    assert!(matches!(
        restored.predict(&split().1),
        Err(BettingError::NotFitted { .. })
    ));
}

#[test]
fn test_snapshot_header_is_self_describing() {
    let bettor = BettorTemplate::OddsComparison
        .spec(0.01, StakingPolicy::default())
        .build();
    let blob = save_bettor(&bettor).unwrap();
    let snapshot = load_snapshot(&blob).unwrap();
    assert_eq!(snapshot.format_version, 1);

    let json: serde_json::Value = serde_json::from_slice(&blob).unwrap();
    assert_eq!(json["bettor"]["type"], "odds_comparison");
}

#[test]
fn test_file_store_round_trip() {
    let (train, test) = split();
    let dir = std::env::temp_dir().join(format!("sportsbet_it_store_{}", std::process::id()));
    let store = FileBettorStore::new(&dir).unwrap();

    let mut bettor = BettorTemplate::Logistic
        .spec(0.0, StakingPolicy::default())
        .build();
    bettor.fit(&train).unwrap();
    store.save("logistic", &bettor).unwrap();

    let restored = store.load("logistic").unwrap().unwrap();
    assert_eq!(restored.predict(&test).unwrap(), bettor.predict(&test).unwrap());

    std::fs::remove_dir_all(dir).ok();
}
