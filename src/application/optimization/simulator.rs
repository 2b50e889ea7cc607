use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::betting::bankroll::BankrollState;
use crate::domain::betting::staking::StakingPolicy;
use crate::domain::betting::value_bet::{BetCandidate, Settlement, ValueBet};
use crate::domain::errors::BettingError;
use crate::domain::validation::data_quality::StrictBetValidator;

/// Output of one simulated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub initial_capital: f64,
    pub final_capital: f64,
    /// One capital value per event, in event order.
    pub trajectory: Vec<f64>,
    /// Every evaluated (valid) candidate with its settlement, including
    /// zero-stake evaluations.
    pub bets: Vec<ValueBet>,
    pub events: usize,
    pub data_quality_skips: usize,
}

impl SimulationResult {
    pub fn placed_bets(&self) -> impl Iterator<Item = &ValueBet> {
        self.bets.iter().filter(|b| b.stake > 0.0)
    }
}

/// Replays chronologically ordered candidates against a single bankroll.
///
/// Each stake is sized with the capital as it stands right before its
/// event; the result of the event is only read after the stake is fixed.
pub struct BankrollSimulator {
    policy: StakingPolicy,
    initial_capital: f64,
}

impl BankrollSimulator {
    pub fn new(policy: StakingPolicy, initial_capital: f64) -> Self {
        Self {
            policy,
            initial_capital,
        }
    }

    /// Runs the candidates in the given order. Equal kickoffs keep their
    /// input order; a kickoff earlier than its predecessor is an invariant
    /// violation.
    pub fn run(&self, candidates: &[BetCandidate]) -> Result<SimulationResult, BettingError> {
        let mut state = BankrollState::new(self.initial_capital, self.policy.limits)?;
        let mut bets = Vec::new();
        let mut skips = 0;

        for candidate in candidates {
            state.begin_event(candidate.kickoff)?;

            let (probability, price) = match StrictBetValidator::validate_candidate(candidate) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Simulator: {}", e);
                    skips += 1;
                    state.record_point();
                    continue;
                }
            };

            let decision = self
                .policy
                .size(probability, price, state.capital())
                .require_edge(candidate.min_edge);

            let bet = ValueBet::new(candidate, probability, price, &decision);
            let bet = if decision.stake > 0.0 {
                let won = candidate.won();
                let profit = state.settle(decision.stake, price, won).map_err(|e| {
                    error!("Simulator: {} ({})", e, bet.description());
                    e
                })?;
                let settlement = match won {
                    Some(true) => Settlement::Won,
                    Some(false) => Settlement::Lost,
                    None => Settlement::Void,
                };
                debug!(
                    "Simulator: {} stake={:.2} @ {:.2} -> {:?} {:+.2} (bankroll {:.2})",
                    bet.description(),
                    decision.stake,
                    price,
                    settlement,
                    profit,
                    state.capital()
                );
                bet.settled(settlement, profit)
            } else {
                bet.settled(Settlement::Void, 0.0)
            };

            bets.push(bet);
            state.record_point();
        }

        state.finish();

        let result = SimulationResult {
            initial_capital: state.initial_capital(),
            final_capital: state.capital(),
            trajectory: state.trajectory().to_vec(),
            events: candidates.len(),
            data_quality_skips: skips,
            bets,
        };

        info!(
            "Simulator: {} events, {} bets placed, {} skipped, capital {:.2} -> {:.2}",
            result.events,
            result.placed_bets().count(),
            result.data_quality_skips,
            result.initial_capital,
            result.final_capital
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::betting::staking::StakeLimits;
    use crate::domain::betting::types::{AWAY_WIN, HOME_WIN, OddsOutcomeRecord};
    use chrono::{Duration, TimeZone, Utc};

    fn candidate(day: i64, outcome: &str, p: Option<f64>, price: f64, result: Option<&str>) -> BetCandidate {
        let mut record = OddsOutcomeRecord::new(
            format!("m{}", day),
            "Eredivisie",
            "Ajax",
            "PSV",
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(day),
        )
        .with_offered_odds(outcome, price);
        if let Some(result) = result {
            record = record.with_result(result);
        }
        BetCandidate::from_record(&record, outcome, p, 0.0)
    }

    fn policy() -> StakingPolicy {
        StakingPolicy::kelly(
            1.0,
            StakeLimits {
                max_stake_pct: 0.1,
                max_stake_abs: 1000.0,
            },
        )
    }

    #[test]
    fn test_bankroll_compounds_between_events() {
        let candidates = vec![
            candidate(0, HOME_WIN, Some(0.6), 2.0, Some(HOME_WIN)),
            candidate(1, HOME_WIN, Some(0.6), 2.0, Some(AWAY_WIN)),
        ];
        let result = BankrollSimulator::new(policy(), 1000.0).run(&candidates).unwrap();

        // 10% cap: first stake 100 wins, second stake is 10% of 1100
        assert_eq!(result.trajectory, vec![1100.0, 990.0]);
        assert_eq!(result.bets[0].settlement, Settlement::Won);
        assert_eq!(result.bets[1].stake, 110.0);
        assert_eq!(result.bets[1].settlement, Settlement::Lost);
        assert_eq!(result.final_capital, 990.0);
    }

    #[test]
    fn test_no_bet_still_records_trajectory_point() {
        let candidates = vec![
            candidate(0, HOME_WIN, Some(0.4), 2.0, Some(HOME_WIN)),
            candidate(1, HOME_WIN, None, 2.0, Some(HOME_WIN)),
            candidate(2, HOME_WIN, Some(0.6), 0.9, Some(HOME_WIN)),
        ];
        let result = BankrollSimulator::new(policy(), 1000.0).run(&candidates).unwrap();

        assert_eq!(result.trajectory, vec![1000.0; 3]);
        assert_eq!(result.events, 3);
        assert_eq!(result.data_quality_skips, 2);
        assert_eq!(result.bets.len(), 1);
        assert_eq!(result.bets[0].stake, 0.0);
        assert_eq!(result.bets[0].settlement, Settlement::Void);
    }

    #[test]
    fn test_unsettled_match_voids_the_stake() {
        let candidates = vec![candidate(0, HOME_WIN, Some(0.6), 2.0, None)];
        let result = BankrollSimulator::new(policy(), 1000.0).run(&candidates).unwrap();
        assert_eq!(result.trajectory, vec![1000.0]);
        assert_eq!(result.bets[0].settlement, Settlement::Void);
        assert!(result.bets[0].stake > 0.0);
    }

    #[test]
    fn test_out_of_order_events_halt_the_run() {
        let candidates = vec![
            candidate(5, HOME_WIN, Some(0.6), 2.0, Some(HOME_WIN)),
            candidate(1, HOME_WIN, Some(0.6), 2.0, Some(HOME_WIN)),
        ];
        let err = BankrollSimulator::new(policy(), 1000.0)
            .run(&candidates)
            .unwrap_err();
        assert!(matches!(err, BettingError::InvariantViolation(_)));
    }

    #[test]
    fn test_trajectory_never_negative_over_losing_streak() {
        let candidates: Vec<BetCandidate> = (0..200)
            .map(|d| candidate(d, HOME_WIN, Some(0.9), 3.0, Some(AWAY_WIN)))
            .collect();
        let aggressive = StakingPolicy::kelly(
            1.0,
            StakeLimits {
                max_stake_pct: 1.0,
                max_stake_abs: 1e9,
            },
        );
        let result = BankrollSimulator::new(aggressive, 100.0).run(&candidates).unwrap();
        assert_eq!(result.trajectory.len(), 200);
        assert!(result.trajectory.iter().all(|c| *c >= 0.0));
    }
}
