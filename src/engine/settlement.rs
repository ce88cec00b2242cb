//! Settlement engine.
//!
//! Pure computation of the financial outcome of a placed bet once every
//! match result is known. No ledger side effects here: the lifecycle credits
//! the bankroll and marks the record resolved.

use rust_decimal::Decimal;

use crate::coverage;
use crate::types::{BetRecord, BetStatus, HedgeError, MatchResult, SettlementResult, Strategy};

/// Settle a single-market hedge: each leg whose selection covers its match
/// result contributes `stake * odds` to the gross payout.
///
/// Requires one known result per match (no partial settlement) and a record
/// in `placed` state.
pub fn settle_single(
    bet: &BetRecord,
    results: &[MatchResult],
) -> Result<SettlementResult, HedgeError> {
    ensure_settleable(bet, results)?;
    if bet.strategy.is_accumulator() {
        return Err(HedgeError::StrategyMismatch);
    }

    let total_stake = bet.total_stake();
    let mut gross_payout = Decimal::ZERO;

    for (leg, stake) in &bet.stakes {
        let result = results
            .get(leg.match_index)
            .copied()
            .ok_or(HedgeError::InvalidLeg(*leg))?;
        if coverage::covers(leg.code, result) {
            gross_payout += *stake * bet.odds_for_leg(*leg)?;
        }
    }

    Ok(SettlementResult {
        gross_payout,
        total_stake,
        net: gross_payout - total_stake,
    })
}

/// Settle an accumulator: the ticket wins only if every leg's selection
/// covers its match's actual result. Full win pays `stake * total_odds`;
/// any losing leg forfeits the whole stake, with no partial credit.
pub fn settle_accumulator(
    bet: &BetRecord,
    results: &[MatchResult],
) -> Result<SettlementResult, HedgeError> {
    ensure_settleable(bet, results)?;

    let total_odds = match &bet.strategy {
        Strategy::Accumulator { total_odds, .. } => *total_odds,
        // A single-hedge record has no single multiplied price.
        Strategy::Single { .. } => return Err(HedgeError::StrategyMismatch),
    };

    let total_stake = bet.total_stake();
    let mut all_covered = true;
    for leg in bet.stakes.keys() {
        let result = results
            .get(leg.match_index)
            .copied()
            .ok_or(HedgeError::InvalidLeg(*leg))?;
        if !coverage::covers(leg.code, result) {
            all_covered = false;
            break;
        }
    }

    let gross_payout = if all_covered {
        total_stake * total_odds
    } else {
        Decimal::ZERO
    };

    Ok(SettlementResult {
        gross_payout,
        total_stake,
        net: gross_payout - total_stake,
    })
}

/// Settle a record according to its own strategy.
pub fn settle(bet: &BetRecord, results: &[MatchResult]) -> Result<SettlementResult, HedgeError> {
    match &bet.strategy {
        Strategy::Single { .. } => settle_single(bet, results),
        Strategy::Accumulator { .. } => settle_accumulator(bet, results),
    }
}

fn ensure_settleable(bet: &BetRecord, results: &[MatchResult]) -> Result<(), HedgeError> {
    if bet.status != BetStatus::Placed {
        return Err(HedgeError::AlreadyResolved);
    }
    if results.len() != bet.matches.len() {
        return Err(HedgeError::IncompleteResults {
            expected: bet.matches.len(),
            got: results.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LegId, Match, SelectionCode, StakeMap, StakePlan};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn match_with_odds(index: usize, quotes: &[(SelectionCode, Decimal)]) -> Match {
        let mut odds = BTreeMap::new();
        for (code, value) in quotes {
            odds.insert(*code, *value);
        }
        Match {
            index,
            name: format!("match {}", index + 1),
            odds,
        }
    }

    /// Scenario from the engine's own cross-check: M1_H stake 6 @ 2.0,
    /// M1_D stake 4 @ 3.0, total stake 10.
    fn hedged_single() -> BetRecord {
        let m = match_with_odds(
            0,
            &[
                (SelectionCode::Home, dec!(2.0)),
                (SelectionCode::Draw, dec!(3.0)),
            ],
        );
        let mut stakes = StakeMap::new();
        stakes.insert(LegId::new(0, SelectionCode::Home), dec!(6));
        stakes.insert(LegId::new(0, SelectionCode::Draw), dec!(4));
        let plan = StakePlan {
            stakes,
            outcome_space: vec![
                vec![MatchResult::Home],
                vec![MatchResult::Draw],
                vec![MatchResult::Away],
            ],
            nets: vec![dec!(2), dec!(2), dec!(-10)],
            guaranteed_return: dec!(-10),
        };
        let mut bet = BetRecord::single(vec![m], plan).unwrap();
        bet.status = BetStatus::Placed;
        bet
    }

    fn two_leg_accumulator() -> BetRecord {
        let m1 = match_with_odds(0, &[(SelectionCode::Home, dec!(2.0))]);
        let m2 = match_with_odds(1, &[(SelectionCode::Away, dec!(2.5))]);
        let mut bet = BetRecord::accumulator(
            vec![m1, m2],
            vec![SelectionCode::Home, SelectionCode::Away],
            dec!(10),
        )
        .unwrap();
        bet.status = BetStatus::Placed;
        bet
    }

    // -- settle_single --

    #[test]
    fn test_single_home_result_pays_home_leg() {
        let bet = hedged_single();
        let res = settle_single(&bet, &[MatchResult::Home]).unwrap();
        assert_eq!(res.gross_payout, dec!(12)); // 6 * 2.0
        assert_eq!(res.total_stake, dec!(10));
        assert_eq!(res.net, dec!(2));
    }

    #[test]
    fn test_single_draw_result_pays_draw_leg() {
        let bet = hedged_single();
        let res = settle_single(&bet, &[MatchResult::Draw]).unwrap();
        assert_eq!(res.gross_payout, dec!(12)); // 4 * 3.0
        assert_eq!(res.net, dec!(2));
    }

    #[test]
    fn test_single_uncovered_result_loses_stake() {
        let bet = hedged_single();
        let res = settle_single(&bet, &[MatchResult::Away]).unwrap();
        assert_eq!(res.gross_payout, Decimal::ZERO);
        assert_eq!(res.net, dec!(-10));
    }

    #[test]
    fn test_single_nets_match_declared_plan() {
        // The plan's own nets are the settlement oracle: recomputing from
        // real results must land on the optimizer-declared figure for every
        // outcome in the plan's outcome space.
        let bet = hedged_single();
        let (outcome_space, nets, guaranteed) = match &bet.strategy {
            Strategy::Single {
                outcome_space,
                nets,
                guaranteed_return,
            } => (outcome_space.clone(), nets.clone(), *guaranteed_return),
            Strategy::Accumulator { .. } => panic!("expected single"),
        };

        let mut worst = Decimal::MAX;
        for (outcome, declared_net) in outcome_space.iter().zip(&nets) {
            let res = settle_single(&bet, outcome).unwrap();
            assert_eq!(res.net, *declared_net, "outcome {outcome:?}");
            worst = worst.min(res.net);
        }
        // Defining property of the hedge: worst case equals guaranteed R.
        assert_eq!(worst, guaranteed);
    }

    #[test]
    fn test_single_double_chance_leg_covers_draw() {
        let m = match_with_odds(
            0,
            &[
                (SelectionCode::Home, dec!(2.0)),
                (SelectionCode::HomeDraw, dec!(1.5)),
            ],
        );
        let mut stakes = StakeMap::new();
        stakes.insert(LegId::new(0, SelectionCode::Home), dec!(5));
        stakes.insert(LegId::new(0, SelectionCode::HomeDraw), dec!(5));
        let plan = StakePlan {
            stakes,
            outcome_space: vec![],
            nets: vec![],
            guaranteed_return: Decimal::ZERO,
        };
        let mut bet = BetRecord::single(vec![m], plan).unwrap();
        bet.status = BetStatus::Placed;

        // Draw: the HD leg wins, the H leg does not.
        let res = settle_single(&bet, &[MatchResult::Draw]).unwrap();
        assert_eq!(res.gross_payout, dec!(7.5)); // 5 * 1.5
        assert_eq!(res.net, dec!(-2.5));

        // Home: both legs win.
        let res = settle_single(&bet, &[MatchResult::Home]).unwrap();
        assert_eq!(res.gross_payout, dec!(17.5)); // 5*2.0 + 5*1.5
    }

    #[test]
    fn test_single_rejects_missing_results() {
        let bet = hedged_single();
        let err = settle_single(&bet, &[]).unwrap_err();
        assert!(matches!(
            err,
            HedgeError::IncompleteResults { expected: 1, got: 0 }
        ));
    }

    #[test]
    fn test_single_rejects_unplaced_record() {
        let mut bet = hedged_single();
        bet.status = BetStatus::Calculated;
        assert!(matches!(
            settle_single(&bet, &[MatchResult::Home]),
            Err(HedgeError::AlreadyResolved)
        ));

        bet.status = BetStatus::Resolved;
        assert!(matches!(
            settle_single(&bet, &[MatchResult::Home]),
            Err(HedgeError::AlreadyResolved)
        ));
    }

    // -- settle_accumulator --

    #[test]
    fn test_accumulator_full_win() {
        let bet = two_leg_accumulator();
        let res = settle_accumulator(&bet, &[MatchResult::Home, MatchResult::Away]).unwrap();
        assert_eq!(res.gross_payout, dec!(50)); // 10 * (2.0 * 2.5)
        assert_eq!(res.net, dec!(40));
    }

    #[test]
    fn test_accumulator_one_losing_leg_forfeits_everything() {
        let bet = two_leg_accumulator();
        // Flipping exactly one leg from covering to not covering moves the
        // ticket from full payout to total loss.
        let win = settle_accumulator(&bet, &[MatchResult::Home, MatchResult::Away]).unwrap();
        let lose = settle_accumulator(&bet, &[MatchResult::Home, MatchResult::Draw]).unwrap();
        assert_eq!(win.net, dec!(40));
        assert_eq!(lose.gross_payout, Decimal::ZERO);
        assert_eq!(lose.net, dec!(-10));
    }

    #[test]
    fn test_accumulator_all_legs_lose() {
        let bet = two_leg_accumulator();
        let res = settle_accumulator(&bet, &[MatchResult::Away, MatchResult::Home]).unwrap();
        assert_eq!(res.gross_payout, Decimal::ZERO);
        assert_eq!(res.net, dec!(-10));
    }

    #[test]
    fn test_accumulator_double_chance_leg() {
        let m1 = match_with_odds(0, &[(SelectionCode::HomeDraw, dec!(1.44))]);
        let mut bet =
            BetRecord::accumulator(vec![m1], vec![SelectionCode::HomeDraw], dec!(10)).unwrap();
        bet.status = BetStatus::Placed;

        let res = settle_accumulator(&bet, &[MatchResult::Draw]).unwrap();
        assert_eq!(res.gross_payout, dec!(14.40));
        let res = settle_accumulator(&bet, &[MatchResult::Away]).unwrap();
        assert_eq!(res.net, dec!(-10));
    }

    #[test]
    fn test_accumulator_rejects_partial_results() {
        let bet = two_leg_accumulator();
        let err = settle_accumulator(&bet, &[MatchResult::Home]).unwrap_err();
        assert!(matches!(
            err,
            HedgeError::IncompleteResults { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn test_accumulator_rejects_single_record() {
        let bet = hedged_single();
        assert!(matches!(
            settle_accumulator(&bet, &[MatchResult::Home]),
            Err(HedgeError::StrategyMismatch)
        ));
    }

    #[test]
    fn test_single_rejects_accumulator_record() {
        let bet = two_leg_accumulator();
        assert!(matches!(
            settle_single(&bet, &[MatchResult::Home, MatchResult::Away]),
            Err(HedgeError::StrategyMismatch)
        ));
    }

    // -- settle dispatch --

    #[test]
    fn test_settle_dispatches_on_strategy() {
        let single = hedged_single();
        let acc = two_leg_accumulator();
        assert_eq!(
            settle(&single, &[MatchResult::Home]).unwrap().net,
            dec!(2)
        );
        assert_eq!(
            settle(&acc, &[MatchResult::Home, MatchResult::Away])
                .unwrap()
                .net,
            dec!(40)
        );
    }
}
