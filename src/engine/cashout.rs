//! Cashout valuation.
//!
//! Prices an early exit before results are known, at a fixed haircut of the
//! live leg value, and computes the realized net once a cashout amount is
//! confirmed. Pure like the settlement engine: the lifecycle persists the
//! amount and credits the bankroll.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

use crate::types::{BetRecord, BetStatus, HedgeError, LegId, SelectionCode, SettlementResult};

/// Fixed haircut applied to `stake * odds` when pricing a live cashout.
/// Models the bookmaker's live-cashout discount.
pub const DEFAULT_CASHOUT_FACTOR: Decimal = dec!(0.70);

/// Which legs to cash out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CashoutScenario {
    /// Cash out every leg whose selection code is in the subset; the rest
    /// keep running. E.g. cash out `{H, A, HA}` and keep the draw-covering
    /// legs when a draw looks likely.
    Strategic { cash_out: BTreeSet<SelectionCode> },
    /// Cash out a fraction `f ∈ (0, 1]` of the full live value.
    Partial { fraction: Decimal },
    /// Caller-chosen legs with a caller-supplied amount: no automatic
    /// estimate is produced.
    Custom { legs: Vec<LegId> },
}

impl CashoutScenario {
    /// Strategic scenario for an expected draw: exit the legs a draw would
    /// sink, keep the draw-covering ones running.
    pub fn expecting_draw() -> Self {
        CashoutScenario::Strategic {
            cash_out: [
                SelectionCode::Home,
                SelectionCode::Away,
                SelectionCode::HomeAway,
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// Estimate the cashout value of a scenario against a placed record.
///
/// Returns `None` for `Custom` scenarios; the caller supplies the amount
/// directly to [`execute_cashout`]. `Partial` fractions outside `(0, 1]`
/// fail with `InvalidAmount`; `Custom` legs that do not belong to the record
/// fail with `InvalidLeg`.
pub fn value_scenario(
    bet: &BetRecord,
    scenario: &CashoutScenario,
    factor: Decimal,
) -> Result<Option<Decimal>, HedgeError> {
    match scenario {
        CashoutScenario::Strategic { cash_out } => {
            let mut value = Decimal::ZERO;
            for (leg, stake) in &bet.stakes {
                if cash_out.contains(&leg.code) {
                    value += *stake * bet.odds_for_leg(*leg)? * factor;
                }
            }
            Ok(Some(value))
        }
        CashoutScenario::Partial { fraction } => {
            if *fraction <= Decimal::ZERO || *fraction > Decimal::ONE {
                return Err(HedgeError::InvalidAmount(*fraction));
            }
            let live_value = live_value(bet, factor)?;
            Ok(Some(*fraction * live_value))
        }
        CashoutScenario::Custom { legs } => {
            // Validate the subset even though no estimate is returned.
            for leg in legs {
                if !bet.stakes.contains_key(leg) {
                    return Err(HedgeError::InvalidLeg(*leg));
                }
            }
            Ok(None)
        }
    }
}

/// Full live value of the ticket: every leg at `stake * odds * factor`.
pub fn live_value(bet: &BetRecord, factor: Decimal) -> Result<Decimal, HedgeError> {
    let mut value = Decimal::ZERO;
    for (leg, stake) in &bet.stakes {
        value += *stake * bet.odds_for_leg(*leg)? * factor;
    }
    Ok(value)
}

/// Realize a confirmed cashout amount against a placed record.
///
/// `net = amount - total_stake` and may be negative (a loss-limiting exit).
/// Pure; the caller persists the amount, transitions the record to
/// `cashed_out`, and credits the gross amount to the bankroll.
pub fn execute_cashout(
    bet: &BetRecord,
    cashout_amount: Decimal,
) -> Result<SettlementResult, HedgeError> {
    if cashout_amount < Decimal::ZERO {
        return Err(HedgeError::InvalidAmount(cashout_amount));
    }
    if bet.status != BetStatus::Placed {
        return Err(HedgeError::NotPlaced);
    }

    let total_stake = bet.total_stake();
    Ok(SettlementResult {
        gross_payout: cashout_amount,
        total_stake,
        net: cashout_amount - total_stake,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
