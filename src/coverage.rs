//! Selection coverage model.
//!
//! Pure mapping from a market selection code to the set of match results
//! it wins under, plus the odds lookup with its 1.0 default. Coverage is a
//! function of the typed `(SelectionCode, MatchResult)` pair only: leg ids
//! are parsed into `LegId` at the boundary, and no logic here (or anywhere
//! downstream) classifies a leg by substring-matching its serialized id.

use rust_decimal::Decimal;

use crate::types::{Match, MatchResult, SelectionCode};

/// Whether a selection wins under an actual match result.
///
/// Double-chance codes cover exactly their two named results; single codes
/// cover only their own result, regardless of which other legs exist on the
/// same bet.
pub fn covers(code: SelectionCode, result: MatchResult) -> bool {
    match code {
        SelectionCode::Home => result == MatchResult::Home,
        SelectionCode::Draw => result == MatchResult::Draw,
        SelectionCode::Away => result == MatchResult::Away,
        SelectionCode::HomeDraw => {
            matches!(result, MatchResult::Home | MatchResult::Draw)
        }
        SelectionCode::AwayDraw => {
            matches!(result, MatchResult::Away | MatchResult::Draw)
        }
        SelectionCode::HomeAway => {
            matches!(result, MatchResult::Home | MatchResult::Away)
        }
    }
}

/// Coverage against a possibly-unknown result. An absent result covers
/// nothing.
pub fn covers_opt(code: SelectionCode, result: Option<MatchResult>) -> bool {
    result.is_some_and(|r| covers(code, r))
}

/// Quoted decimal odds for a selection on a match. A missing quote is a
/// configuration gap, not an error: it reads as odds of 1.0 (stake-back).
pub fn odds_for(m: &Match, code: SelectionCode) -> Decimal {
    m.odds.get(&code).copied().unwrap_or(Decimal::ONE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
