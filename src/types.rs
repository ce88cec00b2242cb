//! Shared types for the HEDGEBOOK engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that coverage, settlement,
//! ledger, and lifecycle modules can depend on them without
//! circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::storage::StoreError;

// ---------------------------------------------------------------------------
// Match results and selection codes
// ---------------------------------------------------------------------------

/// The result of one match: home win, draw, or away win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "A")]
    Away,
}

impl MatchResult {
    /// All possible results (useful for iterating outcome spaces).
    pub const ALL: &'static [MatchResult] =
        &[MatchResult::Home, MatchResult::Draw, MatchResult::Away];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResult::Home => "H",
            MatchResult::Draw => "D",
            MatchResult::Away => "A",
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchResult {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" => Ok(MatchResult::Home),
            "D" => Ok(MatchResult::Draw),
            "A" => Ok(MatchResult::Away),
            _ => Err(anyhow::anyhow!("Unknown match result: {s}")),
        }
    }
}

/// A bookable market selection: a single result or a double chance
/// covering two of the three results. Closed enumeration: any other
/// code in serialized data is a parse error, never silently accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SelectionCode {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "A")]
    Away,
    #[serde(rename = "HD")]
    HomeDraw,
    #[serde(rename = "AD")]
    AwayDraw,
    #[serde(rename = "HA")]
    HomeAway,
}

impl SelectionCode {
    /// All valid codes, singles first then double chances.
    pub const ALL: &'static [SelectionCode] = &[
        SelectionCode::Home,
        SelectionCode::Draw,
        SelectionCode::Away,
        SelectionCode::HomeDraw,
        SelectionCode::AwayDraw,
        SelectionCode::HomeAway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionCode::Home => "H",
            SelectionCode::Draw => "D",
            SelectionCode::Away => "A",
            SelectionCode::HomeDraw => "HD",
            SelectionCode::AwayDraw => "AD",
            SelectionCode::HomeAway => "HA",
        }
    }

    /// Whether this is a double-chance code (covers two results).
    pub fn is_double_chance(&self) -> bool {
        matches!(
            self,
            SelectionCode::HomeDraw | SelectionCode::AwayDraw | SelectionCode::HomeAway
        )
    }
}

impl fmt::Display for SelectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SelectionCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" => Ok(SelectionCode::Home),
            "D" => Ok(SelectionCode::Draw),
            "A" => Ok(SelectionCode::Away),
            "HD" => Ok(SelectionCode::HomeDraw),
            "AD" => Ok(SelectionCode::AwayDraw),
            "HA" => Ok(SelectionCode::HomeAway),
            _ => Err(anyhow::anyhow!("Unknown selection code: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Leg identifier
// ---------------------------------------------------------------------------

/// Composite identifier for one leg of a bet: `(match index, selection code)`.
///
/// Serialized as `"M{index+1}_{CODE}"` (e.g. `"M1_HD"` for the home/draw
/// double chance on the first match). Parsing happens exactly once at the
/// boundary; all coverage and settlement logic operates on the typed pair.
/// Substring tests on the raw string are not a valid way to classify a leg:
/// `"M1_HD"` contains `"_H"` but is not a home single.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct LegId {
    pub match_index: usize,
    pub code: SelectionCode,
}

impl LegId {
    pub fn new(match_index: usize, code: SelectionCode) -> Self {
        Self { match_index, code }
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}_{}", self.match_index + 1, self.code)
    }
}

impl FromStr for LegId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('M')
            .ok_or_else(|| anyhow::anyhow!("Leg id must start with 'M': {s}"))?;
        let (number, code) = rest
            .split_once('_')
            .ok_or_else(|| anyhow::anyhow!("Leg id missing '_' separator: {s}"))?;
        let ordinal: usize = number
            .parse()
            .map_err(|_| anyhow::anyhow!("Leg id has non-numeric match ordinal: {s}"))?;
        if ordinal == 0 {
            return Err(anyhow::anyhow!("Leg id match ordinal is 1-based: {s}"));
        }
        Ok(LegId {
            match_index: ordinal - 1,
            code: code.parse()?,
        })
    }
}

impl From<LegId> for String {
    fn from(id: LegId) -> String {
        id.to_string()
    }
}

impl TryFrom<String> for LegId {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// One fixture with its quoted decimal odds per selection code.
/// Immutable once a bet is created from it; the bet record owns a copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    /// Ordinal position within the bet record (0-based).
    pub index: usize,
    /// Display label, e.g. "Arsenal vs Chelsea".
    pub name: String,
    /// Quoted decimal odds. A missing code is a configuration gap, not an
    /// error; lookups default to odds of 1.0.
    pub odds: BTreeMap<SelectionCode, Decimal>,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self
            .odds
            .iter()
            .map(|(code, odds)| format!("{code}={odds}"))
            .collect();
        write!(f, "M{} {} [{}]", self.index + 1, self.name, quoted.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Stakes, outcomes, strategies
// ---------------------------------------------------------------------------

/// Stake per leg. `BTreeMap` keeps iteration deterministic and enforces at
/// most one leg per `(match index, code)` pair.
pub type StakeMap = BTreeMap<LegId, Decimal>;

/// One combination of actual (or hypothetical) results, one per match.
pub type Outcome = Vec<MatchResult>;

/// How a bet record pays out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Defensive single-market hedge: each covered outcome pays the sum of
    /// its winning legs. The optimizer's own outcome space, per-outcome nets,
    /// and guaranteed worst-case return are carried along for reconciliation.
    Single {
        outcome_space: Vec<Outcome>,
        nets: Vec<Decimal>,
        guaranteed_return: Decimal,
    },
    /// Accumulator: one selection per match; pays `stake * total_odds` only
    /// when every selection covers its match result.
    Accumulator {
        selections: Vec<SelectionCode>,
        total_odds: Decimal,
    },
}

impl Strategy {
    pub fn is_accumulator(&self) -> bool {
        matches!(self, Strategy::Accumulator { .. })
    }
}

// ---------------------------------------------------------------------------
// Stake plan (external optimizer output)
// ---------------------------------------------------------------------------

/// The stake-allocation optimizer's response, treated as already-validated
/// input. Field aliases match the optimizer's own wire names so its JSON
/// deserializes directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakePlan {
    pub stakes: StakeMap,
    #[serde(alias = "omega")]
    pub outcome_space: Vec<Outcome>,
    pub nets: Vec<Decimal>,
    #[serde(alias = "R")]
    pub guaranteed_return: Decimal,
}

// ---------------------------------------------------------------------------
// Bet lifecycle status
// ---------------------------------------------------------------------------

/// Lifecycle state of a bet record.
///
/// `calculated → placed → resolved | cashed_out`; terminal states have no
/// outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Calculated,
    Placed,
    Resolved,
    CashedOut,
}

impl BetStatus {
    /// Whether any further transition is possible from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BetStatus::Resolved | BetStatus::CashedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Calculated => "calculated",
            BetStatus::Placed => "placed",
            BetStatus::Resolved => "resolved",
            BetStatus::CashedOut => "cashed_out",
        }
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bet record
// ---------------------------------------------------------------------------

/// Aggregate root for one hedged ticket: the matches it was built from,
/// the stake per leg, the payout strategy, and its lifecycle state.
/// Owned exclusively by the lifecycle; settlement and cashout only read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub matches: Vec<Match>,
    pub stakes: StakeMap,
    pub strategy: Strategy,
    pub status: BetStatus,
    /// Whether the stake has been authorized against the bankroll.
    /// Set exactly once, at `calculated → placed`.
    pub applied_to_ledger: bool,
    pub resolved: bool,
    pub match_results: Option<Outcome>,
    pub actual_net: Option<Decimal>,
    pub cashout_amount: Option<Decimal>,
}

impl BetRecord {
    /// Create a `calculated` single-hedge record from an optimizer stake plan.
    pub fn single(matches: Vec<Match>, plan: StakePlan) -> Result<Self, HedgeError> {
        let record = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            matches,
            stakes: plan.stakes,
            strategy: Strategy::Single {
                outcome_space: plan.outcome_space,
                nets: plan.nets,
                guaranteed_return: plan.guaranteed_return,
            },
            status: BetStatus::Calculated,
            applied_to_ledger: false,
            resolved: false,
            match_results: None,
            actual_net: None,
            cashout_amount: None,
        };
        record.validate_legs()?;
        Ok(record)
    }

    /// Create a `calculated` accumulator record: one selection per match,
    /// total odds multiplied across legs (missing quotes default to 1.0).
    ///
    /// The whole ticket stake is recorded on the first leg and the remaining
    /// legs carry zero, so the stake map still sums to the authorized total.
    pub fn accumulator(
        matches: Vec<Match>,
        selections: Vec<SelectionCode>,
        stake: Decimal,
    ) -> Result<Self, HedgeError> {
        if stake <= Decimal::ZERO {
            return Err(HedgeError::InvalidAmount(stake));
        }
        // A ticket needs at least one match; an empty pair of lists would
        // otherwise build a record with no legs and a dropped stake.
        if matches.is_empty() {
            return Err(HedgeError::IncompleteResults {
                expected: 1,
                got: 0,
            });
        }
        if selections.len() != matches.len() {
            return Err(HedgeError::IncompleteResults {
                expected: matches.len(),
                got: selections.len(),
            });
        }

        let mut total_odds = Decimal::ONE;
        let mut stakes = StakeMap::new();
        for (index, code) in selections.iter().enumerate() {
            total_odds *= crate::coverage::odds_for(&matches[index], *code);
            let leg_stake = if index == 0 { stake } else { Decimal::ZERO };
            stakes.insert(LegId::new(index, *code), leg_stake);
        }

        let record = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            matches,
            stakes,
            strategy: Strategy::Accumulator {
                selections,
                total_odds,
            },
            status: BetStatus::Calculated,
            applied_to_ledger: false,
            resolved: false,
            match_results: None,
            actual_net: None,
            cashout_amount: None,
        };
        record.validate_legs()?;
        Ok(record)
    }

    /// Sum of all leg stakes: the amount authorized at placement.
    pub fn total_stake(&self) -> Decimal {
        self.stakes.values().copied().sum()
    }

    /// The match a leg points at, or `InvalidLeg` if the record does not
    /// contain it (guards the leg/match parallel invariant).
    pub fn match_for(&self, leg: LegId) -> Result<&Match, HedgeError> {
        self.matches
            .get(leg.match_index)
            .ok_or(HedgeError::InvalidLeg(leg))
    }

    /// Quoted odds for a leg, defaulting to 1.0 for unquoted codes.
    pub fn odds_for_leg(&self, leg: LegId) -> Result<Decimal, HedgeError> {
        Ok(crate::coverage::odds_for(self.match_for(leg)?, leg.code))
    }

    /// Reject records whose legs reference matches the record does not own
    /// or whose stakes are negative.
    fn validate_legs(&self) -> Result<(), HedgeError> {
        for (leg, stake) in &self.stakes {
            if leg.match_index >= self.matches.len() {
                return Err(HedgeError::InvalidLeg(*leg));
            }
            if *stake < Decimal::ZERO {
                return Err(HedgeError::InvalidAmount(*stake));
            }
        }
        Ok(())
    }
}

impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.strategy.is_accumulator() {
            "accumulator"
        } else {
            "single-hedge"
        };
        write!(
            f,
            "{} {} | {} matches, {} legs, stake={} | {}",
            kind,
            self.id,
            self.matches.len(),
            self.stakes.len(),
            self.total_stake(),
            self.status,
        )
    }
}

// ---------------------------------------------------------------------------
// Settlement result
// ---------------------------------------------------------------------------

/// Financial outcome of settling or cashing out one bet record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    /// Total returned by the bookmaker (stake included for winning legs).
    pub gross_payout: Decimal,
    /// Total stake authorized at placement.
    pub total_stake: Decimal,
    /// `gross_payout - total_stake`; negative for a losing ticket.
    pub net: Decimal,
}

impl fmt::Display for SettlementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gross={} stake={} net={}",
            self.gross_payout, self.total_stake, self.net,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for HEDGEBOOK. All variants are recoverable
/// and local to a single bet-record operation; on failure the ledger and the
/// record are left unchanged.
#[derive(Debug, thiserror::Error)]
pub enum HedgeError {
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: BetStatus, to: BetStatus },

    #[error("Incomplete results: expected {expected}, got {got}")]
    IncompleteResults { expected: usize, got: usize },

    #[error("Bet is already resolved or was never placed")]
    AlreadyResolved,

    #[error("Bet is not in placed state")]
    NotPlaced,

    #[error("Operation does not match the record's strategy")]
    StrategyMismatch,

    #[error("Leg {0} does not belong to this bet record")]
    InvalidLeg(LegId),

    #[error("Bet record not found: {0}")]
    NotFound(Uuid),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
