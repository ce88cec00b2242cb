//! Bet lifecycle.
//!
//! The state machine `calculated → placed → resolved | cashed_out` and the
//! only place that moves money: placement authorizes the total stake against
//! the bankroll exactly once, and the terminal transition credits the GROSS
//! payout or cashout amount (the stake was already deducted; crediting a
//! net-of-stake figure on top would drain or inflate the bankroll).
//!
//! Every transition runs entirely inside one critical section: the record is
//! loaded and its state gate checked under the same mutex that guards the
//! bankroll, so two racing calls cannot both observe the pre-transition
//! status. Transitions are durable before they are reported: the record and
//! the bankroll are written to the store first, and the in-memory state is
//! committed only after those writes succeed. On any failure the caller sees
//! a typed error and nothing has changed.

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{cashout, settlement};
use crate::engine::cashout::CashoutScenario;
use crate::ledger::Bankroll;
use crate::storage::{RecordStore, BANKROLL, BANKROLL_KEY, BETS};
use crate::types::{
    BetRecord, BetStatus, HedgeError, Match, MatchResult, SelectionCode, SettlementResult,
    StakePlan, Strategy,
};

/// The bet desk: owns the bankroll and mediates every bet-record mutation.
///
/// All state transitions are serialized behind one mutex, load through
/// persist, so a record's status check can never interleave with another
/// transition on the same record and `authorize` runs at most once per
/// record. Settlement and valuation stay pure and lock-free.
pub struct BetDesk {
    store: Arc<dyn RecordStore>,
    bankroll: Mutex<Bankroll>,
    cashout_factor: Decimal,
}

impl BetDesk {
    /// Open the desk: restore the bankroll from the store, or seed it with
    /// the initial balance and persist that seed.
    pub async fn open(
        store: Arc<dyn RecordStore>,
        initial_balance: Decimal,
        cashout_factor: Decimal,
    ) -> Result<Self, HedgeError> {
        let bankroll = match store.get(BANKROLL, BANKROLL_KEY).await? {
            Some(value) => {
                let bankroll: Bankroll =
                    serde_json::from_value(value).map_err(crate::storage::StoreError::from)?;
                info!(balance = %bankroll.balance(), "Bankroll restored");
                bankroll
            }
            None => {
                let bankroll = Bankroll::new(initial_balance);
                store
                    .put(BANKROLL, BANKROLL_KEY, to_value(&bankroll)?)
                    .await?;
                info!(balance = %bankroll.balance(), "Bankroll seeded");
                bankroll
            }
        };

        Ok(Self {
            store,
            bankroll: Mutex::new(bankroll),
            cashout_factor,
        })
    }

    /// Current bankroll balance.
    pub async fn balance(&self) -> Decimal {
        self.bankroll.lock().await.balance()
    }

    /// Manual balance correction (import/fix-up); clamped at zero and
    /// persisted before the in-memory value changes.
    pub async fn set_balance(&self, value: Decimal) -> Result<Decimal, HedgeError> {
        let mut guard = self.bankroll.lock().await;
        let mut next = guard.clone();
        next.set_balance(value);
        self.store
            .put(BANKROLL, BANKROLL_KEY, to_value(&next)?)
            .await?;
        *guard = next;
        info!(balance = %guard.balance(), "Balance set manually");
        Ok(guard.balance())
    }

    // -- Creation ----------------------------------------------------------

    /// Stage a single-hedge record from an optimizer stake plan. No money
    /// moves until placement.
    pub async fn create_single(
        &self,
        matches: Vec<Match>,
        plan: StakePlan,
    ) -> Result<BetRecord, HedgeError> {
        let record = BetRecord::single(matches, plan)?;
        self.store
            .put(BETS, &record.id.to_string(), to_value(&record)?)
            .await?;
        info!(bet = %record.id, stake = %record.total_stake(), "Single-hedge bet calculated");
        Ok(record)
    }

    /// Stage an accumulator record: one selection per match, odds multiplied.
    pub async fn create_accumulator(
        &self,
        matches: Vec<Match>,
        selections: Vec<SelectionCode>,
        stake: Decimal,
    ) -> Result<BetRecord, HedgeError> {
        let record = BetRecord::accumulator(matches, selections, stake)?;
        self.store
            .put(BETS, &record.id.to_string(), to_value(&record)?)
            .await?;
        info!(bet = %record.id, stake = %record.total_stake(), "Accumulator bet calculated");
        Ok(record)
    }

    // -- Transitions ---------------------------------------------------------

    /// `calculated → placed`: authorize the total stake against the bankroll,
    /// exactly once per record.
    pub async fn place(&self, id: Uuid) -> Result<BetRecord, HedgeError> {
        // Load and gate under the ledger lock: a racing placement of the
        // same record must see `placed`, not a stale `calculated` snapshot.
        let mut guard = self.bankroll.lock().await;
        let record = self.load(id).await?;
        if record.status != BetStatus::Calculated || record.applied_to_ledger {
            return Err(HedgeError::InvalidTransition {
                from: record.status,
                to: BetStatus::Placed,
            });
        }

        let total_stake = record.total_stake();
        if record.stakes.is_empty() || total_stake <= Decimal::ZERO {
            return Err(HedgeError::InvalidAmount(total_stake));
        }

        let mut next_bankroll = guard.clone();
        next_bankroll.authorize(total_stake)?;

        let mut placed = record;
        placed.status = BetStatus::Placed;
        placed.applied_to_ledger = true;

        self.persist(&placed, &next_bankroll).await?;
        *guard = next_bankroll;

        info!(
            bet = %placed.id,
            stake = %total_stake,
            balance = %guard.balance(),
            "Bet placed"
        );
        Ok(placed)
    }

    /// `placed → resolved`: settle against real results and credit the gross
    /// payout.
    pub async fn resolve_with_results(
        &self,
        id: Uuid,
        results: Vec<MatchResult>,
    ) -> Result<SettlementResult, HedgeError> {
        let mut guard = self.bankroll.lock().await;
        let record = self.load(id).await?;
        let outcome = settlement::settle(&record, &results)?;
        self.reconcile_against_plan(&record, &results, &outcome);

        let mut resolved = record;
        resolved.status = BetStatus::Resolved;
        resolved.resolved = true;
        resolved.match_results = Some(results);
        resolved.actual_net = Some(outcome.net);

        let mut next_bankroll = guard.clone();
        // Gross payout only: the stake was deducted at placement. A losing
        // ticket credits nothing (credit ignores zero).
        next_bankroll.credit(outcome.gross_payout);

        self.persist(&resolved, &next_bankroll).await?;
        *guard = next_bankroll;

        info!(
            bet = %resolved.id,
            gross = %outcome.gross_payout,
            net = %outcome.net,
            balance = %guard.balance(),
            "Bet resolved"
        );
        Ok(outcome)
    }

    /// Price a cashout scenario against a placed record. Pure read; returns
    /// `None` for custom scenarios where the caller supplies the amount.
    pub async fn value_cashout_scenario(
        &self,
        id: Uuid,
        scenario: &CashoutScenario,
    ) -> Result<Option<Decimal>, HedgeError> {
        let record = self.load(id).await?;
        if record.status != BetStatus::Placed {
            return Err(HedgeError::NotPlaced);
        }
        cashout::value_scenario(&record, scenario, self.cashout_factor)
    }

    /// `placed → cashed_out`: realize a confirmed cashout amount and credit
    /// it to the bankroll.
    pub async fn execute_cashout(
        &self,
        id: Uuid,
        cashout_amount: Decimal,
    ) -> Result<SettlementResult, HedgeError> {
        let mut guard = self.bankroll.lock().await;
        let record = self.load(id).await?;
        let outcome = cashout::execute_cashout(&record, cashout_amount)?;

        let mut cashed = record;
        cashed.status = BetStatus::CashedOut;
        cashed.resolved = true;
        cashed.cashout_amount = Some(cashout_amount);
        cashed.actual_net = Some(outcome.net);

        let mut next_bankroll = guard.clone();
        next_bankroll.credit(cashout_amount);

        self.persist(&cashed, &next_bankroll).await?;
        *guard = next_bankroll;

        info!(
            bet = %cashed.id,
            amount = %cashout_amount,
            net = %outcome.net,
            balance = %guard.balance(),
            "Bet cashed out"
        );
        Ok(outcome)
    }

    // -- Read accessors ------------------------------------------------------

    /// Fetch one bet record by id.
    pub async fn bet(&self, id: Uuid) -> Result<BetRecord, HedgeError> {
        self.load(id).await
    }

    /// All records currently in `placed` state.
    pub async fn placed_bets(&self) -> Result<Vec<BetRecord>, HedgeError> {
        let values = self
            .store
            .query_by_index(BETS, "status", BetStatus::Placed.as_str())
            .await?;
        values
            .into_iter()
            .map(|v| {
                serde_json::from_value(v)
                    .map_err(crate::storage::StoreError::from)
                    .map_err(HedgeError::from)
            })
            .collect()
    }

    /// All bet records, any state.
    pub async fn all_bets(&self) -> Result<Vec<BetRecord>, HedgeError> {
        let values = self.store.get_all(BETS).await?;
        values
            .into_iter()
            .map(|v| {
                serde_json::from_value(v)
                    .map_err(crate::storage::StoreError::from)
                    .map_err(HedgeError::from)
            })
            .collect()
    }

    // -- Internals -----------------------------------------------------------

    async fn load(&self, id: Uuid) -> Result<BetRecord, HedgeError> {
        let value = self
            .store
            .get(BETS, &id.to_string())
            .await?
            .ok_or(HedgeError::NotFound(id))?;
        let record: BetRecord =
            serde_json::from_value(value).map_err(crate::storage::StoreError::from)?;
        Ok(record)
    }

    /// Write the record then the bankroll. The in-memory bankroll is only
    /// committed by the caller after this returns Ok, so a failed write
    /// leaves the engine state unchanged and the caller free to retry the
    /// whole transition.
    async fn persist(&self, record: &BetRecord, bankroll: &Bankroll) -> Result<(), HedgeError> {
        self.store
            .put(BETS, &record.id.to_string(), to_value(record)?)
            .await?;
        self.store
            .put(BANKROLL, BANKROLL_KEY, to_value(bankroll)?)
            .await?;
        Ok(())
    }

    /// Cross-check a settlement against the optimizer-declared net for the
    /// same outcome, when the plan covered it. A mismatch means the stored
    /// plan and the live odds disagree; the settlement stands, the plan
    /// figure is advisory.
    fn reconcile_against_plan(
        &self,
        record: &BetRecord,
        results: &[MatchResult],
        outcome: &SettlementResult,
    ) {
        if let Strategy::Single {
            outcome_space,
            nets,
            ..
        } = &record.strategy
        {
            let declared = outcome_space
                .iter()
                .position(|o| o.as_slice() == results)
                .and_then(|idx| nets.get(idx));
            if let Some(declared_net) = declared {
                if *declared_net != outcome.net {
                    warn!(
                        bet = %record.id,
                        declared = %declared_net,
                        settled = %outcome.net,
                        "Settled net differs from optimizer-declared net"
                    );
                }
            }
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, HedgeError> {
    serde_json::to_value(value)
        .map_err(crate::storage::StoreError::from)
        .map_err(HedgeError::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
