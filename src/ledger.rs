//! Bankroll ledger.
//!
//! A single balance with three operations: `authorize` (check-then-deduct a
//! stake), `credit` (add a realized payout), and `set_balance` (manual
//! correction). The balance is never observed negative: `authorize` refuses
//! to deduct below zero and `set_balance` clamps. Callers hold the lifecycle
//! mutex while mutating, so the check and the deduction never interleave.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::HedgeError;

/// Default starting balance when no persisted bankroll exists.
pub const DEFAULT_INITIAL_BALANCE: Decimal = Decimal::ONE_HUNDRED;

/// The bankroll: one scalar balance plus its last-updated timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bankroll {
    balance: Decimal,
    updated_at: DateTime<Utc>,
}

impl Bankroll {
    /// Create a bankroll with the given starting balance (clamped at zero).
    pub fn new(initial: Decimal) -> Self {
        Self {
            balance: initial.max(Decimal::ZERO),
            updated_at: Utc::now(),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Deduct a stake. Fails with `InvalidAmount` for non-positive amounts
    /// and `InsufficientFunds` when the stake exceeds the balance; the
    /// balance is unchanged on failure (no partial deduction).
    pub fn authorize(&mut self, amount: Decimal) -> Result<(), HedgeError> {
        if amount <= Decimal::ZERO {
            return Err(HedgeError::InvalidAmount(amount));
        }
        if amount > self.balance {
            return Err(HedgeError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Add a realized payout or cashout amount. Credits of zero or less are
    /// ignored: only actual winnings are added, and "crediting" a loss is a
    /// caller error, not a ledger operation.
    pub fn credit(&mut self, amount: Decimal) {
        if amount <= Decimal::ZERO {
            return;
        }
        self.balance += amount;
        self.updated_at = Utc::now();
    }

    /// Unconditionally replace the balance (manual correction/import),
    /// clamped at zero. Bypasses authorize/credit bookkeeping.
    pub fn set_balance(&mut self, value: Decimal) {
        self.balance = value.max(Decimal::ZERO);
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Bankroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "balance={} (as of {})", self.balance, self.updated_at)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
