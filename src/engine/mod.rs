//! Core engine: settlement, cashout valuation, and the bet lifecycle
//! that wires them to the bankroll ledger and the record store.

pub mod cashout;
pub mod lifecycle;
pub mod settlement;
