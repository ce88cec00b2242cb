//! HEDGEBOOK: defensive sports-hedging settlement and bankroll engine.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod coverage;
pub mod ledger;
pub mod engine;
pub mod storage;
