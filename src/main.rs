//! HEDGEBOOK: defensive sports-hedging settlement and bankroll engine.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the record store, restores the bankroll, and prints a status
//! snapshot of the bet book. Stake plans arrive from the external
//! optimizer and result feeds arrive from callers of the library API;
//! this binary only reports on the ledger they drive.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use hedgebook::config::AppConfig;
use hedgebook::engine::lifecycle::BetDesk;
use hedgebook::storage::JsonFileStore;

const BANNER: &str = r#"
 _   _ _____ ____   ____ _____ ____   ___   ___  _  __
| | | | ____|  _ \ / ___| ____| __ ) / _ \ / _ \| |/ /
| |_| |  _| | | | | |  _|  _| |  _ \| | | | | | | ' /
|  _  | |___| |_| | |_| | |___| |_) | |_| | |_| | . \
|_| |_|_____|____/ \____|_____|____/ \___/ \___/|_|\_\

  Defensive hedging :: settlement & bankroll ledger
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        initial_balance = %cfg.bankroll.initial_balance,
        cashout_factor = %cfg.cashout.factor,
        store = %cfg.storage.path,
        "HEDGEBOOK starting up"
    );

    let store = Arc::new(JsonFileStore::open(&cfg.storage.path).await?);
    let desk = BetDesk::open(store, cfg.bankroll.initial_balance, cfg.cashout.factor).await?;

    let balance = desk.balance().await;
    let all = desk.all_bets().await?;
    let placed = desk.placed_bets().await?;

    info!(
        balance = %balance,
        bets = all.len(),
        open = placed.len(),
        "Bet book restored"
    );

    for bet in &placed {
        info!(bet = %bet, "Open bet awaiting results or cashout");
    }

    println!("Bankroll: {balance}");
    println!("Bet records: {} total, {} open", all.len(), placed.len());

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hedgebook=info"));

    let json_logging = std::env::var("HEDGEBOOK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
