//! Zoo Ledger - constant-product liquidity pools and rake accounting
//!
//! Operator CLI for the pools and rake ledger behind the Zoo prize-pool games.

use anyhow::Result;

use zoo_ledger::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (ZOO_* overrides may live here)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
