//! CLI Adapter
//!
//! Command-line interface for the Zoo ledger.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    AddLiquidityCmd, AffiliateFeeCmd, CliApp, Command, DirectionArg, ImpermanentLossCmd, OutputFormat,
    PoolsCmd, PositionsCmd, QuoteCmd, RakeCmd, RemoveLiquidityCmd, SimulateCmd, StatsCmd, SwapCmd,
};

use anyhow::Result;

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    commands::execute(app).await
}
