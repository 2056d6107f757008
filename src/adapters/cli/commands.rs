//! CLI Command Handlers
//!
//! Implementation of all `zoo-ledger` commands. Each invocation loads the
//! config, restores state from the snapshot file if one is configured, runs
//! one command and writes state back when the command changed it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::application::{
    Engine, EngineSnapshot, MarketSimulator, PoolLedger, SimulationParams, DEFAULT_HISTORY_LIMIT,
};
use crate::config::{load_config, Config};
use crate::domain::{AffiliateConfig, RakeCategory, SwapDirection};
use crate::ports::SystemClock;

/// Zoo Ledger - liquidity pools and rake accounting
#[derive(Parser, Debug)]
#[command(
    name = "zoo-ledger",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Constant-product liquidity pools and rake accounting",
    long_about = "Zoo Ledger runs the constant-product pools and rake ledger behind the Zoo \
                  prize-pool games: deposits, withdrawals, swap quotes, rake assessment and \
                  distribution statistics."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Snapshot file to load state from and save state to
    #[arg(long, value_name = "FILE", global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Swap direction as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Sell token A for token B
    AToB,
    /// Sell token B for token A
    BToA,
}

impl From<DirectionArg> for SwapDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::AToB => SwapDirection::AToB,
            DirectionArg::BToA => SwapDirection::BToA,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List pools with analytics
    Pools(PoolsCmd),

    /// Quote a swap without executing it
    Quote(QuoteCmd),

    /// Execute a swap and assess swap rake
    Swap(SwapCmd),

    /// Deposit both tokens into a pool
    AddLiquidity(AddLiquidityCmd),

    /// Burn LP shares for the underlying tokens
    RemoveLiquidity(RemoveLiquidityCmd),

    /// Show an account's LP positions
    Positions(PositionsCmd),

    /// Impermanent loss between two price ratios
    ImpermanentLoss(ImpermanentLossCmd),

    /// Assess rake on a settled trade
    Rake(RakeCmd),

    /// Rake statistics and history
    Stats(StatsCmd),

    /// Affiliate fee for a routed trade
    AffiliateFee(AffiliateFeeCmd),

    /// Run simulated market activity
    Simulate(SimulateCmd),
}

#[derive(Parser, Debug)]
pub struct PoolsCmd {
    /// Only show this pool
    #[arg(value_name = "POOL")]
    pub pool_id: Option<String>,
}

#[derive(Parser, Debug)]
pub struct QuoteCmd {
    #[arg(value_name = "POOL")]
    pub pool_id: String,

    /// Amount of the input token
    #[arg(value_name = "AMOUNT")]
    pub amount: f64,

    #[arg(short, long, value_enum, default_value = "a-to-b")]
    pub direction: DirectionArg,
}

#[derive(Parser, Debug)]
pub struct SwapCmd {
    #[arg(value_name = "POOL")]
    pub pool_id: String,

    /// Amount of the input token
    #[arg(value_name = "AMOUNT")]
    pub amount: f64,

    #[arg(short, long, value_enum, default_value = "a-to-b")]
    pub direction: DirectionArg,

    /// Account the swap rake is charged to
    #[arg(short, long, default_value = "operator")]
    pub account: String,
}

#[derive(Parser, Debug)]
pub struct AddLiquidityCmd {
    #[arg(value_name = "POOL")]
    pub pool_id: String,

    #[arg(value_name = "AMOUNT_A")]
    pub amount_a: f64,

    #[arg(value_name = "AMOUNT_B")]
    pub amount_b: f64,

    /// Account credited with the minted shares
    #[arg(short, long, default_value = "operator")]
    pub account: String,
}

#[derive(Parser, Debug)]
pub struct RemoveLiquidityCmd {
    #[arg(value_name = "POOL")]
    pub pool_id: String,

    #[arg(value_name = "SHARES")]
    pub shares: f64,

    #[arg(short, long, default_value = "operator")]
    pub account: String,
}

#[derive(Parser, Debug)]
pub struct PositionsCmd {
    #[arg(value_name = "ACCOUNT", default_value = "operator")]
    pub account: String,
}

#[derive(Parser, Debug)]
pub struct ImpermanentLossCmd {
    /// Price ratio when liquidity was added
    #[arg(value_name = "INITIAL")]
    pub initial: f64,

    /// Current price ratio
    #[arg(value_name = "CURRENT")]
    pub current: f64,
}

#[derive(Parser, Debug)]
pub struct RakeCmd {
    /// chess, poker, trading or swap
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// Settled trade amount
    #[arg(value_name = "AMOUNT")]
    pub amount: Decimal,

    #[arg(short, long, default_value = "operator")]
    pub account: String,
}

#[derive(Parser, Debug)]
pub struct StatsCmd {
    /// Show rake history instead of aggregate statistics
    #[arg(long)]
    pub history: bool,

    /// Show last-hour metrics
    #[arg(long, conflicts_with = "history")]
    pub realtime: bool,

    /// Filter history to one category
    #[arg(long, value_name = "CATEGORY", requires = "history")]
    pub category: Option<RakeCategory>,

    /// Maximum history entries
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: usize,
}

#[derive(Parser, Debug)]
pub struct AffiliateFeeCmd {
    /// Trade size in lamports
    #[arg(value_name = "LAMPORTS")]
    pub lamports: u64,
}

#[derive(Parser, Debug)]
pub struct SimulateCmd {
    /// Number of ticks to run
    #[arg(short, long, default_value_t = 10)]
    pub ticks: u64,

    /// Override the configured RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the configured tick interval, in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config = load_config(&app.config)
        .with_context(|| format!("Failed to load configuration from {}", app.config.display()))?;
    init_logging(app.verbose, app.debug, &config.logging.get_level())?;

    let state_path = app.state.clone().or_else(|| config.state.get_path());
    let engine = build_engine(&config, state_path.as_deref())?;
    let format = app.format;

    let mutated = match app.command {
        Command::Pools(cmd) => pools_command(&engine, cmd, format).await?,
        Command::Quote(cmd) => quote_command(&engine, cmd, format).await?,
        Command::Swap(cmd) => swap_command(&engine, cmd, format).await?,
        Command::AddLiquidity(cmd) => add_liquidity_command(&engine, cmd, format).await?,
        Command::RemoveLiquidity(cmd) => remove_liquidity_command(&engine, cmd, format).await?,
        Command::Positions(cmd) => positions_command(&engine, cmd, format).await?,
        Command::ImpermanentLoss(cmd) => impermanent_loss_command(cmd, format)?,
        Command::Rake(cmd) => rake_command(&engine, cmd, format).await?,
        Command::Stats(cmd) => stats_command(&engine, cmd, format).await?,
        Command::AffiliateFee(cmd) => affiliate_fee_command(&engine, cmd, format)?,
        Command::Simulate(cmd) => simulate_command(&engine, &config, cmd, format).await?,
    };

    if mutated {
        if let Some(path) = state_path {
            engine
                .snapshot()
                .await
                .save(&path)
                .with_context(|| format!("Failed to save state to {}", path.display()))?;
        }
    }
    Ok(())
}

/// Initialize logging system. RUST_LOG wins, then the flags, then the config level.
fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Restore from the snapshot if present, otherwise seed from config
fn build_engine(config: &Config, state_path: Option<&Path>) -> Result<Engine> {
    let clock = Arc::new(SystemClock);
    let snapshot = match state_path {
        Some(path) => EngineSnapshot::load(path)
            .with_context(|| format!("Failed to load state from {}", path.display()))?,
        None => None,
    };

    let engine = match snapshot {
        Some(snapshot) => Engine::from_snapshot(snapshot, clock).context("Snapshot is inconsistent")?,
        None => {
            let ledger = PoolLedger::from_pools(config.seed_pools()).context("Invalid seed pools")?;
            Engine::new(ledger, clock)
        }
    };
    Ok(engine.with_affiliate(AffiliateConfig::from(&config.affiliate)))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn pools_command(engine: &Engine, cmd: PoolsCmd, format: OutputFormat) -> Result<bool> {
    let pools = match cmd.pool_id {
        Some(id) => vec![engine.pool(&id).await?],
        None => engine.pools().await,
    };

    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct PoolView<'a> {
                #[serde(flatten)]
                pool: &'a crate::domain::LiquidityPool,
                analytics: crate::domain::PoolAnalytics,
            }
            let views: Vec<PoolView> = pools
                .iter()
                .map(|pool| PoolView {
                    pool,
                    analytics: pool.analytics(),
                })
                .collect();
            print_json(&views)?;
        }
        OutputFormat::Text => {
            if pools.is_empty() {
                println!("No pools configured");
            }
            for pool in &pools {
                let analytics = pool.analytics();
                println!("{}", pool);
                println!(
                    "  TVL {:.2} | 24h volume {:.2} | 7d fees {:.2} | APY {:.2}% | ~{} tx, ~{} users",
                    analytics.tvl,
                    pool.volume_24h,
                    analytics.fees_7d,
                    analytics.apy,
                    analytics.transactions_24h,
                    analytics.unique_users_24h
                );
            }
        }
    }
    Ok(false)
}

async fn quote_command(engine: &Engine, cmd: QuoteCmd, format: OutputFormat) -> Result<bool> {
    let quote = engine.quote_swap(&cmd.pool_id, cmd.amount, cmd.direction.into()).await?;
    match format {
        OutputFormat::Json => print_json(&quote)?,
        OutputFormat::Text => {
            println!("Quote on {} ({})", cmd.pool_id, quote.direction);
            println!("  In:     {}", quote.amount_in);
            println!("  Out:    {:.6}", quote.amount_out);
            println!("  Impact: {:.4}%", quote.price_impact_pct);
        }
    }
    Ok(false)
}

async fn swap_command(engine: &Engine, cmd: SwapCmd, format: OutputFormat) -> Result<bool> {
    let receipt = engine
        .swap(&cmd.account, &cmd.pool_id, cmd.amount, cmd.direction.into())
        .await?;
    match format {
        OutputFormat::Json => print_json(&receipt)?,
        OutputFormat::Text => {
            println!("Swapped on {} ({})", receipt.pool_id, receipt.quote.direction);
            println!("  In:     {}", receipt.quote.amount_in);
            println!("  Out:    {:.6}", receipt.quote.amount_out);
            println!("  Impact: {:.4}%", receipt.quote.price_impact_pct);
            println!("  Rake:   {} (charged to {})", receipt.rake, cmd.account);
        }
    }
    Ok(true)
}

async fn add_liquidity_command(engine: &Engine, cmd: AddLiquidityCmd, format: OutputFormat) -> Result<bool> {
    let added = engine
        .deposit(&cmd.account, &cmd.pool_id, cmd.amount_a, cmd.amount_b)
        .await?;
    match format {
        OutputFormat::Json => print_json(&added)?,
        OutputFormat::Text => {
            println!("Added liquidity to {} for {}", cmd.pool_id, cmd.account);
            println!("  Shares: {:.6}", added.shares_issued);
            println!("  Impact: {:.4}%", added.price_impact_pct);
            if added.shares_issued == 0.0 {
                println!("  Warning: deposit minted no shares");
            }
        }
    }
    Ok(true)
}

async fn remove_liquidity_command(engine: &Engine, cmd: RemoveLiquidityCmd, format: OutputFormat) -> Result<bool> {
    let removed = engine.withdraw(&cmd.account, &cmd.pool_id, cmd.shares).await?;
    match format {
        OutputFormat::Json => print_json(&removed)?,
        OutputFormat::Text => {
            let pool = engine.pool(&cmd.pool_id).await?;
            println!("Removed {} shares from {}", cmd.shares, cmd.pool_id);
            println!("  {:.6} {}", removed.amount_a, pool.token_a);
            println!("  {:.6} {}", removed.amount_b, pool.token_b);
        }
    }
    Ok(true)
}

async fn positions_command(engine: &Engine, cmd: PositionsCmd, format: OutputFormat) -> Result<bool> {
    let positions = engine.positions(&cmd.account).await;
    match format {
        OutputFormat::Json => print_json(&positions)?,
        OutputFormat::Text => {
            if positions.is_empty() {
                println!("{} holds no liquidity", cmd.account);
            }
            for p in &positions {
                println!(
                    "{}: {:.6} shares ({:.4}%) = {:.6} {} + {:.6} {}",
                    p.pool_id, p.shares, p.share_pct, p.amount_a, p.token_a, p.amount_b, p.token_b
                );
            }
        }
    }
    Ok(false)
}

fn impermanent_loss_command(cmd: ImpermanentLossCmd, format: OutputFormat) -> Result<bool> {
    let loss = PoolLedger::impermanent_loss(cmd.initial, cmd.current)?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "initial_price_ratio": cmd.initial,
            "current_price_ratio": cmd.current,
            "impermanent_loss_pct": loss,
        }))?,
        OutputFormat::Text => println!("Impermanent loss: {:.4}%", loss),
    }
    Ok(false)
}

async fn rake_command(engine: &Engine, cmd: RakeCmd, format: OutputFormat) -> Result<bool> {
    let rake = engine.assess_rake(&cmd.category, cmd.amount, &cmd.account).await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "category": cmd.category.trim().to_ascii_lowercase(),
            "trade_amount": cmd.amount,
            "rake": rake,
        }))?,
        OutputFormat::Text => println!("Rake on {} {}: {}", cmd.category, cmd.amount, rake),
    }
    Ok(true)
}

async fn stats_command(engine: &Engine, cmd: StatsCmd, format: OutputFormat) -> Result<bool> {
    if cmd.history {
        let records = engine.history(cmd.category, cmd.limit).await;
        match format {
            OutputFormat::Json => print_json(&records)?,
            OutputFormat::Text => {
                for r in &records {
                    println!(
                        "{}  {:<8} {:>16}  {}  {}",
                        r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        r.category,
                        r.amount,
                        r.source_account,
                        r.transaction_id
                    );
                }
            }
        }
        return Ok(false);
    }

    if cmd.realtime {
        let metrics = engine.realtime_metrics().await;
        match format {
            OutputFormat::Json => print_json(&metrics)?,
            OutputFormat::Text => {
                println!("Last hour:       {} ({} records)", metrics.last_hour.total_collected, metrics.last_hour.record_count);
                println!("Rake/second:     {}", metrics.rake_per_second.round_dp(9));
                println!("Projected daily: {}", metrics.projected_daily);
                println!("Top category:    {}", metrics.top_category);
            }
        }
        return Ok(false);
    }

    let stats = engine.rake_stats().await;
    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Text => {
            println!("Total collected: {}", stats.total_collected);
            println!("  24h: {} ({} records)", stats.daily.total_collected, stats.daily.record_count);
            println!("  7d:  {} ({} records)", stats.weekly.total_collected, stats.weekly.record_count);
            println!("  30d: {} ({} records)", stats.monthly.total_collected, stats.monthly.record_count);
            println!("By category (top: {}):", stats.top_category);
            for entry in &stats.by_category {
                println!("  {:<8} {}", entry.category, entry.total);
            }
            println!("Distribution:");
            println!("  Prize pool:  {}", stats.distribution.prize_pool);
            println!("  Development: {}", stats.distribution.development);
            println!("  Operations:  {}", stats.distribution.operations);
            println!("  Affiliate:   {}", stats.distribution.affiliate);
        }
    }
    Ok(false)
}

fn affiliate_fee_command(engine: &Engine, cmd: AffiliateFeeCmd, format: OutputFormat) -> Result<bool> {
    let fee = engine.affiliate_fee(cmd.lamports);
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "trade_lamports": cmd.lamports,
            "fee_lamports": fee,
            "fee_bps": engine.affiliate().fee_bps,
        }))?,
        OutputFormat::Text => println!(
            "Affiliate fee on {} lamports: {} lamports ({} bps)",
            cmd.lamports,
            fee,
            engine.affiliate().fee_bps
        ),
    }
    Ok(false)
}

async fn simulate_command(engine: &Engine, config: &Config, cmd: SimulateCmd, format: OutputFormat) -> Result<bool> {
    let seed = cmd.seed.unwrap_or(config.simulation.seed);
    let interval = cmd
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.simulation.tick_interval());

    let simulator = MarketSimulator::new(engine.clone(), SimulationParams::from(&config.simulation), seed)
        .with_tick_interval(interval);

    // Setup Ctrl+C handler
    let sim = simulator.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        sim.stop().await;
    });

    simulator.run(Some(cmd.ticks)).await;

    match format {
        OutputFormat::Json => print_json(&engine.pools().await)?,
        OutputFormat::Text => {
            println!("Ran {} ticks (seed {})", simulator.ticks().await, seed);
            for pool in engine.pools().await {
                println!("  {}", pool);
            }
        }
    }
    Ok(true)
}
