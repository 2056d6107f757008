//! Liquidity Engine
//!
//! Shared handle over the pool ledger, share registry and rake accountant.
//! Clones share state. Locks are always taken in the order
//! ledger -> registry -> rake so concurrent callers cannot deadlock.

use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::affiliate::AffiliateConfig;
use crate::domain::pool::{
    LiquidityAdded, LiquidityPool, LiquidityRemoved, PoolAnalytics, PoolError, SwapDirection, SwapQuote,
};
use crate::domain::positions::{LiquidityPosition, ShareRegistry};
use crate::domain::rake::{DistributionSplit, RakeCategory, RakeError, RakeRecord};
use crate::ports::Clock;

use super::pool_ledger::PoolLedger;
use super::rake_accountant::{RakeAccountant, RakeStats, RealtimeMetrics, WindowStats};
use super::simulator::SimulationParams;
use super::snapshot::{EngineSnapshot, SNAPSHOT_VERSION};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Rake(#[from] RakeError),
}

/// Result of an executed swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub pool_id: String,
    pub quote: SwapQuote,
    /// Platform rake assessed on `amount_in`
    pub rake: Decimal,
}

#[derive(Clone)]
pub struct Engine {
    ledger: Arc<RwLock<PoolLedger>>,
    registry: Arc<RwLock<ShareRegistry>>,
    rake: Arc<RwLock<RakeAccountant>>,
    clock: Arc<dyn Clock>,
    affiliate: AffiliateConfig,
}

impl Engine {
    pub fn new(ledger: PoolLedger, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(ledger, ShareRegistry::new(), RakeAccountant::new(Arc::clone(&clock)), clock)
    }

    fn from_parts(ledger: PoolLedger, registry: ShareRegistry, rake: RakeAccountant, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            registry: Arc::new(RwLock::new(registry)),
            rake: Arc::new(RwLock::new(rake)),
            clock,
            affiliate: AffiliateConfig::default(),
        }
    }

    pub fn with_affiliate(mut self, affiliate: AffiliateConfig) -> Self {
        self.affiliate = affiliate;
        self
    }

    /// Restore an engine from a snapshot. Every position must reference a
    /// pool present in the snapshot.
    pub fn from_snapshot(snapshot: EngineSnapshot, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        let ledger = PoolLedger::from_pools(snapshot.pools)?;
        for balance in &snapshot.positions {
            ledger.pool(&balance.pool_id)?;
        }
        let registry = ShareRegistry::from_balances(snapshot.positions);
        let rake = RakeAccountant::with_records(Arc::clone(&clock), snapshot.rake_records)?;

        tracing::info!(
            "Engine restored: {} pools, {} rake records (saved {})",
            ledger.len(),
            rake.len(),
            snapshot.saved_at
        );
        Ok(Self::from_parts(ledger, registry, rake, clock))
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        let ledger = self.ledger.read().await;
        let registry = self.registry.read().await;
        let rake = self.rake.read().await;

        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: self.clock.now(),
            pools: ledger.pools().cloned().collect(),
            positions: registry.balances(),
            rake_records: rake.records().to_vec(),
        }
    }

    // ---- pools ----

    pub async fn create_pool(&self, pool: LiquidityPool) -> Result<(), EngineError> {
        Ok(self.ledger.write().await.create_pool(pool)?)
    }

    pub async fn pools(&self) -> Vec<LiquidityPool> {
        self.ledger.read().await.pools().cloned().collect()
    }

    pub async fn pool(&self, pool_id: &str) -> Result<LiquidityPool, EngineError> {
        Ok(self.ledger.read().await.pool(pool_id)?.clone())
    }

    /// Deposit on behalf of `account`, crediting it with the minted shares
    pub async fn deposit(&self, account: &str, pool_id: &str, amount_a: f64, amount_b: f64) -> Result<LiquidityAdded, EngineError> {
        let mut ledger = self.ledger.write().await;
        let mut registry = self.registry.write().await;

        let added = ledger.add_liquidity(pool_id, amount_a, amount_b)?;
        registry.credit(account, pool_id, added.shares_issued);
        Ok(added)
    }

    /// Burn `shares` held by `account`. Fails without touching the pool
    /// when the account holds fewer shares.
    pub async fn withdraw(&self, account: &str, pool_id: &str, shares: f64) -> Result<LiquidityRemoved, EngineError> {
        let mut ledger = self.ledger.write().await;
        let mut registry = self.registry.write().await;

        ledger.pool(pool_id)?;
        registry.ensure_available(account, pool_id, shares)?;
        let removed = ledger.remove_liquidity(pool_id, shares)?;
        registry.debit(account, pool_id, shares)?;
        Ok(removed)
    }

    pub async fn positions(&self, account: &str) -> Vec<LiquidityPosition> {
        let ledger = self.ledger.read().await;
        let registry = self.registry.read().await;
        registry.positions_of(account, ledger.pools())
    }

    pub async fn quote_swap(&self, pool_id: &str, amount_in: f64, direction: SwapDirection) -> Result<SwapQuote, EngineError> {
        Ok(self.ledger.read().await.quote_swap(pool_id, amount_in, direction)?)
    }

    /// Execute a swap and assess swap rake on the input amount
    pub async fn swap(&self, account: &str, pool_id: &str, amount_in: f64, direction: SwapDirection) -> Result<SwapReceipt, EngineError> {
        let trade_amount = Decimal::from_f64(amount_in)
            .ok_or_else(|| PoolError::InvalidAmount(format!("amount_in not representable: {}", amount_in)))?;

        let mut ledger = self.ledger.write().await;
        let mut rake = self.rake.write().await;

        // checked up front so a rejected rake leaves the pool untouched
        rake.rake_for(RakeCategory::Swap, trade_amount)?;
        let quote = ledger.apply_swap(pool_id, amount_in, direction)?;
        let rake_amount = rake.assess(RakeCategory::Swap, trade_amount, account)?;

        Ok(SwapReceipt {
            pool_id: pool_id.to_string(),
            quote,
            rake: rake_amount,
        })
    }

    pub async fn annualized_yield(&self, pool_id: &str) -> Result<f64, EngineError> {
        Ok(self.ledger.read().await.annualized_yield(pool_id)?)
    }

    pub async fn analytics(&self, pool_id: &str) -> Result<PoolAnalytics, EngineError> {
        Ok(self.ledger.read().await.analytics(pool_id)?)
    }

    /// One step of simulated market activity
    pub async fn simulate_tick<R: Rng + ?Sized>(&self, rng: &mut R, params: &SimulationParams) -> usize {
        self.ledger.write().await.simulate_tick(rng, params)
    }

    // ---- rake ----

    pub async fn assess_rake(&self, category: &str, trade_amount: Decimal, source_account: &str) -> Result<Decimal, EngineError> {
        Ok(self.rake.write().await.assess_rake(category, trade_amount, source_account)?)
    }

    pub async fn stats_since(&self, window_start: chrono::DateTime<chrono::Utc>) -> WindowStats {
        self.rake.read().await.stats_since(window_start)
    }

    pub async fn rake_stats(&self) -> RakeStats {
        self.rake.read().await.rake_stats()
    }

    pub async fn top_category_by_rake(&self) -> RakeCategory {
        self.rake.read().await.top_category_by_rake()
    }

    pub async fn history(&self, category: Option<RakeCategory>, limit: usize) -> Vec<RakeRecord> {
        self.rake.read().await.history(category, limit)
    }

    pub async fn realtime_metrics(&self) -> RealtimeMetrics {
        self.rake.read().await.realtime_metrics()
    }

    pub fn distribution_split(total: Decimal) -> DistributionSplit {
        DistributionSplit::of(total)
    }

    // ---- affiliate ----

    pub fn affiliate(&self) -> &AffiliateConfig {
        &self.affiliate
    }

    pub fn affiliate_fee(&self, trade_lamports: u64) -> u64 {
        self.affiliate.fee_for(trade_lamports)
    }
}
