//! Pool Ledger
//!
//! Authoritative in-memory record of every liquidity pool. Owned by the
//! caller (usually through `Engine`); nothing here runs on its own.

use rand::Rng;
use std::collections::BTreeMap;

use crate::domain::pool::{
    LiquidityAdded, LiquidityPool, LiquidityRemoved, PoolAnalytics, PoolError, SwapDirection, SwapQuote,
};
use crate::domain::pool_math;

use super::simulator::SimulationParams;

/// Pools keyed by id, iterated in id order
#[derive(Debug, Clone, Default)]
pub struct PoolLedger {
    pools: BTreeMap<String, LiquidityPool>,
}

impl PoolLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from seed pools, rejecting invalid or duplicate entries
    pub fn from_pools(pools: impl IntoIterator<Item = LiquidityPool>) -> Result<Self, PoolError> {
        let mut ledger = Self::new();
        for pool in pools {
            ledger.create_pool(pool)?;
        }
        Ok(ledger)
    }

    /// Register a new pool
    pub fn create_pool(&mut self, pool: LiquidityPool) -> Result<(), PoolError> {
        pool.validate()?;
        if self.pools.contains_key(&pool.id) {
            return Err(PoolError::DuplicatePool(pool.id));
        }
        tracing::info!("Pool created: {}", pool);
        self.pools.insert(pool.id.clone(), pool);
        Ok(())
    }

    pub fn pool(&self, pool_id: &str) -> Result<&LiquidityPool, PoolError> {
        self.pools
            .get(pool_id)
            .ok_or_else(|| PoolError::InvalidPool(pool_id.to_string()))
    }

    fn pool_mut(&mut self, pool_id: &str) -> Result<&mut LiquidityPool, PoolError> {
        self.pools
            .get_mut(pool_id)
            .ok_or_else(|| PoolError::InvalidPool(pool_id.to_string()))
    }

    pub fn pools(&self) -> impl Iterator<Item = &LiquidityPool> {
        self.pools.values()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn add_liquidity(&mut self, pool_id: &str, amount_a: f64, amount_b: f64) -> Result<LiquidityAdded, PoolError> {
        let pool = self.pool_mut(pool_id)?;
        let bootstrap = pool.is_drained();
        let added = pool.add_liquidity(amount_a, amount_b)?;

        tracing::info!(
            "Liquidity added to {}: {} {} + {} {} -> {:.6} shares (impact {:.4}%{})",
            pool_id,
            amount_a,
            pool.token_a,
            amount_b,
            pool.token_b,
            added.shares_issued,
            added.price_impact_pct,
            if bootstrap { ", bootstrap" } else { "" }
        );
        Ok(added)
    }

    pub fn remove_liquidity(&mut self, pool_id: &str, share_amount: f64) -> Result<LiquidityRemoved, PoolError> {
        let pool = self.pool_mut(pool_id)?;
        let removed = pool.remove_liquidity(share_amount)?;

        tracing::info!(
            "Liquidity removed from {}: {:.6} shares -> {:.6} {} + {:.6} {}",
            pool_id,
            share_amount,
            removed.amount_a,
            pool.token_a,
            removed.amount_b,
            pool.token_b
        );
        if pool.is_drained() {
            tracing::info!("Pool {} drained", pool_id);
        }
        Ok(removed)
    }

    pub fn quote_swap(&self, pool_id: &str, amount_in: f64, direction: SwapDirection) -> Result<SwapQuote, PoolError> {
        let quote = self.pool(pool_id)?.quote_swap(amount_in, direction)?;
        tracing::debug!(
            "Quote {} {} {}: out {:.6}, impact {:.4}%",
            pool_id,
            direction,
            amount_in,
            quote.amount_out,
            quote.price_impact_pct
        );
        Ok(quote)
    }

    pub fn apply_swap(&mut self, pool_id: &str, amount_in: f64, direction: SwapDirection) -> Result<SwapQuote, PoolError> {
        let pool = self.pool_mut(pool_id)?;
        let quote = pool.apply_swap(amount_in, direction)?;
        tracing::info!(
            "Swap on {} {}: {} in, {:.6} out (impact {:.4}%)",
            pool_id,
            direction,
            amount_in,
            quote.amount_out,
            quote.price_impact_pct
        );
        Ok(quote)
    }

    pub fn annualized_yield(&self, pool_id: &str) -> Result<f64, PoolError> {
        Ok(self.pool(pool_id)?.annualized_yield())
    }

    pub fn analytics(&self, pool_id: &str) -> Result<PoolAnalytics, PoolError> {
        Ok(self.pool(pool_id)?.analytics())
    }

    /// Impermanent loss in percent; `InvalidInput` when the initial ratio is zero
    pub fn impermanent_loss(initial_price_ratio: f64, current_price_ratio: f64) -> Result<f64, PoolError> {
        pool_math::impermanent_loss_pct(initial_price_ratio, current_price_ratio).ok_or_else(|| {
            PoolError::InvalidInput(format!(
                "price ratios must be positive and finite, got {} -> {}",
                initial_price_ratio, current_price_ratio
            ))
        })
    }

    /// Advance simulated market activity by one step.
    ///
    /// Each pool with reserves drifts its price by up to ±`max_price_drift / 2`
    /// and gains up to `max_volume_increment` of volume. Drained pools are
    /// left alone.
    pub fn simulate_tick<R: Rng + ?Sized>(&mut self, rng: &mut R, params: &SimulationParams) -> usize {
        let mut updated = 0;
        for pool in self.pools.values_mut() {
            if pool.reserve_a <= 0.0 || pool.reserve_b <= 0.0 {
                continue;
            }
            let drift = (rng.gen::<f64>() - 0.5) * params.max_price_drift;
            pool.reserve_a *= 1.0 + drift;
            pool.reserve_b *= 1.0 - drift;
            pool.volume_24h += rng.gen::<f64>() * params.max_volume_increment;
            updated += 1;
        }
        tracing::debug!("Market tick updated {} pools", updated);
        updated
    }

    pub fn into_pools(self) -> Vec<LiquidityPool> {
        self.pools.into_values().collect()
    }
}
