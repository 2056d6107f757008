//! Share Registry
//!
//! Per-account LP share balances, kept beside the pool ledger. The ledger
//! only knows total supply; this registry knows who holds it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pool::{LiquidityPool, PoolError};

/// Balances below this are treated as fully withdrawn
const DUST_SHARES: f64 = 1e-9;

/// An account's claim on one pool, valued at current reserves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub pool_id: String,
    pub account: String,
    pub token_a: String,
    pub token_b: String,
    pub shares: f64,
    /// Percentage of the pool's total supply
    pub share_pct: f64,
    pub amount_a: f64,
    pub amount_b: f64,
}

/// Flattened registry entry, used for snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareBalance {
    pub account: String,
    pub pool_id: String,
    pub shares: f64,
}

/// Shares held per (account, pool)
#[derive(Debug, Clone, Default)]
pub struct ShareRegistry {
    balances: BTreeMap<(String, String), f64>,
}

impl ShareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from snapshot entries; duplicate entries are summed
    pub fn from_balances(entries: impl IntoIterator<Item = ShareBalance>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            registry.credit(&entry.account, &entry.pool_id, entry.shares);
        }
        registry
    }

    /// Add shares to an account
    pub fn credit(&mut self, account: &str, pool_id: &str, shares: f64) {
        if shares <= 0.0 {
            return;
        }
        *self
            .balances
            .entry((account.to_string(), pool_id.to_string()))
            .or_insert(0.0) += shares;
    }

    /// Check that `account` can give up `shares` without changing anything
    pub fn ensure_available(&self, account: &str, pool_id: &str, shares: f64) -> Result<(), PoolError> {
        let available = self.shares_of(account, pool_id);
        if shares > available {
            return Err(PoolError::InsufficientShares {
                requested: shares,
                available,
            });
        }
        Ok(())
    }

    /// Remove shares from an account
    pub fn debit(&mut self, account: &str, pool_id: &str, shares: f64) -> Result<(), PoolError> {
        self.ensure_available(account, pool_id, shares)?;

        let key = (account.to_string(), pool_id.to_string());
        if let Some(balance) = self.balances.get_mut(&key) {
            *balance -= shares;
            if *balance < DUST_SHARES {
                self.balances.remove(&key);
            }
        }
        Ok(())
    }

    pub fn shares_of(&self, account: &str, pool_id: &str) -> f64 {
        self.balances
            .get(&(account.to_string(), pool_id.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of all holders' shares in a pool
    pub fn total_held(&self, pool_id: &str) -> f64 {
        self.balances
            .iter()
            .filter(|((_, pool), _)| pool == pool_id)
            .map(|(_, shares)| shares)
            .sum()
    }

    /// Value every position held by `account` against the given pools
    pub fn positions_of<'a>(
        &self,
        account: &str,
        pools: impl IntoIterator<Item = &'a LiquidityPool>,
    ) -> Vec<LiquidityPosition> {
        pools
            .into_iter()
            .filter_map(|pool| {
                let shares = self.shares_of(account, &pool.id);
                if shares <= 0.0 {
                    return None;
                }
                let value = pool.redeemable(shares);
                let share_pct = if pool.total_shares > 0.0 {
                    shares / pool.total_shares * 100.0
                } else {
                    0.0
                };
                Some(LiquidityPosition {
                    pool_id: pool.id.clone(),
                    account: account.to_string(),
                    token_a: pool.token_a.clone(),
                    token_b: pool.token_b.clone(),
                    shares,
                    share_pct,
                    amount_a: value.amount_a,
                    amount_b: value.amount_b,
                })
            })
            .collect()
    }

    pub fn balances(&self) -> Vec<ShareBalance> {
        self.balances
            .iter()
            .map(|((account, pool_id), shares)| ShareBalance {
                account: account.clone(),
                pool_id: pool_id.clone(),
                shares: *shares,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
