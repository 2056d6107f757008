//! Liquidity Pool
//!
//! A two-asset constant-product pool: reserves, LP share supply, fee rate
//! and a rolling 24h volume counter. Mutations keep the invariant that a
//! pool with outstanding shares always has both reserves backing them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::pool_math;

/// Errors raised by pool operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("Pool not found: {0}")]
    InvalidPool(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: f64, available: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pool {0} has no liquidity to trade against")]
    EmptyPool(String),

    #[error("Pool already exists: {0}")]
    DuplicatePool(String),
}

/// Which reserve a swap sells into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    /// Sell token A, receive token B
    AToB,
    /// Sell token B, receive token A
    BToA,
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::AToB => write!(f, "A->B"),
            SwapDirection::BToA => write!(f, "B->A"),
        }
    }
}

/// Result of adding liquidity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityAdded {
    pub shares_issued: f64,
    pub price_impact_pct: f64,
}

/// Result of removing liquidity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityRemoved {
    pub amount_a: f64,
    pub amount_b: f64,
}

/// A swap quote (also returned by an applied swap)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub amount_in: f64,
    pub amount_out: f64,
    pub price_impact_pct: f64,
    pub direction: SwapDirection,
}

/// Derived display metrics for a pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolAnalytics {
    /// Unnormalized reserve_a + reserve_b
    pub tvl: f64,
    pub volume_7d: f64,
    pub fees_7d: f64,
    pub transactions_24h: u64,
    pub unique_users_24h: u64,
    pub apy: f64,
}

/// Constant-product liquidity pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPool {
    /// Unique key, e.g. "SOL-USDC"
    pub id: String,
    /// Symbol of token A
    pub token_a: String,
    /// Symbol of token B
    pub token_b: String,
    pub reserve_a: f64,
    pub reserve_b: f64,
    /// Outstanding LP share supply
    pub total_shares: f64,
    /// Fraction of input volume charged as fee, in [0, 1)
    pub fee_rate: f64,
    /// Traded volume counter (not time-bucketed)
    pub volume_24h: f64,
}

impl LiquidityPool {
    /// Create an empty pool
    pub fn new(id: impl Into<String>, token_a: impl Into<String>, token_b: impl Into<String>, fee_rate: f64) -> Self {
        Self {
            id: id.into(),
            token_a: token_a.into(),
            token_b: token_b.into(),
            reserve_a: 0.0,
            reserve_b: 0.0,
            total_shares: 0.0,
            fee_rate,
            volume_24h: 0.0,
        }
    }

    /// Seed reserves and share supply directly
    pub fn with_reserves(mut self, reserve_a: f64, reserve_b: f64, total_shares: f64) -> Self {
        self.reserve_a = reserve_a;
        self.reserve_b = reserve_b;
        self.total_shares = total_shares;
        self
    }

    /// Seed the volume counter
    pub fn with_volume(mut self, volume_24h: f64) -> Self {
        self.volume_24h = volume_24h;
        self
    }

    /// Check the pool's static invariants
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.id.is_empty() {
            return Err(PoolError::InvalidInput("pool id cannot be empty".to_string()));
        }
        if !(0.0..1.0).contains(&self.fee_rate) {
            return Err(PoolError::InvalidInput(format!(
                "fee_rate must be in [0, 1), got {}",
                self.fee_rate
            )));
        }
        for (name, value) in [
            ("reserve_a", self.reserve_a),
            ("reserve_b", self.reserve_b),
            ("total_shares", self.total_shares),
            ("volume_24h", self.volume_24h),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PoolError::InvalidInput(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.total_shares > 0.0 && (self.reserve_a <= 0.0 || self.reserve_b <= 0.0) {
            return Err(PoolError::InvalidInput(format!(
                "pool {} has {} shares but reserves {} / {}",
                self.id, self.total_shares, self.reserve_a, self.reserve_b
            )));
        }
        Ok(())
    }

    /// True when no shares are outstanding (next deposit bootstraps)
    pub fn is_drained(&self) -> bool {
        self.total_shares <= 0.0
    }

    /// Spot price of A in units of B, if the pool has reserves
    pub fn spot_price(&self) -> Option<f64> {
        if self.reserve_a > 0.0 && self.reserve_b > 0.0 {
            Some(self.reserve_b / self.reserve_a)
        } else {
            None
        }
    }

    /// Constant-product invariant k
    pub fn k(&self) -> f64 {
        self.reserve_a * self.reserve_b
    }

    /// Deposit both assets and mint shares
    pub fn add_liquidity(&mut self, amount_a: f64, amount_b: f64) -> Result<LiquidityAdded, PoolError> {
        if !amount_a.is_finite() || !amount_b.is_finite() || amount_a < 0.0 || amount_b < 0.0 {
            return Err(PoolError::InvalidAmount(format!(
                "deposit amounts must be finite and non-negative, got {} / {}",
                amount_a, amount_b
            )));
        }
        if amount_a == 0.0 && amount_b == 0.0 {
            return Err(PoolError::InvalidAmount("deposit amounts are both zero".to_string()));
        }

        let (shares_issued, price_impact_pct) = if self.is_drained() {
            if amount_a == 0.0 || amount_b == 0.0 {
                return Err(PoolError::InvalidAmount(format!(
                    "bootstrapping {} requires both assets, got {} / {}",
                    self.id, amount_a, amount_b
                )));
            }
            (pool_math::bootstrap_shares(amount_a, amount_b), 0.0)
        } else {
            let shares = pool_math::proportional_shares(
                amount_a,
                amount_b,
                self.reserve_a,
                self.reserve_b,
                self.total_shares,
            );
            let impact = pool_math::deposit_price_impact_pct(
                self.reserve_a,
                self.reserve_b,
                amount_a,
                amount_b,
            );
            (shares, impact)
        };

        if shares_issued == 0.0 {
            tracing::warn!(
                "Single-sided deposit into {} mints no shares ({} / {})",
                self.id,
                amount_a,
                amount_b
            );
        }

        let reserve_a = self.reserve_a + amount_a;
        let reserve_b = self.reserve_b + amount_b;
        let total_shares = self.total_shares + shares_issued;
        if !reserve_a.is_finite() || !reserve_b.is_finite() || !total_shares.is_finite() {
            return Err(PoolError::InvalidAmount(format!(
                "deposit of {} / {} overflows {} reserves",
                amount_a, amount_b, self.id
            )));
        }

        self.reserve_a = reserve_a;
        self.reserve_b = reserve_b;
        self.total_shares = total_shares;

        Ok(LiquidityAdded {
            shares_issued,
            price_impact_pct,
        })
    }

    /// Burn shares and release the proportional reserves
    pub fn remove_liquidity(&mut self, share_amount: f64) -> Result<LiquidityRemoved, PoolError> {
        if !share_amount.is_finite() || share_amount <= 0.0 {
            return Err(PoolError::InvalidAmount(format!(
                "share amount must be positive, got {}",
                share_amount
            )));
        }
        if share_amount > self.total_shares {
            return Err(PoolError::InsufficientShares {
                requested: share_amount,
                available: self.total_shares,
            });
        }

        // Full withdrawal drains exactly, without float residue
        if share_amount == self.total_shares {
            let removed = LiquidityRemoved {
                amount_a: self.reserve_a,
                amount_b: self.reserve_b,
            };
            self.reserve_a = 0.0;
            self.reserve_b = 0.0;
            self.total_shares = 0.0;
            return Ok(removed);
        }

        let share = share_amount / self.total_shares;
        let amount_a = self.reserve_a * share;
        let amount_b = self.reserve_b * share;

        self.reserve_a -= amount_a;
        self.reserve_b -= amount_b;
        self.total_shares -= share_amount;

        Ok(LiquidityRemoved { amount_a, amount_b })
    }

    /// Quote a swap without touching reserves
    pub fn quote_swap(&self, amount_in: f64, direction: SwapDirection) -> Result<SwapQuote, PoolError> {
        if !amount_in.is_finite() || amount_in <= 0.0 {
            return Err(PoolError::InvalidAmount(format!(
                "swap input must be positive, got {}",
                amount_in
            )));
        }

        let (reserve_in, reserve_out) = self.reserves_for(direction);
        if reserve_in <= 0.0 || reserve_out <= 0.0 {
            return Err(PoolError::EmptyPool(self.id.clone()));
        }

        let amount_out = pool_math::constant_product_out(reserve_in, reserve_out, amount_in, self.fee_rate);
        let price_impact_pct = pool_math::swap_price_impact_pct(reserve_in, reserve_out, amount_in, amount_out);

        Ok(SwapQuote {
            amount_in,
            amount_out,
            price_impact_pct,
            direction,
        })
    }

    /// Execute a swap: the full input (fee included) stays in the pool
    pub fn apply_swap(&mut self, amount_in: f64, direction: SwapDirection) -> Result<SwapQuote, PoolError> {
        let quote = self.quote_swap(amount_in, direction)?;

        let (reserve_in, reserve_out) = self.reserves_for(direction);
        let reserve_in = reserve_in + quote.amount_in;
        let reserve_out = reserve_out - quote.amount_out;
        let volume_24h = self.volume_24h + quote.amount_in;
        if !reserve_in.is_finite() || !reserve_out.is_finite() || !volume_24h.is_finite() {
            return Err(PoolError::InvalidAmount(format!(
                "swap of {} overflows {} reserves",
                amount_in, self.id
            )));
        }

        match direction {
            SwapDirection::AToB => {
                self.reserve_a = reserve_in;
                self.reserve_b = reserve_out;
            }
            SwapDirection::BToA => {
                self.reserve_b = reserve_in;
                self.reserve_a = reserve_out;
            }
        }
        self.volume_24h = volume_24h;

        Ok(quote)
    }

    /// Annualized fee yield in percent, treating both reserves as one unit
    pub fn annualized_yield(&self) -> f64 {
        pool_math::annualized_fee_yield_pct(self.volume_24h, self.fee_rate, self.reserve_a + self.reserve_b)
    }

    /// Annualized fee yield in percent with token A valued at `price_a_in_b`.
    ///
    /// Volume is expected in B units.
    pub fn annualized_yield_normalized(&self, price_a_in_b: f64) -> Result<f64, PoolError> {
        if !price_a_in_b.is_finite() || price_a_in_b <= 0.0 {
            return Err(PoolError::InvalidInput(format!(
                "price of {} in {} must be positive, got {}",
                self.token_a, self.token_b, price_a_in_b
            )));
        }
        let pool_value = self.reserve_a * price_a_in_b + self.reserve_b;
        Ok(pool_math::annualized_fee_yield_pct(self.volume_24h, self.fee_rate, pool_value))
    }

    /// Display analytics derived from volume and reserves
    pub fn analytics(&self) -> PoolAnalytics {
        let volume_7d = self.volume_24h * 7.0;
        PoolAnalytics {
            tvl: self.reserve_a + self.reserve_b,
            volume_7d,
            fees_7d: volume_7d * self.fee_rate,
            transactions_24h: (self.volume_24h / 1000.0).floor() as u64,
            unique_users_24h: (self.volume_24h / 5000.0).floor() as u64,
            apy: self.annualized_yield(),
        }
    }

    /// Reserves redeemable for `shares`, without burning them
    pub fn redeemable(&self, shares: f64) -> LiquidityRemoved {
        if self.total_shares <= 0.0 {
            return LiquidityRemoved { amount_a: 0.0, amount_b: 0.0 };
        }
        let share = (shares / self.total_shares).min(1.0);
        LiquidityRemoved {
            amount_a: self.reserve_a * share,
            amount_b: self.reserve_b * share,
        }
    }

    fn reserves_for(&self, direction: SwapDirection) -> (f64, f64) {
        match direction {
            SwapDirection::AToB => (self.reserve_a, self.reserve_b),
            SwapDirection::BToA => (self.reserve_b, self.reserve_a),
        }
    }
}

impl fmt::Display for LiquidityPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.4} {} / {:.4} {} ({:.4} shares, fee {:.2}%)",
            self.id,
            self.reserve_a,
            self.token_a,
            self.reserve_b,
            self.token_b,
            self.total_shares,
            self.fee_rate * 100.0
        )
    }
}
