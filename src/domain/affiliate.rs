//! Affiliate Fees
//!
//! Basis-point platform fee charged on routed swaps, clamped to a
//! minimum and maximum in lamports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basis point denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default affiliate fee (0.25%)
pub const DEFAULT_FEE_BPS: u16 = 25;

/// Default minimum fee (0.000001 SOL)
pub const DEFAULT_MIN_FEE_LAMPORTS: u64 = 1_000;

/// Default maximum fee (0.01 SOL)
pub const DEFAULT_MAX_FEE_LAMPORTS: u64 = 10_000_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AffiliateError {
    #[error("Fee {0} bps exceeds 100%")]
    FeeTooHigh(u16),

    #[error("Minimum fee {min} exceeds maximum fee {max}")]
    InvertedBounds { min: u64, max: u64 },
}

/// Affiliate fee schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateConfig {
    pub fee_bps: u16,
    pub min_fee_lamports: u64,
    pub max_fee_lamports: u64,
}

impl Default for AffiliateConfig {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            min_fee_lamports: DEFAULT_MIN_FEE_LAMPORTS,
            max_fee_lamports: DEFAULT_MAX_FEE_LAMPORTS,
        }
    }
}

impl AffiliateConfig {
    pub fn new(fee_bps: u16, min_fee_lamports: u64, max_fee_lamports: u64) -> Result<Self, AffiliateError> {
        let config = Self {
            fee_bps,
            min_fee_lamports,
            max_fee_lamports,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AffiliateError> {
        if u64::from(self.fee_bps) > BPS_DENOMINATOR {
            return Err(AffiliateError::FeeTooHigh(self.fee_bps));
        }
        if self.min_fee_lamports > self.max_fee_lamports {
            return Err(AffiliateError::InvertedBounds {
                min: self.min_fee_lamports,
                max: self.max_fee_lamports,
            });
        }
        Ok(())
    }

    /// Fee owed on a trade of `trade_lamports`, clamped to [min, max]
    pub fn fee_for(&self, trade_lamports: u64) -> u64 {
        let raw = u128::from(trade_lamports) * u128::from(self.fee_bps) / u128::from(BPS_DENOMINATOR);
        let raw = u64::try_from(raw).unwrap_or(u64::MAX);
        raw.max(self.min_fee_lamports).min(self.max_fee_lamports)
    }
}
