//! Rake Domain Types
//!
//! Rake categories with their fixed rates, immutable rake records and the
//! fixed distribution split. Amounts are `Decimal` so splits reconcile
//! to the exact total.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places kept for the non-prize distribution shares (lamport precision)
pub const DISTRIBUTION_SCALE: u32 = 9;

/// Share of collected rake sent to prize pools
pub const PRIZE_POOL_SHARE: Decimal = dec!(0.60);
/// Share of collected rake sent to development
pub const DEVELOPMENT_SHARE: Decimal = dec!(0.25);
/// Share of collected rake sent to operations
pub const OPERATIONS_SHARE: Decimal = dec!(0.10);
/// Share of collected rake sent to affiliates
pub const AFFILIATE_SHARE: Decimal = dec!(0.05);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RakeError {
    #[error("Unknown rake category: {0}")]
    UnknownCategory(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Products that pay rake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RakeCategory {
    Chess,
    Poker,
    Trading,
    Swap,
}

impl RakeCategory {
    /// All categories in tie-break order
    pub const ALL: [RakeCategory; 4] = [
        RakeCategory::Chess,
        RakeCategory::Poker,
        RakeCategory::Trading,
        RakeCategory::Swap,
    ];

    /// Fraction of the trade amount taken as rake
    pub fn rate(&self) -> Decimal {
        match self {
            RakeCategory::Chess => dec!(0.025),
            RakeCategory::Poker => dec!(0.05),
            RakeCategory::Trading => dec!(0.0005),
            RakeCategory::Swap => dec!(0.003),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RakeCategory::Chess => "chess",
            RakeCategory::Poker => "poker",
            RakeCategory::Trading => "trading",
            RakeCategory::Swap => "swap",
        }
    }
}

impl fmt::Display for RakeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RakeCategory {
    type Err = RakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chess" => Ok(RakeCategory::Chess),
            "poker" => Ok(RakeCategory::Poker),
            "trading" => Ok(RakeCategory::Trading),
            "swap" => Ok(RakeCategory::Swap),
            _ => Err(RakeError::UnknownCategory(s.to_string())),
        }
    }
}

/// One assessed rake payment. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RakeRecord {
    pub category: RakeCategory,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Opaque identifier of the paying account
    pub source_account: String,
    /// `rake_<unix_millis>_<sequence>`
    pub transaction_id: String,
}

/// How collected rake is divided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSplit {
    pub prize_pool: Decimal,
    pub development: Decimal,
    pub operations: Decimal,
    pub affiliate: Decimal,
}

impl DistributionSplit {
    /// Split `total` 60/25/10/5.
    ///
    /// Development, operations and affiliate are truncated to
    /// `DISTRIBUTION_SCALE` places; the prize pool takes the remainder so
    /// the four parts always sum to `total` exactly.
    pub fn of(total: Decimal) -> Self {
        let share = |pct: Decimal| {
            (total * pct).round_dp_with_strategy(DISTRIBUTION_SCALE, RoundingStrategy::ToZero)
        };

        let development = share(DEVELOPMENT_SHARE);
        let operations = share(OPERATIONS_SHARE);
        let affiliate = share(AFFILIATE_SHARE);
        let prize_pool = total - development - operations - affiliate;

        Self {
            prize_pool,
            development,
            operations,
            affiliate,
        }
    }

    pub fn total(&self) -> Decimal {
        self.prize_pool + self.development + self.operations + self.affiliate
    }
}
