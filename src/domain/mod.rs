//! Domain Layer - Pool math, rake rules and share bookkeeping
//!
//! Pure types and logic with no I/O. Time and persistence are handled by
//! the ports and application layers.

pub mod affiliate;
pub mod pool;
pub mod pool_math;
pub mod positions;
pub mod rake;

pub use affiliate::{AffiliateConfig, AffiliateError};
pub use pool::{
    LiquidityAdded, LiquidityPool, LiquidityRemoved, PoolAnalytics, PoolError, SwapDirection, SwapQuote,
};
pub use positions::{LiquidityPosition, ShareBalance, ShareRegistry};
pub use rake::{DistributionSplit, RakeCategory, RakeError, RakeRecord};
