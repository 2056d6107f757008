//! Zoo Ledger - Liquidity pools and rake accounting library
//!
//! Constant-product AMM pools with LP share bookkeeping, plus the rake
//! ledger that funds the Zoo prize pools.
//!
//! # Modules
//!
//! - `domain`: Core business logic (LiquidityPool, pool math, RakeCategory, ShareRegistry)
//! - `ports`: Trait abstractions (Clock)
//! - `application`: PoolLedger, RakeAccountant, Engine, MarketSimulator, snapshots
//! - `adapters`: CLI
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
