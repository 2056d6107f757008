//! Adapters Layer - Outer surfaces of the ledger

pub mod cli;
