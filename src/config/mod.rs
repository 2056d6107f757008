//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, AffiliateSection, Config, ConfigError, LoggingSection, PoolSeed, SimulationSection, StateSection,
};
