//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/default.toml.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::application::SimulationParams;
use crate::domain::affiliate::{
    AffiliateConfig, DEFAULT_FEE_BPS, DEFAULT_MAX_FEE_LAMPORTS, DEFAULT_MIN_FEE_LAMPORTS,
};
use crate::domain::pool::LiquidityPool;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub logging: LoggingSection,
    #[serde(default)]
    pub pools: Vec<PoolSeed>,
    #[serde(default)]
    pub affiliate: AffiliateSection,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub state: StateSection,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl LoggingSection {
    /// Log level with ZOO_LOG_LEVEL override
    pub fn get_level(&self) -> String {
        std::env::var("ZOO_LOG_LEVEL").unwrap_or_else(|_| self.level.clone())
    }
}

/// Initial pool state
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSeed {
    pub id: String,
    pub token_a: String,
    pub token_b: String,
    #[serde(default)]
    pub reserve_a: f64,
    #[serde(default)]
    pub reserve_b: f64,
    #[serde(default)]
    pub total_shares: f64,
    pub fee_rate: f64,
    #[serde(default)]
    pub volume_24h: f64,
}

impl From<&PoolSeed> for LiquidityPool {
    fn from(seed: &PoolSeed) -> Self {
        LiquidityPool::new(&seed.id, &seed.token_a, &seed.token_b, seed.fee_rate)
            .with_reserves(seed.reserve_a, seed.reserve_b, seed.total_shares)
            .with_volume(seed.volume_24h)
    }
}

/// Affiliate fee section
#[derive(Debug, Clone, Deserialize)]
pub struct AffiliateSection {
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u16,
    #[serde(default = "default_min_fee")]
    pub min_fee_lamports: u64,
    #[serde(default = "default_max_fee")]
    pub max_fee_lamports: u64,
}

fn default_fee_bps() -> u16 {
    DEFAULT_FEE_BPS
}

fn default_min_fee() -> u64 {
    DEFAULT_MIN_FEE_LAMPORTS
}

fn default_max_fee() -> u64 {
    DEFAULT_MAX_FEE_LAMPORTS
}

impl Default for AffiliateSection {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            min_fee_lamports: DEFAULT_MIN_FEE_LAMPORTS,
            max_fee_lamports: DEFAULT_MAX_FEE_LAMPORTS,
        }
    }
}

impl From<&AffiliateSection> for AffiliateConfig {
    fn from(section: &AffiliateSection) -> Self {
        AffiliateConfig {
            fee_bps: section.fee_bps,
            min_fee_lamports: section.min_fee_lamports,
            max_fee_lamports: section.max_fee_lamports,
        }
    }
}

/// Market simulation section
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSection {
    /// RNG seed; same seed, same market
    #[serde(default)]
    pub seed: u64,
    /// Seconds between ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Full width of the per-tick price drift band
    #[serde(default = "default_price_drift")]
    pub max_price_drift: f64,
    #[serde(default = "default_volume_increment")]
    pub max_volume_increment: f64,
}

fn default_tick_interval() -> u64 {
    5
}

fn default_price_drift() -> f64 {
    0.1
}

fn default_volume_increment() -> f64 {
    10_000.0
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: 0,
            tick_interval_secs: default_tick_interval(),
            max_price_drift: default_price_drift(),
            max_volume_increment: default_volume_increment(),
        }
    }
}

impl SimulationSection {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

impl From<&SimulationSection> for SimulationParams {
    fn from(section: &SimulationSection) -> Self {
        SimulationParams {
            max_price_drift: section.max_price_drift,
            max_volume_increment: section.max_volume_increment,
        }
    }
}

/// Snapshot location
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StateSection {
    /// Snapshot file; none means state is not persisted
    #[serde(default)]
    pub path: Option<String>,
}

impl StateSection {
    /// Snapshot path with ZOO_STATE_PATH override and `~` expanded
    pub fn get_path(&self) -> Option<PathBuf> {
        let raw = std::env::var("ZOO_STATE_PATH").ok().or_else(|| self.path.clone())?;
        if raw.trim().is_empty() {
            return None;
        }
        Some(PathBuf::from(shellexpand::tilde(&raw).into_owned()))
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {:?}, got {}",
                LOG_LEVELS, self.logging.level
            )));
        }

        let mut seen = HashSet::new();
        for seed in &self.pools {
            if !seen.insert(seed.id.as_str()) {
                return Err(ConfigError::ValidationError(format!("duplicate pool id {}", seed.id)));
            }
            LiquidityPool::from(seed)
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("pool {}: {}", seed.id, e)))?;
        }

        AffiliateConfig::from(&self.affiliate)
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("affiliate: {}", e)))?;

        let sim = &self.simulation;
        if !(0.0..=1.0).contains(&sim.max_price_drift) {
            return Err(ConfigError::ValidationError(format!(
                "max_price_drift must be 0-1, got {}",
                sim.max_price_drift
            )));
        }

        if !sim.max_volume_increment.is_finite() || sim.max_volume_increment < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "max_volume_increment must be >= 0, got {}",
                sim.max_volume_increment
            )));
        }

        if sim.tick_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Seed pools as domain values
    pub fn seed_pools(&self) -> Vec<LiquidityPool> {
        self.pools.iter().map(LiquidityPool::from).collect()
    }
}
