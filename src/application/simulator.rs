//! Market Simulator
//!
//! Drives demo market activity against an `Engine`: each tick nudges pool
//! prices and volumes. Seeded so runs are reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use super::engine::Engine;

/// Per-tick market movement bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Full width of the price drift band; 0.1 moves reserves by up to ±5%
    pub max_price_drift: f64,
    /// Upper bound on volume added per tick
    pub max_volume_increment: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            max_price_drift: 0.1,
            max_volume_increment: 10_000.0,
        }
    }
}

#[derive(Clone)]
pub struct MarketSimulator {
    engine: Engine,
    params: SimulationParams,
    rng: Arc<Mutex<StdRng>>,
    is_running: Arc<RwLock<bool>>,
    tick_interval: Duration,
    ticks: Arc<RwLock<u64>>,
}

impl MarketSimulator {
    pub fn new(engine: Engine, params: SimulationParams, seed: u64) -> Self {
        Self {
            engine,
            params,
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
            is_running: Arc::new(RwLock::new(false)),
            tick_interval: Duration::from_secs(5),
            ticks: Arc::new(RwLock::new(0)),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Apply one step of market activity
    pub async fn tick(&self) -> usize {
        let mut rng = self.rng.lock().await;
        let updated = self.engine.simulate_tick(&mut *rng, &self.params).await;
        *self.ticks.write().await += 1;
        updated
    }

    /// Tick until `stop` is called, or until `max_ticks` have run
    pub async fn run(&self, max_ticks: Option<u64>) {
        *self.is_running.write().await = true;
        tracing::info!(
            "Starting market simulator - interval: {:?}, drift: {}, max volume/tick: {}",
            self.tick_interval,
            self.params.max_price_drift,
            self.params.max_volume_increment
        );

        let mut remaining = max_ticks;
        while *self.is_running.read().await {
            if remaining == Some(0) {
                break;
            }
            self.tick().await;
            remaining = remaining.map(|n| n - 1);
            if remaining != Some(0) {
                tokio::time::sleep(self.tick_interval).await;
            }
        }

        *self.is_running.write().await = false;
        tracing::info!("Market simulator stopped after {} ticks", self.ticks().await);
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        tracing::info!("Stopping market simulator...");
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn ticks(&self) -> u64 {
        *self.ticks.read().await
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
