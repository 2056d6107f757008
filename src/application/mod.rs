pub mod engine;
pub mod pool_ledger;
pub mod rake_accountant;
pub mod simulator;
pub mod snapshot;

pub use engine::{Engine, EngineError, SwapReceipt};
pub use pool_ledger::PoolLedger;
pub use rake_accountant::{
    CategoryTotal, RakeAccountant, RakeStats, RealtimeMetrics, WindowStats, DEFAULT_HISTORY_LIMIT,
};
pub use simulator::{MarketSimulator, SimulationParams};
pub use snapshot::{EngineSnapshot, SnapshotError, SNAPSHOT_VERSION};
