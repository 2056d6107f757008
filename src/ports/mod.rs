//! Ports Layer - Trait definitions for external dependencies
//!
//! The engine's only outside dependency is time. Wallets, settlement and
//! display layers call into the engine rather than being called by it.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

#[cfg(test)]
pub use clock::MockClock;
