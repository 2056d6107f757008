//! Ledger Integration Tests
//!
//! End-to-end checks of the pool ledger, rake accountant and engine working
//! together through the public crate API:
//! 1. Pool share accounting (ratios, round trips, bootstrap, drain)
//! 2. Swap quoting bounds
//! 3. Rake assessment, distribution and statistics
//! 4. Engine state persistence and simulation
//!
//! All tests are deterministic: time comes from a `ManualClock` and the
//! simulator is seeded.

use approx::assert_relative_eq;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use zoo_ledger::application::{
    Engine, EngineError, EngineSnapshot, MarketSimulator, PoolLedger, RakeAccountant, SimulationParams,
};
use zoo_ledger::domain::{DistributionSplit, LiquidityPool, PoolError, RakeCategory, RakeError, SwapDirection};
use zoo_ledger::ports::ManualClock;

// ============================================================================
// Test Fixtures
// ============================================================================

fn seeded_ledger() -> PoolLedger {
    PoolLedger::from_pools([
        LiquidityPool::new("SOL-USDC", "SOL", "USDC", 0.003)
            .with_reserves(125_000.0, 12_500_000.0, 1_250_000.0)
            .with_volume(2_450_000.0),
        LiquidityPool::new("RAY-SOL", "RAY", "SOL", 0.0025)
            .with_reserves(500_000.0, 25_000.0, 125_000.0)
            .with_volume(890_000.0),
        LiquidityPool::new("BONK-SOL", "BONK", "SOL", 0.003)
            .with_reserves(1_000_000_000.0, 45_000.0, 450_000.0)
            .with_volume(1_200_000.0),
        LiquidityPool::new("FRESH", "A", "B", 0.003),
    ])
    .unwrap()
}

fn manual_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
}

fn ratio(ledger: &PoolLedger, id: &str) -> f64 {
    let pool = ledger.pool(id).unwrap();
    pool.reserve_a / pool.reserve_b
}

// ============================================================================
// Pool share accounting
// ============================================================================

#[test]
fn test_matched_adds_and_removes_keep_ratio() {
    let mut ledger = seeded_ledger();
    let before = ratio(&ledger, "RAY-SOL");

    for (a, b) in [(1_000.0, 50.0), (20.0, 1.0), (123.4, 6.17)] {
        ledger.add_liquidity("RAY-SOL", a, b).unwrap();
    }
    ledger.remove_liquidity("RAY-SOL", 10_000.0).unwrap();
    ledger.remove_liquidity("RAY-SOL", 1.5).unwrap();

    assert_relative_eq!(ratio(&ledger, "RAY-SOL"), before, max_relative = 1e-12);
}

#[test]
fn test_unmatched_add_moves_ratio() {
    let mut ledger = seeded_ledger();
    let before = ratio(&ledger, "RAY-SOL");
    ledger.add_liquidity("RAY-SOL", 1_000.0, 100.0).unwrap();
    assert!((ratio(&ledger, "RAY-SOL") - before).abs() / before > 1e-6);
}

#[test]
fn test_add_then_remove_round_trip() {
    let mut ledger = seeded_ledger();
    let added = ledger.add_liquidity("SOL-USDC", 12.5, 1_250.0).unwrap();
    let removed = ledger.remove_liquidity("SOL-USDC", added.shares_issued).unwrap();

    assert_relative_eq!(removed.amount_a, 12.5, max_relative = 1e-9);
    assert_relative_eq!(removed.amount_b, 1_250.0, max_relative = 1e-9);
}

#[test]
fn test_bootstrap_shares() {
    let mut ledger = seeded_ledger();
    let added = ledger.add_liquidity("FRESH", 100.0, 400.0).unwrap();
    assert_eq!(added.shares_issued, 200.0);

    let pool = ledger.pool("FRESH").unwrap();
    assert_eq!(pool.total_shares, 200.0);
    assert_eq!(pool.reserve_a, 100.0);
    assert_eq!(pool.reserve_b, 400.0);
}

#[test]
fn test_drained_pool_bootstraps_again() {
    let mut ledger = seeded_ledger();
    let added = ledger.add_liquidity("FRESH", 9.0, 16.0).unwrap();
    ledger.remove_liquidity("FRESH", added.shares_issued).unwrap();
    assert!(ledger.pool("FRESH").unwrap().is_drained());

    let again = ledger.add_liquidity("FRESH", 4.0, 25.0).unwrap();
    assert_eq!(again.shares_issued, 10.0);
}

#[test]
fn test_invalid_liquidity_requests() {
    let mut ledger = seeded_ledger();
    assert!(matches!(ledger.add_liquidity("SOL-USDC", -1.0, 10.0), Err(PoolError::InvalidAmount(_))));
    assert!(matches!(ledger.add_liquidity("SOL-USDC", 0.0, 0.0), Err(PoolError::InvalidAmount(_))));
    assert!(matches!(
        ledger.remove_liquidity("SOL-USDC", 2_000_000.0),
        Err(PoolError::InsufficientShares { .. })
    ));
    assert!(matches!(ledger.add_liquidity("MISSING", 1.0, 1.0), Err(PoolError::InvalidPool(_))));
}

// ============================================================================
// Swap quoting
// ============================================================================

#[test]
fn test_quote_never_drains_reserve() {
    let ledger = seeded_ledger();
    for id in ["SOL-USDC", "RAY-SOL", "BONK-SOL"] {
        let pool = ledger.pool(id).unwrap();
        for amount in [1e-9, 1.0, 1e6, 1e12, 1e18, 1e30, f64::MAX / 2.0] {
            let a_to_b = ledger.quote_swap(id, amount, SwapDirection::AToB).unwrap();
            assert!(a_to_b.amount_out < pool.reserve_b, "{} A->B {} drained", id, amount);

            let b_to_a = ledger.quote_swap(id, amount, SwapDirection::BToA).unwrap();
            assert!(b_to_a.amount_out < pool.reserve_a, "{} B->A {} drained", id, amount);
        }
    }
}

#[test]
fn test_quote_rejects_non_positive_amounts() {
    let ledger = seeded_ledger();
    for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            ledger.quote_swap("SOL-USDC", amount, SwapDirection::AToB),
            Err(PoolError::InvalidAmount(_))
        ));
    }
}

#[test]
fn test_swap_grows_k() {
    let mut ledger = seeded_ledger();
    let k_before = ledger.pool("SOL-USDC").unwrap().k();
    ledger.apply_swap("SOL-USDC", 500.0, SwapDirection::AToB).unwrap();
    let pool = ledger.pool("SOL-USDC").unwrap();
    assert!(pool.k() >= k_before);
    assert_eq!(pool.volume_24h, 2_450_500.0);
}

#[test]
fn test_impermanent_loss_values() {
    assert_eq!(PoolLedger::impermanent_loss(1.0, 4.0), Ok(-20.0));
    assert_eq!(PoolLedger::impermanent_loss(2.0, 2.0), Ok(0.0));
    assert!(matches!(PoolLedger::impermanent_loss(0.0, 1.0), Err(PoolError::InvalidInput(_))));
}

#[test]
fn test_annualized_yield_of_seed_pool() {
    let ledger = seeded_ledger();
    // 2.45M * 0.3% daily over 12.625M of pool value
    let expected = 2_450_000.0 * 0.003 / 12_625_000.0 * 365.0 * 100.0;
    assert_relative_eq!(ledger.annualized_yield("SOL-USDC").unwrap(), expected, max_relative = 1e-12);
    assert_eq!(ledger.annualized_yield("FRESH").unwrap(), 0.0);
}

// ============================================================================
// Rake
// ============================================================================

#[test]
fn test_rake_rates() {
    let mut rake = RakeAccountant::new(Arc::new(manual_clock()));
    assert_eq!(rake.assess_rake("trading", dec!(1000), "a"), Ok(dec!(0.5)));
    assert_eq!(rake.assess_rake("poker", dec!(1000), "a"), Ok(dec!(50)));
}

#[test]
fn test_unknown_category_never_defaults() {
    let mut rake = RakeAccountant::new(Arc::new(manual_clock()));
    assert_eq!(
        rake.assess_rake("blackjack", dec!(1000), "a"),
        Err(RakeError::UnknownCategory("blackjack".to_string()))
    );
    assert!(rake.is_empty());
}

#[test]
fn test_distribution_split() {
    let split = DistributionSplit::of(dec!(1000));
    assert_eq!(
        (split.prize_pool, split.development, split.operations, split.affiliate),
        (dec!(600), dec!(250), dec!(100), dec!(50))
    );

    for total in [dec!(1000.01), dec!(0.3), dec!(7.777777777777777), dec!(123456789.123456789)] {
        assert_eq!(RakeAccountant::distribution_split(total).total(), total);
    }
}

#[test]
fn test_top_category_tie_goes_to_chess() {
    let mut rake = RakeAccountant::new(Arc::new(manual_clock()));
    rake.assess(RakeCategory::Poker, dec!(100), "a").unwrap(); // 5
    rake.assess(RakeCategory::Chess, dec!(200), "b").unwrap(); // 5
    assert_eq!(rake.top_category_by_rake(), RakeCategory::Chess);
}

#[test]
fn test_stats_follow_clock() {
    let clock = manual_clock();
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let mut rake = RakeAccountant::new(Arc::new(clock.clone()));

    rake.assess(RakeCategory::Chess, dec!(400), "a").unwrap(); // 10
    clock.advance(Duration::hours(25));
    rake.assess(RakeCategory::Swap, dec!(1000), "a").unwrap(); // 3

    assert_eq!(rake.stats_since(start).total_collected, dec!(13));
    let stats = rake.rake_stats();
    assert_eq!(stats.daily.total_collected, dec!(3));
    assert_eq!(stats.weekly.total_collected, dec!(13));
    assert_eq!(stats.distribution.total(), dec!(13));
}

// ============================================================================
// Engine
// ============================================================================

#[tokio::test]
async fn test_engine_withdraw_beyond_claim() {
    let engine = Engine::new(seeded_ledger(), Arc::new(manual_clock()));
    engine.deposit("alice", "RAY-SOL", 1_000.0, 50.0).await.unwrap();

    // the pool holds far more shares than alice does
    let result = engine.withdraw("alice", "RAY-SOL", 1_000.0).await;
    assert!(matches!(result, Err(EngineError::Pool(PoolError::InsufficientShares { .. }))));

    let result = engine.withdraw("mallory", "RAY-SOL", 1.0).await;
    assert!(matches!(result, Err(EngineError::Pool(PoolError::InsufficientShares { .. }))));
}

#[tokio::test]
async fn test_engine_snapshot_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let engine = Engine::new(seeded_ledger(), Arc::new(manual_clock()));
    engine.deposit("alice", "SOL-USDC", 10.0, 1_000.0).await.unwrap();
    engine.swap("bob", "SOL-USDC", 5.0, SwapDirection::AToB).await.unwrap();
    engine.assess_rake("chess", dec!(80), "carol").await.unwrap();
    engine.snapshot().await.save(&path).unwrap();

    let snapshot = EngineSnapshot::load(&path).unwrap().unwrap();
    let restored = Engine::from_snapshot(snapshot, Arc::new(manual_clock())).unwrap();

    assert_eq!(restored.pools().await, engine.pools().await);
    assert_eq!(restored.positions("alice").await, engine.positions("alice").await);
    assert_eq!(restored.history(None, 100).await, engine.history(None, 100).await);
    assert_eq!(restored.rake_stats().await.total_collected, dec!(2.015));
}

#[tokio::test]
async fn test_seeded_simulation_is_reproducible() {
    let run = |seed: u64| async move {
        let engine = Engine::new(seeded_ledger(), Arc::new(manual_clock()));
        let sim = MarketSimulator::new(engine.clone(), SimulationParams::default(), seed)
            .with_tick_interval(std::time::Duration::from_millis(1));
        sim.run(Some(20)).await;
        engine.pools().await
    };

    let first = run(1234).await;
    let second = run(1234).await;
    let other = run(4321).await;

    assert_eq!(first, second);
    assert_ne!(first, other);
    for pool in &first {
        if pool.id != "FRESH" {
            assert!(pool.reserve_a > 0.0 && pool.reserve_b > 0.0);
        }
    }
}

#[tokio::test]
async fn test_swap_rake_counts_towards_stats() {
    let engine = Engine::new(seeded_ledger(), Arc::new(manual_clock()));
    engine.swap("bob", "RAY-SOL", 1_000.0, SwapDirection::AToB).await.unwrap();
    engine.swap("bob", "RAY-SOL", 10.0, SwapDirection::BToA).await.unwrap();

    let stats = engine.rake_stats().await;
    assert_eq!(stats.total_collected, dec!(3.03));
    assert_eq!(stats.top_category, RakeCategory::Swap);
    assert_eq!(engine.realtime_metrics().await.recent.len(), 2);
    assert_eq!(Engine::distribution_split(Decimal::ZERO).total(), Decimal::ZERO);
}
