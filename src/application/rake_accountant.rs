//! Rake Accountant
//!
//! Assesses rake on settled trades and answers statistics over the
//! append-only record history. Time comes from the injected `Clock`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::rake::{DistributionSplit, RakeCategory, RakeError, RakeRecord};
use crate::ports::Clock;

/// Default number of records returned by `history`
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Number of records included in realtime metrics
const RECENT_RECORDS: usize = 10;

/// Hours in the realtime projection horizon
const PROJECTION_HOURS: i64 = 24;

/// Rake collected in a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStats {
    pub total_collected: Decimal,
    pub record_count: usize,
}

/// Per-category totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: RakeCategory,
    pub total: Decimal,
}

/// Dashboard view of the rake ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RakeStats {
    pub total_collected: Decimal,
    pub daily: WindowStats,
    pub weekly: WindowStats,
    pub monthly: WindowStats,
    pub by_category: Vec<CategoryTotal>,
    pub top_category: RakeCategory,
    pub distribution: DistributionSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMetrics {
    pub last_hour: WindowStats,
    pub rake_per_second: Decimal,
    pub projected_daily: Decimal,
    pub top_category: RakeCategory,
    pub recent: Vec<RakeRecord>,
}

/// Append-only rake ledger
pub struct RakeAccountant {
    clock: Arc<dyn Clock>,
    records: Vec<RakeRecord>,
    sequence: u64,
    total: Decimal,
}

impl RakeAccountant {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            records: Vec::new(),
            sequence: 0,
            total: Decimal::ZERO,
        }
    }

    /// Restore a ledger from previously recorded entries.
    ///
    /// Rejects negative amounts and histories whose total exceeds
    /// `ledger_capacity`.
    pub fn with_records(clock: Arc<dyn Clock>, records: Vec<RakeRecord>) -> Result<Self, RakeError> {
        let mut total = Decimal::ZERO;
        for record in &records {
            if record.amount.is_sign_negative() && !record.amount.is_zero() {
                return Err(RakeError::InvalidAmount(format!(
                    "record {} has negative amount {}",
                    record.transaction_id, record.amount
                )));
            }
            total = Self::add_within_capacity(total, record.amount)?;
        }

        let sequence = records.len() as u64;
        Ok(Self {
            clock,
            records,
            sequence,
            total,
        })
    }

    /// Largest lifetime total the ledger accepts. Every window sum and the
    /// 24h projection of it stay representable below this bound.
    pub fn ledger_capacity() -> Decimal {
        Decimal::MAX / Decimal::from(PROJECTION_HOURS)
    }

    fn add_within_capacity(total: Decimal, amount: Decimal) -> Result<Decimal, RakeError> {
        total
            .checked_add(amount)
            .filter(|sum| *sum <= Self::ledger_capacity())
            .ok_or_else(|| {
                RakeError::InvalidAmount(format!(
                    "rake {} would push the ledger total {} past {}",
                    amount,
                    total,
                    Self::ledger_capacity()
                ))
            })
    }

    /// Assess rake for a category given by name
    pub fn assess_rake(&mut self, category: &str, trade_amount: Decimal, source_account: &str) -> Result<Decimal, RakeError> {
        let category: RakeCategory = category.parse()?;
        self.assess(category, trade_amount, source_account)
    }

    /// Assess and record rake on a settled trade.
    ///
    /// Returns `trade_amount * rate`. Every successful call appends exactly
    /// one record stamped with the clock's current time.
    pub fn assess(&mut self, category: RakeCategory, trade_amount: Decimal, source_account: &str) -> Result<Decimal, RakeError> {
        let amount = self.rake_for(category, trade_amount)?;
        let total = Self::add_within_capacity(self.total, amount)?;

        let timestamp = self.clock.now();
        self.sequence += 1;
        let transaction_id = format!("rake_{}_{}", timestamp.timestamp_millis(), self.sequence);

        tracing::info!(
            "Rake assessed: {} {} on {} from {} ({})",
            amount,
            category,
            trade_amount,
            source_account,
            transaction_id
        );

        self.records.push(RakeRecord {
            category,
            amount,
            timestamp,
            source_account: source_account.to_string(),
            transaction_id,
        });
        self.total = total;
        Ok(amount)
    }

    /// Rake `assess` would charge, without recording it. Fails exactly when
    /// `assess` would.
    pub fn rake_for(&self, category: RakeCategory, trade_amount: Decimal) -> Result<Decimal, RakeError> {
        if trade_amount.is_sign_negative() && !trade_amount.is_zero() {
            return Err(RakeError::InvalidAmount(format!(
                "trade amount must not be negative, got {}",
                trade_amount
            )));
        }

        let amount = trade_amount.checked_mul(category.rate()).ok_or_else(|| {
            RakeError::InvalidAmount(format!("trade amount {} overflows rake", trade_amount))
        })?;
        Self::add_within_capacity(self.total, amount)?;
        Ok(amount)
    }

    /// Rake collected at or after `window_start`
    pub fn stats_since(&self, window_start: DateTime<Utc>) -> WindowStats {
        self.window_stats(|r| r.timestamp >= window_start)
    }

    // Amounts are non-negative and bounded by the ledger total, so the sum cannot overflow
    fn window_stats(&self, in_window: impl Fn(&RakeRecord) -> bool) -> WindowStats {
        self.records
            .iter()
            .filter(|r| in_window(r))
            .fold(
                WindowStats {
                    total_collected: Decimal::ZERO,
                    record_count: 0,
                },
                |acc, r| WindowStats {
                    total_collected: acc.total_collected + r.amount,
                    record_count: acc.record_count + 1,
                },
            )
    }

    pub fn distribution_split(total: Decimal) -> DistributionSplit {
        DistributionSplit::of(total)
    }

    pub fn total_collected(&self) -> Decimal {
        self.total
    }

    /// Lifetime totals for every category, in category order
    pub fn totals_by_category(&self) -> Vec<CategoryTotal> {
        RakeCategory::ALL
            .iter()
            .map(|&category| CategoryTotal {
                category,
                total: self
                    .records
                    .iter()
                    .filter(|r| r.category == category)
                    .map(|r| r.amount)
                    .sum(),
            })
            .collect()
    }

    /// Category with the largest lifetime total. Ties resolve to the
    /// earliest category in `RakeCategory::ALL`.
    pub fn top_category_by_rake(&self) -> RakeCategory {
        Self::top_of(&self.totals_by_category())
    }

    fn top_of(totals: &[CategoryTotal]) -> RakeCategory {
        let mut top = CategoryTotal {
            category: RakeCategory::ALL[0],
            total: Decimal::MIN,
        };
        for entry in totals {
            if entry.total > top.total {
                top = *entry;
            }
        }
        top.category
    }

    pub fn rake_stats(&self) -> RakeStats {
        let now = self.clock.now();
        let by_category = self.totals_by_category();
        let total_collected = self.total_collected();

        RakeStats {
            total_collected,
            daily: self.stats_since(now - Duration::days(1)),
            weekly: self.stats_since(now - Duration::days(7)),
            monthly: self.stats_since(now - Duration::days(30)),
            top_category: Self::top_of(&by_category),
            by_category,
            distribution: DistributionSplit::of(total_collected),
        }
    }

    /// Newest records first, optionally filtered to one category
    pub fn history(&self, category: Option<RakeCategory>, limit: usize) -> Vec<RakeRecord> {
        let mut records: Vec<RakeRecord> = self
            .records
            .iter()
            .rev()
            .filter(|r| category.map_or(true, |c| r.category == c))
            .cloned()
            .collect();
        // stable, so equal timestamps keep newest-appended first
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        records
    }

    /// Rake over the trailing hour, excluding a record exactly one hour old.
    /// `recent` holds the latest records in the order they were assessed.
    pub fn realtime_metrics(&self) -> RealtimeMetrics {
        let hour_ago = self.clock.now() - Duration::hours(1);
        let last_hour = self.window_stats(|r| r.timestamp > hour_ago);
        let recent_start = self.records.len().saturating_sub(RECENT_RECORDS);

        RealtimeMetrics {
            rake_per_second: last_hour.total_collected / Decimal::from(3600),
            projected_daily: last_hour.total_collected * Decimal::from(PROJECTION_HOURS),
            last_hour,
            top_category: self.top_category_by_rake(),
            recent: self.records[recent_start..].to_vec(),
        }
    }

    pub fn records(&self) -> &[RakeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{ManualClock, MockClock};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn accountant() -> (RakeAccountant, ManualClock) {
        let clock = ManualClock::new(start());
        (RakeAccountant::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_assess_rates() {
        let (mut rake, _) = accountant();
        assert_eq!(rake.assess_rake("chess", dec!(100), "alice"), Ok(dec!(2.5)));
        assert_eq!(rake.assess_rake("poker", dec!(1000), "bob"), Ok(dec!(50)));
        assert_eq!(rake.assess_rake("trading", dec!(10000), "carol"), Ok(dec!(5)));
        assert_eq!(rake.assess_rake("swap", dec!(1000), "dave"), Ok(dec!(3)));
        assert_eq!(rake.len(), 4);
    }

    #[test]
    fn test_unknown_category_leaves_ledger_unchanged() {
        let (mut rake, _) = accountant();
        let result = rake.assess_rake("roulette", dec!(100), "alice");
        assert_eq!(result, Err(RakeError::UnknownCategory("roulette".to_string())));
        assert!(rake.is_empty());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let (mut rake, _) = accountant();
        let result = rake.assess(RakeCategory::Chess, dec!(-1), "alice");
        assert!(matches!(result, Err(RakeError::InvalidAmount(_))));
        assert!(rake.is_empty());
    }

    #[test]
    fn test_zero_amount_recorded() {
        let (mut rake, _) = accountant();
        assert_eq!(rake.assess(RakeCategory::Poker, Decimal::ZERO, "alice"), Ok(Decimal::ZERO));
        assert_eq!(rake.len(), 1);
    }

    #[test]
    fn test_record_fields() {
        let (mut rake, _) = accountant();
        rake.assess(RakeCategory::Chess, dec!(100), "alice").unwrap();
        rake.assess(RakeCategory::Chess, dec!(100), "alice").unwrap();

        let record = &rake.records()[0];
        assert_eq!(record.category, RakeCategory::Chess);
        assert_eq!(record.amount, dec!(2.5));
        assert_eq!(record.timestamp, start());
        assert_eq!(record.source_account, "alice");
        assert_eq!(record.transaction_id, format!("rake_{}_1", start().timestamp_millis()));
        assert_ne!(rake.records()[0].transaction_id, rake.records()[1].transaction_id);
    }

    #[test]
    fn test_stats_since_window() {
        let (mut rake, clock) = accountant();
        rake.assess(RakeCategory::Chess, dec!(100), "a").unwrap();
        clock.advance(Duration::hours(2));
        rake.assess(RakeCategory::Chess, dec!(200), "b").unwrap();

        let stats = rake.stats_since(start() + Duration::hours(1));
        assert_eq!(stats.total_collected, dec!(5));
        assert_eq!(stats.record_count, 1);

        // window boundary is inclusive
        let stats = rake.stats_since(start());
        assert_eq!(stats.total_collected, dec!(7.5));
        assert_eq!(stats.record_count, 2);
    }

    #[test]
    fn test_stats_since_future_is_empty() {
        let (mut rake, _) = accountant();
        rake.assess(RakeCategory::Chess, dec!(100), "a").unwrap();
        let stats = rake.stats_since(start() + Duration::days(1));
        assert_eq!(stats.total_collected, Decimal::ZERO);
        assert_eq!(stats.record_count, 0);
    }

    #[test]
    fn test_top_category() {
        let (mut rake, _) = accountant();
        assert_eq!(rake.top_category_by_rake(), RakeCategory::Chess);

        rake.assess(RakeCategory::Trading, dec!(10000), "a").unwrap(); // 5
        rake.assess(RakeCategory::Swap, dec!(1000), "a").unwrap(); // 3
        assert_eq!(rake.top_category_by_rake(), RakeCategory::Trading);

        rake.assess(RakeCategory::Poker, dec!(100), "a").unwrap(); // 5, ties trading
        assert_eq!(rake.top_category_by_rake(), RakeCategory::Poker);
    }

    #[test]
    fn test_history_order_filter_and_limit() {
        let (mut rake, clock) = accountant();
        for i in 0..5 {
            rake.assess(RakeCategory::Chess, Decimal::from(i * 100), "a").unwrap();
            rake.assess(RakeCategory::Poker, Decimal::from(i * 100), "b").unwrap();
            clock.advance(Duration::minutes(1));
        }

        let all = rake.history(None, DEFAULT_HISTORY_LIMIT);
        assert_eq!(all.len(), 10);
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(all[0].category, RakeCategory::Poker);

        let chess = rake.history(Some(RakeCategory::Chess), 3);
        assert_eq!(chess.len(), 3);
        assert!(chess.iter().all(|r| r.category == RakeCategory::Chess));
        assert_eq!(chess[0].amount, dec!(10));
    }

    #[test]
    fn test_rake_stats_windows() {
        let (mut rake, clock) = accountant();
        rake.assess(RakeCategory::Poker, dec!(1000), "a").unwrap(); // 50, 40 days old
        clock.advance(Duration::days(35));
        rake.assess(RakeCategory::Poker, dec!(200), "a").unwrap(); // 10, 5 days old
        clock.advance(Duration::days(3));
        rake.assess(RakeCategory::Chess, dec!(40), "a").unwrap(); // 1, 2 days old
        clock.advance(Duration::days(2));
        rake.assess(RakeCategory::Swap, dec!(1000), "a").unwrap(); // 3, now

        let stats = rake.rake_stats();
        assert_eq!(stats.total_collected, dec!(64));
        assert_eq!(stats.daily.total_collected, dec!(3));
        assert_eq!(stats.weekly.total_collected, dec!(14));
        assert_eq!(stats.monthly.total_collected, dec!(14));
        assert_eq!(stats.top_category, RakeCategory::Poker);
        assert_eq!(stats.distribution.total(), dec!(64));
        assert_eq!(stats.by_category.len(), 4);
    }

    #[test]
    fn test_realtime_metrics() {
        let (mut rake, clock) = accountant();
        rake.assess(RakeCategory::Poker, dec!(1000), "a").unwrap();
        clock.advance(Duration::hours(2));
        rake.assess(RakeCategory::Chess, dec!(1440), "a").unwrap(); // 36

        let metrics = rake.realtime_metrics();
        assert_eq!(metrics.last_hour.total_collected, dec!(36));
        assert_eq!(metrics.rake_per_second, dec!(0.01));
        assert_eq!(metrics.projected_daily, dec!(864));
        assert_eq!(metrics.top_category, RakeCategory::Poker);
        assert_eq!(metrics.recent.len(), 2);
    }

    #[test]
    fn test_uses_injected_clock() {
        let mut clock = MockClock::new();
        clock.expect_now().returning(start);

        let mut rake = RakeAccountant::new(Arc::new(clock));
        rake.assess(RakeCategory::Swap, dec!(100), "a").unwrap();
        assert_eq!(rake.records()[0].timestamp, start());
    }

    #[test]
    fn test_with_records_continues_sequence() {
        let (mut rake, clock) = accountant();
        rake.assess(RakeCategory::Chess, dec!(100), "a").unwrap();

        let mut restored = RakeAccountant::with_records(Arc::new(clock), rake.records().to_vec()).unwrap();
        restored.assess(RakeCategory::Chess, dec!(100), "a").unwrap();
        assert!(restored.records()[1].transaction_id.ends_with("_2"));
        assert_eq!(restored.total_collected(), dec!(5));
    }

    #[test]
    fn test_assess_past_capacity_rejected() {
        let (mut rake, _) = accountant();
        let result = rake.assess(RakeCategory::Poker, Decimal::MAX, "a");
        assert!(matches!(result, Err(RakeError::InvalidAmount(_))));
        assert!(rake.is_empty());
        assert_eq!(rake.total_collected(), Decimal::ZERO);
    }

    #[test]
    fn test_large_rake_keeps_aggregates_representable() {
        let (mut rake, _) = accountant();
        let trade = Decimal::MAX / dec!(2);
        let amount = rake.assess(RakeCategory::Poker, trade, "a").unwrap();
        assert!(rake.assess(RakeCategory::Poker, trade, "b").is_err());

        let metrics = rake.realtime_metrics();
        assert_eq!(metrics.last_hour.total_collected, amount);
        assert_eq!(metrics.projected_daily, amount * dec!(24));

        let stats = rake.rake_stats();
        assert_eq!(stats.total_collected, amount);
        assert_eq!(stats.daily.total_collected, amount);
        assert_eq!(rake.len(), 1);
    }

    #[test]
    fn test_rake_for_does_not_record() {
        let (rake, _) = accountant();
        assert_eq!(rake.rake_for(RakeCategory::Swap, dec!(1000)), Ok(dec!(3)));
        assert!(rake.rake_for(RakeCategory::Poker, Decimal::MAX).is_err());
        assert!(rake.is_empty());
    }

    #[test]
    fn test_with_records_rejects_overflowing_history() {
        let (mut rake, clock) = accountant();
        rake.assess(RakeCategory::Poker, Decimal::MAX / dec!(2), "a").unwrap();

        let mut records = rake.records().to_vec();
        records.push(records[0].clone());
        let result = RakeAccountant::with_records(Arc::new(clock), records);
        assert!(matches!(result, Err(RakeError::InvalidAmount(_))));
    }

    #[test]
    fn test_realtime_window_excludes_hour_old_record() {
        let (mut rake, clock) = accountant();
        rake.assess(RakeCategory::Chess, dec!(100), "a").unwrap();
        clock.advance(Duration::hours(1));
        rake.assess(RakeCategory::Chess, dec!(200), "b").unwrap();

        let metrics = rake.realtime_metrics();
        assert_eq!(metrics.last_hour.total_collected, dec!(5));
        assert_eq!(metrics.last_hour.record_count, 1);
        // hourly stats_since stays inclusive
        assert_eq!(rake.stats_since(start()).record_count, 2);
    }

    #[test]
    fn test_realtime_recent_in_assessment_order() {
        let (mut rake, clock) = accountant();
        for i in 1..=12 {
            rake.assess(RakeCategory::Chess, Decimal::from(i * 40), "a").unwrap();
            clock.advance(Duration::seconds(1));
        }

        let recent = rake.realtime_metrics().recent;
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].amount, dec!(3));
        assert_eq!(recent[9].amount, dec!(12));
        assert!(recent.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
