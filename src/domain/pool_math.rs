//! Constant-Product Pool Math
//!
//! Pure formulas behind the pool ledger: swap output, price impact,
//! bootstrap share issuance, impermanent loss and fee yield.
//! Everything here is stateless; the `LiquidityPool` type applies it.

/// Days used to annualize a daily fee return
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Output of a constant-product swap after the input fee is deducted.
///
/// `reserve_out - (reserve_in * reserve_out) / (reserve_in + amount_in * (1 - fee_rate))`
///
/// The result is kept strictly below `reserve_out`. For very large inputs the
/// subtraction can round up to `reserve_out` in `f64`, so it is pulled back by
/// one relative epsilon.
pub fn constant_product_out(reserve_in: f64, reserve_out: f64, amount_in: f64, fee_rate: f64) -> f64 {
    let amount_in_after_fee = amount_in * (1.0 - fee_rate);
    let k = reserve_in * reserve_out;
    let amount_out = reserve_out - k / (reserve_in + amount_in_after_fee);

    if amount_out >= reserve_out {
        reserve_out * (1.0 - f64::EPSILON)
    } else {
        amount_out.max(0.0)
    }
}

/// Relative change of the marginal price caused by a swap, in percent.
///
/// Compares the post-trade ratio `(reserve_out - amount_out) / (reserve_in + amount_in)`
/// against the pre-trade ratio `reserve_out / reserve_in`.
pub fn swap_price_impact_pct(reserve_in: f64, reserve_out: f64, amount_in: f64, amount_out: f64) -> f64 {
    let price_before = reserve_out / reserve_in;
    let price_after = (reserve_out - amount_out) / (reserve_in + amount_in);
    ((price_after - price_before).abs() / price_before) * 100.0
}

/// Price impact of a deposit on the B-per-A spot price, in percent.
///
/// Returns 0 when the pool has no A reserve to price against.
pub fn deposit_price_impact_pct(reserve_a: f64, reserve_b: f64, amount_a: f64, amount_b: f64) -> f64 {
    if reserve_a <= 0.0 || reserve_b <= 0.0 {
        return 0.0;
    }
    let current_price = reserve_b / reserve_a;
    let new_price = (reserve_b + amount_b) / (reserve_a + amount_a);
    ((new_price - current_price) / current_price).abs() * 100.0
}

/// Shares minted for the first deposit into an empty pool (geometric mean)
///
/// Roots are taken before multiplying so large finite deposits stay finite.
pub fn bootstrap_shares(amount_a: f64, amount_b: f64) -> f64 {
    amount_a.sqrt() * amount_b.sqrt()
}

/// Shares minted for a deposit into a pool that already has supply.
///
/// Takes the smaller of the two proportional claims so an unbalanced
/// deposit never dilutes existing holders.
pub fn proportional_shares(
    amount_a: f64,
    amount_b: f64,
    reserve_a: f64,
    reserve_b: f64,
    total_shares: f64,
) -> f64 {
    let liquidity_a = amount_a * total_shares / reserve_a;
    let liquidity_b = amount_b * total_shares / reserve_b;
    liquidity_a.min(liquidity_b)
}

/// Impermanent loss in percent for a move from `initial_price_ratio` to `current_price_ratio`.
///
/// Negative values are losses versus holding. Returns `None` for a zero,
/// negative or non-finite ratio, where the formula is undefined.
pub fn impermanent_loss_pct(initial_price_ratio: f64, current_price_ratio: f64) -> Option<f64> {
    if !initial_price_ratio.is_finite() || !current_price_ratio.is_finite() {
        return None;
    }
    if initial_price_ratio <= 0.0 || current_price_ratio < 0.0 {
        return None;
    }

    let price_change = current_price_ratio / initial_price_ratio;
    let hodl_value = (1.0 + price_change) / 2.0;
    let lp_value = price_change.sqrt();

    // Same as (lp / hodl - 1) * 100, ordered so exact inputs give exact results
    Some(100.0 * (lp_value - hodl_value) / hodl_value)
}

/// Annualized fee yield in percent given daily volume, fee rate and pool value.
///
/// Returns 0 for an empty pool instead of dividing by zero.
pub fn annualized_fee_yield_pct(volume_24h: f64, fee_rate: f64, pool_value: f64) -> f64 {
    if pool_value <= 0.0 {
        return 0.0;
    }
    let daily_fees = volume_24h * fee_rate;
    (daily_fees / pool_value) * DAYS_PER_YEAR * 100.0
}
