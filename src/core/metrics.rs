//! Derived financial ratios.
//!
//! Every function here is total: when a precondition fails (missing input, zero or
//! negative denominator, short history) the result is 0.0 rather than an error.

use crate::core::normalize::PercentScale;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use tracing::debug;

/// Minimum number of annual net income figures needed for an earnings CAGR.
pub const MIN_INCOME_HISTORY: usize = 4;

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Provider price-to-book, or `price / book_value` when the provider has none.
pub fn price_to_book(native: Option<f64>, price: Option<f64>, book_value: Option<f64>) -> f64 {
    if let Some(pvp) = native.filter(|v| v.is_finite() && *v != 0.0) {
        return pvp;
    }
    match (positive(price), positive(book_value)) {
        (Some(price), Some(book)) => price / book,
        _ => 0.0,
    }
}

/// Provider P/E, or `price / eps` when earnings per share are positive.
pub fn price_to_earnings(native: Option<f64>, price: Option<f64>, eps: Option<f64>) -> f64 {
    if let Some(pl) = native.filter(|v| v.is_finite() && *v != 0.0) {
        return pl;
    }
    match (positive(price), positive(eps)) {
        (Some(price), Some(eps)) => price / eps,
        _ => 0.0,
    }
}

/// Not clamped: a cash-rich company has negative net debt.
pub fn net_debt(total_debt: Option<f64>, total_cash: Option<f64>) -> f64 {
    total_debt.unwrap_or(0.0) - total_cash.unwrap_or(0.0)
}

pub fn net_debt_to_ebitda(net_debt: f64, ebitda: Option<f64>) -> f64 {
    match positive(ebitda) {
        Some(ebitda) if net_debt.is_finite() => net_debt / ebitda,
        _ => 0.0,
    }
}

/// Reported stockholders' equity, or book value per share times shares outstanding.
pub fn equity(reported: Option<f64>, book_value: Option<f64>, shares: Option<f64>) -> f64 {
    if let Some(equity) = reported.filter(|v| v.is_finite() && *v != 0.0) {
        return equity;
    }
    match (book_value.filter(|v| v.is_finite()), positive(shares)) {
        (Some(book), Some(shares)) => book * shares,
        _ => 0.0,
    }
}

/// Reported market cap, or price times shares outstanding.
pub fn market_cap(reported: Option<f64>, price: Option<f64>, shares: Option<f64>) -> f64 {
    if let Some(cap) = positive(reported) {
        return cap;
    }
    match (positive(price), positive(shares)) {
        (Some(price), Some(shares)) => price * shares,
        _ => 0.0,
    }
}

pub fn average_daily_liquidity(average_volume: Option<f64>, price: Option<f64>) -> f64 {
    match (positive(average_volume), positive(price)) {
        (Some(volume), Some(price)) => volume * price,
        _ => 0.0,
    }
}

/// Share of outstanding shares that trade freely, in percent.
pub fn free_float(float_shares: Option<f64>, shares: Option<f64>) -> f64 {
    match (positive(float_shares), positive(shares)) {
        (Some(float), Some(shares)) => float / shares * 100.0,
        _ => 0.0,
    }
}

/// Compound annual growth of net income over the whole history, in percent.
///
/// `net_income` is ordered most recent first. When the history is too short, has a
/// non-positive endpoint or the computation fails, the provider's growth estimate is
/// used instead (scaled through `scale`), and 0.0 when that is missing too.
pub fn earnings_cagr(net_income: &[f64], growth_estimate: Option<f64>, scale: &PercentScale) -> f64 {
    match income_cagr(net_income) {
        Some(rate) => rate,
        None => {
            debug!(
                points = net_income.len(),
                "Income history unusable for CAGR, using growth estimate"
            );
            scale.to_percent(growth_estimate)
        }
    }
}

fn income_cagr(net_income: &[f64]) -> Option<f64> {
    if net_income.len() < MIN_INCOME_HISTORY {
        return None;
    }
    let latest = positive(net_income.first().copied())?;
    let oldest = positive(net_income.last().copied())?;
    let years = net_income.len() - 1;

    let begin_bal = Decimal::from_f64(oldest)?;
    let end_bal = Decimal::from_f64(latest)?;
    let n_years = Decimal::from_usize(years)?;

    // `cagr` panics when the growth ratio or its root leaves the Decimal range
    end_bal
        .checked_div(begin_bal)?
        .checked_powd(Decimal::ONE.checked_div(n_years)?)?;

    let rate = cagr(begin_bal, end_bal, n_years);
    let percentage = (rate * Decimal::from(100)).to_f64()?;
    debug!("cagr: {begin_bal}, {end_bal}, {n_years} = {rate}, {percentage}");
    percentage.is_finite().then_some(percentage)
}
