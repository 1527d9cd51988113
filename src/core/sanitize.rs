//! Boundary sanitization: every number that leaves the engine goes through here.

use rust_decimal::prelude::*;

/// Digits kept after the decimal point in every emitted number.
pub const OUTPUT_DECIMALS: u32 = 2;

/// Missing or non-finite values become 0.0; everything else is rounded half away
/// from zero to [`OUTPUT_DECIMALS`] digits.
pub fn sanitize(value: Option<f64>) -> f64 {
    value.map_or(0.0, round2)
}

pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(OUTPUT_DECIMALS, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}
