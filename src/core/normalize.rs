//! Percentage unit normalization.
//!
//! Providers disagree on whether ratio-like fields (dividend yield, margins, returns)
//! are reported as fractions (`0.125`) or as percentages (`12.5`). The rule applied
//! here is a magnitude heuristic: anything strictly inside `(-ceiling, ceiling)` and
//! non-zero is taken to be a fraction and scaled, anything else is assumed to be a
//! percentage already. Values right at the boundary can be misread; both the
//! ceiling and the factor come from configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentScale {
    /// Magnitudes strictly below this are treated as fractions.
    pub fraction_ceiling: f64,
    /// Multiplier applied to fractions.
    pub percent_factor: f64,
}

impl Default for PercentScale {
    fn default() -> Self {
        PercentScale {
            fraction_ceiling: 1.0,
            percent_factor: 100.0,
        }
    }
}

impl PercentScale {
    /// Expresses a percentage-semantic value as a percentage. Missing, zero and
    /// non-finite inputs come back as 0.0.
    pub fn to_percent(&self, raw: Option<f64>) -> f64 {
        let value = match raw {
            Some(v) if v.is_finite() && v != 0.0 => v,
            _ => return 0.0,
        };
        if value.abs() < self.fraction_ceiling {
            value * self.percent_factor
        } else {
            value
        }
    }
}
