//! Reduces a daily price/dividend series into yearly dividend aggregates and a
//! chronological list of payment events.

use crate::core::asset::{AssetClass, DividendEvent, YearlyDividend};
use crate::core::sanitize::round2;
use crate::core::snapshot::DailyBar;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DividendHistory {
    /// Ascending by year, only years with a positive payout.
    pub yearly: Vec<YearlyDividend>,
    /// Most recent first.
    pub events: Vec<DividendEvent>,
}

#[derive(Default)]
struct YearTotals {
    dividends: f64,
    close_sum: f64,
    close_count: usize,
}

impl YearTotals {
    fn mean_close(&self) -> f64 {
        if self.close_count == 0 {
            0.0
        } else {
            self.close_sum / self.close_count as f64
        }
    }
}

fn paid(bar: &DailyBar) -> Option<f64> {
    Some(bar.dividend).filter(|d| d.is_finite() && *d > 0.0)
}

/// Builds yearly totals and events from `series`, which may arrive in any order.
///
/// Event amounts are rounded to cents and each yearly total is the sum of that
/// year's rounded amounts, so the totals always reconcile with the event list.
pub fn aggregate(series: &[DailyBar], asset_class: AssetClass) -> DividendHistory {
    let mut years: BTreeMap<i32, YearTotals> = BTreeMap::new();
    let mut events = Vec::new();

    for bar in series {
        let totals = years.entry(bar.date.year()).or_default();
        if bar.close.is_finite() {
            totals.close_sum += bar.close;
            totals.close_count += 1;
        }
        if let Some(amount) = paid(bar) {
            let amount = round2(amount);
            totals.dividends += amount;
            events.push(DividendEvent {
                kind: asset_class.payout_label().to_string(),
                ex_date: bar.date,
                payment_date: bar.date,
                amount,
            });
        }
    }

    let yearly = years
        .into_iter()
        .filter(|(_, totals)| totals.dividends > 0.0)
        .map(|(year, totals)| {
            let mean_close = totals.mean_close();
            let yield_percent = if mean_close > 0.0 {
                totals.dividends / mean_close * 100.0
            } else {
                0.0
            };
            YearlyDividend {
                year,
                total_paid: round2(totals.dividends),
                yield_percent: round2(yield_percent),
            }
        })
        .collect();

    events.sort_by(|a, b| b.ex_date.cmp(&a.ex_date));

    DividendHistory { yearly, events }
}

/// Sum of dividends paid in the twelve months ending at the last bar, as a percentage
/// of `price`. 0.0 when there is no series or no price.
pub fn trailing_yield(series: &[DailyBar], price: f64) -> f64 {
    if !(price.is_finite() && price > 0.0) {
        return 0.0;
    }
    let Some(last) = series.iter().map(|bar| bar.date).max() else {
        return 0.0;
    };
    let window_start: NaiveDate = last - Duration::days(365);
    let paid_in_window: f64 = series
        .iter()
        .filter(|bar| bar.date > window_start)
        .filter_map(paid)
        .sum();
    paid_in_window / price * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64, dividend: f64) -> DailyBar {
        DailyBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            close,
            dividend,
        }
    }

    fn sample_series() -> Vec<DailyBar> {
        vec![
            bar("2022-03-01", 10.0, 0.0),
            bar("2022-06-01", 12.0, 0.5),
            bar("2022-09-01", 14.0, 0.0),
            bar("2023-02-01", 20.0, 0.0),
            bar("2023-04-03", 20.0, 0.0),
            bar("2024-01-15", 25.0, 0.3),
            bar("2024-07-15", 15.0, 0.7),
        ]
    }

    #[test]
    fn test_empty_series_yields_nothing() {
        let history = aggregate(&[], AssetClass::Equity);
        assert!(history.yearly.is_empty());
        assert!(history.events.is_empty());
    }

    #[test]
    fn test_yearly_totals_and_yield() {
        let history = aggregate(&sample_series(), AssetClass::Equity);

        // 2023 paid nothing, so it is skipped
        let years: Vec<i32> = history.yearly.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2022, 2024]);

        let y2022 = &history.yearly[0];
        assert_eq!(y2022.total_paid, 0.5);
        // mean close 12.0 -> 0.5 / 12 * 100
        assert_eq!(y2022.yield_percent, 4.17);

        let y2024 = &history.yearly[1];
        assert_eq!(y2024.total_paid, 1.0);
        assert_eq!(y2024.yield_percent, 5.0);
    }

    #[test]
    fn test_events_are_most_recent_first() {
        let history = aggregate(&sample_series(), AssetClass::RealEstateFund);
        let dates: Vec<String> = history
            .events
            .iter()
            .map(|e| e.ex_date.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(dates, vec!["2024-07-15", "2024-01-15", "2022-06-01"]);
        for event in &history.events {
            assert_eq!(event.ex_date, event.payment_date);
            assert_eq!(event.kind, "Rendimento");
        }
    }

    #[test]
    fn test_unordered_input_is_handled() {
        let mut series = sample_series();
        series.reverse();
        let history = aggregate(&series, AssetClass::Equity);
        assert_eq!(history.yearly[0].year, 2022);
        assert_eq!(history.events[0].ex_date.year(), 2024);
    }

    #[test]
    fn test_yearly_totals_reconcile_with_events() {
        let series: Vec<DailyBar> = (1..=12)
            .map(|month| bar(&format!("2023-{month:02}-10"), 9.87, 0.10567))
            .chain((1..=6).map(|month| bar(&format!("2024-{month:02}-10"), 10.11, 0.0833)))
            .collect();
        let history = aggregate(&series, AssetClass::RealEstateFund);

        for yearly in &history.yearly {
            let events_sum: f64 = history
                .events
                .iter()
                .filter(|e| e.ex_date.year() == yearly.year)
                .map(|e| e.amount)
                .sum();
            assert!(
                (yearly.total_paid - events_sum).abs() < 0.01,
                "year {} total {} vs events {}",
                yearly.year,
                yearly.total_paid,
                events_sum
            );
        }
    }

    #[test]
    fn test_zero_mean_close_gives_zero_yield() {
        let history = aggregate(&[bar("2021-05-05", 0.0, 1.0)], AssetClass::Equity);
        assert_eq!(history.yearly[0].total_paid, 1.0);
        assert_eq!(history.yearly[0].yield_percent, 0.0);
    }

    #[test]
    fn test_non_finite_rows_are_ignored() {
        let series = vec![
            bar("2021-05-05", f64::NAN, 0.5),
            bar("2021-06-05", 10.0, f64::NAN),
        ];
        let history = aggregate(&series, AssetClass::Equity);
        assert_eq!(history.events.len(), 1);
        assert_eq!(history.yearly[0].yield_percent, 5.0);
    }

    #[test]
    fn test_trailing_yield() {
        let series = sample_series();
        // Window ends 2024-07-15: both 2024 payments count.
        assert!((trailing_yield(&series, 20.0) - 5.0).abs() < 1e-9);
        assert_eq!(trailing_yield(&series, 0.0), 0.0);
        assert_eq!(trailing_yield(&[], 20.0), 0.0);
    }
}
