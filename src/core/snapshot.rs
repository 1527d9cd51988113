//! Provider snapshot abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single field as reported by a provider, before any interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Null,
}

impl RawValue {
    /// Reads the value as a finite number. Text is parsed as a plain decimal, or in
    /// Brazilian notation (`1.234,56`, optional `%`) when it contains a comma.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(text) => parse_numeric_text(text),
            RawValue::Null => None,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(text) if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let clean = text.trim().trim_end_matches('%').trim();
    if clean.is_empty() {
        return None;
    }
    if clean.contains(',') {
        return clean.replace('.', "").replace(',', ".").parse().ok();
    }
    clean.parse().ok()
}

/// One trading day of the price/dividend history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default)]
    pub dividend: f64,
}

/// Everything one provider knows about one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    #[serde(default)]
    pub raw_fields: HashMap<String, RawValue>,
    /// Ascending by date.
    #[serde(default)]
    pub daily_series: Vec<DailyBar>,
    /// Annual net income, most recent year first.
    #[serde(default)]
    pub net_income_history: Vec<f64>,
}

impl ProviderSnapshot {
    pub fn number(&self, key: &str) -> Option<f64> {
        self.raw_fields.get(key).and_then(RawValue::as_number)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.raw_fields.get(key).and_then(RawValue::as_text)
    }

    pub fn with_field(mut self, key: &str, value: impl Into<RawValue>) -> Self {
        self.raw_fields.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Short identifier used in logs and failure reports.
    fn name(&self) -> &str;

    async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_numeric_parsing() {
        assert_eq!(RawValue::Number(4.5).as_number(), Some(4.5));
        assert_eq!(RawValue::from("4.50").as_number(), Some(4.5));
        assert_eq!(RawValue::from("1.234,56").as_number(), Some(1234.56));
        assert_eq!(RawValue::from("12,39%").as_number(), Some(12.39));
        assert_eq!(RawValue::from(" -0,5 ").as_number(), Some(-0.5));
        assert_eq!(RawValue::from("N/A").as_number(), None);
        assert_eq!(RawValue::from("").as_number(), None);
        assert_eq!(RawValue::Null.as_number(), None);
        assert_eq!(RawValue::Number(f64::NAN).as_number(), None);
        assert_eq!(RawValue::Number(f64::INFINITY).as_number(), None);
    }

    #[test]
    fn test_snapshot_deserialization() {
        let json = r#"{
            "raw_fields": {
                "currentPrice": 38.5,
                "longName": "Petroleo Brasileiro S.A.",
                "trailingPE": null,
                "bookValue": "30,10"
            },
            "daily_series": [
                {"date": "2024-01-02", "close": 37.0, "dividend": 0.0},
                {"date": "2024-01-03", "close": 37.5}
            ],
            "net_income_history": [100.0, 90.0]
        }"#;

        let snapshot: ProviderSnapshot = serde_json::from_str(json).expect("valid snapshot");
        assert_eq!(snapshot.number("currentPrice"), Some(38.5));
        assert_eq!(snapshot.text("longName"), Some("Petroleo Brasileiro S.A."));
        assert_eq!(snapshot.number("trailingPE"), None);
        assert_eq!(snapshot.number("bookValue"), Some(30.1));
        assert_eq!(snapshot.number("missing"), None);
        assert_eq!(snapshot.daily_series.len(), 2);
        assert_eq!(snapshot.daily_series[1].dividend, 0.0);
        assert_eq!(snapshot.net_income_history, vec![100.0, 90.0]);
    }

    #[test]
    fn test_empty_snapshot_defaults() {
        let snapshot: ProviderSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.raw_fields.is_empty());
        assert!(snapshot.daily_series.is_empty());
        assert!(snapshot.net_income_history.is_empty());
    }
}
