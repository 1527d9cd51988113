use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use super::util::with_retry;
use crate::core::snapshot::{DailyBar, ProviderSnapshot, RawValue, SnapshotProvider};

const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile,incomeStatementHistory";

fn timestamp_to_date(ts: i64) -> Option<NaiveDate> {
    Utc.timestamp_opt(ts, 0).single().map(|dt| dt.date_naive())
}

/// Reads a quoteSummary field: `{"raw": 1.2, "fmt": "1.20"}` objects, plain numbers
/// and strings are kept, anything else is dropped.
fn field_value(value: &Value) -> Option<RawValue> {
    match value {
        Value::Number(n) => n.as_f64().map(RawValue::Number),
        Value::String(s) => Some(RawValue::Text(s.clone())),
        Value::Object(obj) => obj.get("raw").and_then(Value::as_f64).map(RawValue::Number),
        _ => None,
    }
}

fn extract_net_income(module: &Map<String, Value>) -> Vec<f64> {
    module
        .get("incomeStatementHistory")
        .and_then(Value::as_array)
        .map(|statements| {
            statements
                .iter()
                .filter_map(|statement| statement.get("netIncome").and_then(field_value))
                .filter_map(|value| value.as_number())
                .collect()
        })
        .unwrap_or_default()
}

fn flatten_summary(modules: &Map<String, Value>, snapshot: &mut ProviderSnapshot) {
    for (module_name, module) in modules {
        let Some(module) = module.as_object() else {
            continue;
        };
        if module_name == "incomeStatementHistory" {
            snapshot.net_income_history = extract_net_income(module);
            continue;
        }
        for (key, value) in module {
            if let Some(raw) = field_value(value) {
                snapshot.raw_fields.entry(key.clone()).or_insert(raw);
            }
        }
    }
}

fn build_daily_series(chart_item: &ChartItem) -> Vec<DailyBar> {
    let closes = chart_item
        .indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_ref());
    let (Some(timestamps), Some(closes)) = (chart_item.timestamp.as_ref(), closes) else {
        return Vec::new();
    };

    let mut series: Vec<DailyBar> = timestamps
        .iter()
        .zip(closes.iter())
        // Bars without a close stay as NaN so payouts keep their own trading day
        .filter_map(|(ts, close)| {
            Some(DailyBar {
                date: timestamp_to_date(*ts)?,
                close: close.unwrap_or(f64::NAN),
                dividend: 0.0,
            })
        })
        .collect();
    series.sort_by_key(|bar| bar.date);

    let dividends = chart_item
        .events
        .as_ref()
        .and_then(|events| events.dividends.as_ref());
    for dividend in dividends.into_iter().flat_map(|d| d.values()) {
        let Some(date) = timestamp_to_date(dividend.date) else {
            continue;
        };
        // Attach to the first trading day on or after the payment date
        let index = series.partition_point(|bar| bar.date < date);
        match series.get_mut(index) {
            Some(bar) => bar.dividend += dividend.amount,
            None => debug!(%date, amount = dividend.amount, "Dividend after last bar, dropped"),
        }
    }

    series
}

/// Snapshot provider backed by the Yahoo Finance quoteSummary and chart APIs.
pub struct YahooFinanceProvider {
    base_url: String,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        client: &reqwest::Client,
        url: &str,
        symbol: &str,
    ) -> Result<T> {
        debug!("Requesting {}", url);
        let response = with_retry(|| client.get(url).send(), 3, 500)
            .await
            .with_context(|| format!("Request error for symbol: {symbol} URL: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))
    }

    async fn fetch_summary(
        &self,
        client: &reqwest::Client,
        symbol: &str,
    ) -> Result<Map<String, Value>> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.base_url, symbol, SUMMARY_MODULES
        );
        let data: QuoteSummaryResponse = self.get_json(client, &url, symbol).await?;

        if let Some(error) = data.quote_summary.error.filter(|e| !e.is_null()) {
            let description = error
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(anyhow!(
                "Yahoo returned an error for symbol {}: {}",
                symbol,
                description
            ));
        }

        data.quote_summary
            .result
            .and_then(|result| result.into_iter().next())
            .ok_or_else(|| anyhow!("No summary data found for symbol: {}", symbol))
    }

    async fn fetch_chart(&self, client: &reqwest::Client, symbol: &str) -> Result<ChartItem> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=10y&events=div",
            self.base_url, symbol
        );
        let data: YahooChartResponse = self.get_json(client, &url, symbol).await?;
        data.chart
            .result
            .and_then(|result| result.into_iter().next())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))
    }
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<Map<String, Value>>>,
    error: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct ChartEvents {
    dividends: Option<HashMap<String, DividendEntry>>,
}

#[derive(Deserialize, Debug)]
struct DividendEntry {
    amount: f64,
    date: i64,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
    events: Option<ChartEvents>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[async_trait]
impl SnapshotProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    #[instrument(
        name = "YahooSnapshotFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot> {
        let client = reqwest::Client::builder()
            .user_agent("assetdigest/0.1")
            .build()?;

        let modules = self.fetch_summary(&client, symbol).await?;
        let mut snapshot = ProviderSnapshot::default();
        flatten_summary(&modules, &mut snapshot);

        match self.fetch_chart(&client, symbol).await {
            Ok(chart_item) => {
                snapshot.daily_series = build_daily_series(&chart_item);
                if let Some(price) = chart_item.meta.and_then(|m| m.regular_market_price) {
                    snapshot
                        .raw_fields
                        .entry("regularMarketPrice".to_string())
                        .or_insert(RawValue::Number(price));
                }
            }
            Err(e) => warn!(error = %e, "Price history unavailable, continuing without it"),
        }

        debug!(
            fields = snapshot.raw_fields.len(),
            bars = snapshot.daily_series.len(),
            "Received Yahoo snapshot"
        );
        Ok(snapshot)
    }
}
