//! Builds one normalized [`AssetRecord`] from provider snapshots.

use crate::core::asset::{AssetClass, AssetRecord, Indicators};
use crate::core::history::{self, DividendHistory};
use crate::core::metrics;
use crate::core::normalize::PercentScale;
use crate::core::sanitize::sanitize;
use crate::core::snapshot::{DailyBar, ProviderSnapshot};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOptions {
    pub exchange_suffix: String,
    pub scale: PercentScale,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        AssemblyOptions {
            exchange_suffix: ".SA".to_string(),
            scale: PercentScale::default(),
        }
    }
}

/// Looks fields up in the primary snapshot, then in the secondary one.
struct FieldResolver<'a> {
    primary: &'a ProviderSnapshot,
    secondary: Option<&'a ProviderSnapshot>,
}

impl<'a> FieldResolver<'a> {
    fn sources(&self) -> impl Iterator<Item = &'a ProviderSnapshot> {
        std::iter::once(self.primary).chain(self.secondary)
    }

    /// First non-zero number found under any of `keys`. Zero counts as unreported.
    fn number(&self, keys: &[&str]) -> Option<f64> {
        self.sources()
            .flat_map(|snapshot| keys.iter().filter_map(move |key| snapshot.number(key)))
            .find(|value| *value != 0.0)
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        self.sources()
            .flat_map(|snapshot| keys.iter().filter_map(move |key| snapshot.text(key)))
            .next()
            .map(str::to_string)
    }

    fn net_income_history(&self) -> &'a [f64] {
        self.sources()
            .map(|snapshot| snapshot.net_income_history.as_slice())
            .find(|history| !history.is_empty())
            .unwrap_or_default()
    }

    fn daily_series(&self) -> &'a [DailyBar] {
        self.sources()
            .map(|snapshot| snapshot.daily_series.as_slice())
            .find(|series| !series.is_empty())
            .unwrap_or_default()
    }
}

/// Strips the exchange suffix from a provider symbol (`PETR4.SA` -> `PETR4`).
pub fn display_ticker(symbol: &str, exchange_suffix: &str) -> String {
    let trimmed = symbol.trim();
    if !exchange_suffix.is_empty() {
        if let Some(code) = trimmed.strip_suffix(exchange_suffix) {
            return code.to_string();
        }
    }
    trimmed.to_string()
}

/// Resolves, derives, normalizes and rounds every field of one asset.
pub fn assemble(
    symbol: &str,
    primary: &ProviderSnapshot,
    secondary: Option<&ProviderSnapshot>,
    options: &AssemblyOptions,
) -> AssetRecord {
    let fields = FieldResolver { primary, secondary };
    let scale = &options.scale;
    let ticker = display_ticker(symbol, &options.exchange_suffix);

    let name = fields
        .text(&["longName", "shortName"])
        .unwrap_or_else(|| symbol.trim().to_string());
    let segment = fields
        .text(&["sector", "industry"])
        .unwrap_or_else(|| "N/A".to_string());

    let (asset_class, confirmed) = AssetClass::classify(&ticker, &name);
    if !confirmed {
        debug!(%ticker, %name, "Classified as fund by ticker suffix only");
    }

    let price = fields
        .number(&["currentPrice", "regularMarketPrice"])
        .filter(|p| *p > 0.0);
    let book_value = fields.number(&["bookValue"]);
    let eps = fields.number(&["trailingEps"]);
    let shares = fields.number(&["sharesOutstanding"]);
    let total_debt = fields.number(&["totalDebt"]);
    let ebitda = fields.number(&["ebitda"]);
    let series = fields.daily_series();

    let dy = match fields.number(&["dividendYield", "trailingAnnualDividendYield"]) {
        Some(raw) => scale.to_percent(Some(raw)),
        None => {
            debug!(%ticker, "Dividend yield unreported, deriving from history");
            history::trailing_yield(series, price.unwrap_or(0.0))
        }
    };

    let net_debt = metrics::net_debt(total_debt, fields.number(&["totalCash"]));

    let indicators = Indicators {
        dy: sanitize(Some(dy)),
        pl: sanitize(Some(metrics::price_to_earnings(
            fields.number(&["trailingPE"]),
            price,
            eps,
        ))),
        pvp: sanitize(Some(metrics::price_to_book(
            fields.number(&["priceToBook"]),
            price,
            book_value,
        ))),
        roe: sanitize(Some(scale.to_percent(fields.number(&["returnOnEquity"])))),
        roic: sanitize(Some(scale.to_percent(fields.number(&["returnOnAssets"])))),
        cagr_lucros_5y: sanitize(Some(metrics::earnings_cagr(
            fields.net_income_history(),
            fields.number(&["earningsGrowth"]),
            scale,
        ))),
        payout: sanitize(Some(scale.to_percent(fields.number(&["payoutRatio"])))),
        margem_liquida: sanitize(Some(scale.to_percent(fields.number(&["profitMargins"])))),
        margem_bruta: sanitize(Some(scale.to_percent(fields.number(&["grossMargins"])))),
        margem_ebitda: sanitize(Some(scale.to_percent(fields.number(&["ebitdaMargins"])))),
        p_ebitda: sanitize(fields.number(&["enterpriseToEbitda"])),
        divida_liquida_ebitda: sanitize(Some(metrics::net_debt_to_ebitda(net_debt, ebitda))),
        vpa: sanitize(book_value),
        lpa: sanitize(eps),
        divida_liquida: sanitize(Some(net_debt)),
        divida_bruta: sanitize(total_debt),
        liquidez_media_diaria: sanitize(Some(metrics::average_daily_liquidity(
            fields.number(&["averageDailyVolume10Day", "averageVolume"]),
            price,
        ))),
        free_float: sanitize(Some(metrics::free_float(
            fields.number(&["floatShares"]),
            shares,
        ))),
        patrimonio_liquido: sanitize(Some(metrics::equity(
            fields.number(&["totalStockholderEquity"]),
            book_value,
            shares,
        ))),
        numero_papeis: sanitize(shares),
        market_cap: sanitize(Some(metrics::market_cap(
            fields.number(&["marketCap"]),
            price,
            shares,
        ))),
        ebitda: sanitize(ebitda),
    };

    let DividendHistory { yearly, events } = history::aggregate(series, asset_class);

    AssetRecord {
        ticker,
        asset_class,
        price: sanitize(price),
        name,
        segment,
        indicators,
        yearly_dividends: yearly,
        dividend_events: events,
    }
}
