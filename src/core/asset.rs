//! Output record types, serialized in the layout the front-end consumes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ticker codes ending in this are fund-style (units or real-estate funds).
pub const FUND_SUFFIX: &str = "11";
/// Display-name markers that identify a real-estate fund.
pub const FUND_MARKERS: [&str; 2] = ["FII", "FUNDO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    #[serde(rename = "acao")]
    Equity,
    #[serde(rename = "fii")]
    RealEstateFund,
}

impl AssetClass {
    /// Classifies by ticker code and display name. A fund-style code whose name
    /// carries a fund marker is a fund; a fund-style code alone still classifies
    /// as a fund when the name says nothing.
    pub fn classify(code: &str, name: &str) -> (AssetClass, bool) {
        if !code.ends_with(FUND_SUFFIX) {
            return (AssetClass::Equity, true);
        }
        let upper = name.to_uppercase();
        let confirmed = FUND_MARKERS.iter().any(|marker| upper.contains(marker));
        (AssetClass::RealEstateFund, confirmed)
    }

    /// Label used for dividend events of this class.
    pub fn payout_label(&self) -> &'static str {
        match self {
            AssetClass::Equity => "Dividendo",
            AssetClass::RealEstateFund => "Rendimento",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub dy: f64,
    pub pl: f64,
    pub pvp: f64,
    pub roe: f64,
    pub roic: f64,
    pub cagr_lucros_5y: f64,
    pub payout: f64,
    pub margem_liquida: f64,
    pub margem_bruta: f64,
    pub margem_ebitda: f64,
    pub p_ebitda: f64,
    pub divida_liquida_ebitda: f64,
    pub vpa: f64,
    pub lpa: f64,
    pub divida_liquida: f64,
    pub divida_bruta: f64,
    pub liquidez_media_diaria: f64,
    pub free_float: f64,
    pub patrimonio_liquido: f64,
    pub numero_papeis: f64,
    pub market_cap: f64,
    pub ebitda: f64,
}

impl Indicators {
    /// Field names and values, in output order.
    pub fn entries(&self) -> [(&'static str, f64); 22] {
        [
            ("dy", self.dy),
            ("pl", self.pl),
            ("pvp", self.pvp),
            ("roe", self.roe),
            ("roic", self.roic),
            ("cagr_lucros_5y", self.cagr_lucros_5y),
            ("payout", self.payout),
            ("margem_liquida", self.margem_liquida),
            ("margem_bruta", self.margem_bruta),
            ("margem_ebitda", self.margem_ebitda),
            ("p_ebitda", self.p_ebitda),
            ("divida_liquida_ebitda", self.divida_liquida_ebitda),
            ("vpa", self.vpa),
            ("lpa", self.lpa),
            ("divida_liquida", self.divida_liquida),
            ("divida_bruta", self.divida_bruta),
            ("liquidez_media_diaria", self.liquidez_media_diaria),
            ("free_float", self.free_float),
            ("patrimonio_liquido", self.patrimonio_liquido),
            ("numero_papeis", self.numero_papeis),
            ("market_cap", self.market_cap),
            ("ebitda", self.ebitda),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyDividend {
    pub year: i32,
    #[serde(rename = "value")]
    pub total_paid: f64,
    #[serde(rename = "yield")]
    pub yield_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "dateCom", with = "day_month_year")]
    pub ex_date: NaiveDate,
    #[serde(rename = "paymentDate", with = "day_month_year")]
    pub payment_date: NaiveDate,
    #[serde(rename = "value")]
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub ticker: String,
    #[serde(rename = "type")]
    pub asset_class: AssetClass,
    pub price: f64,
    pub name: String,
    pub segment: String,
    pub indicators: Indicators,
    #[serde(rename = "chartData")]
    pub yearly_dividends: Vec<YearlyDividend>,
    #[serde(rename = "dividends")]
    pub dividend_events: Vec<DividendEvent>,
}

mod day_month_year {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%d/%m/%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&text, FORMAT).map_err(D::Error::custom)
    }
}
