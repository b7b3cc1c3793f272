use serde::Deserialize;
use std::collections::BTreeMap;

// Raw upstream payloads. Each provider module owns the conversion from its
// payload into a `PriceSeries`; nothing outside this crate sees these types.

/// The body of `GET /v8/finance/chart/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooChart {
    pub result: Option<Vec<YahooChartResult>>,
    pub error: Option<YahooChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooChartResult {
    #[serde(default)]
    pub meta: YahooMeta,
    /// Unix seconds, one per bar. Missing entirely when the range is empty.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: YahooIndicators,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YahooMeta {
    /// Offset of the exchange's local time from UTC, in seconds.
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooIndicators {
    #[serde(default)]
    pub quote: Vec<YahooQuote>,
    #[serde(default)]
    pub adjclose: Vec<YahooAdjClose>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooQuote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooAdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// The body of `GET /query?function=TIME_SERIES_DAILY_ADJUSTED`.
///
/// Alpha Vantage answers throttling and unknown symbols with HTTP 200 and a
/// single explanatory field instead of the time series.
#[derive(Debug, Clone, Deserialize)]
pub struct AlphaVantageDailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    pub time_series: Option<BTreeMap<String, AlphaVantageBar>>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Information")]
    pub information: Option<String>,
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
}

/// One day of the Alpha Vantage series. Prices arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct AlphaVantageBar {
    #[serde(rename = "4. close")]
    pub close: String,
    #[serde(rename = "5. adjusted close")]
    pub adjusted_close: Option<String>,
}
