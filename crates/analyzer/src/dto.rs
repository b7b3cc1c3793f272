use analytics::{CorrelationMatrix, MetricsResult};
use chrono::NaiveDate;
use core_types::{UndefinedReason, Window};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One portfolio analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub instrument_ids: Vec<String>,
    /// Non-negative, one per instrument. Need not sum to 1.
    pub weights: Vec<f64>,
    pub benchmark_id: String,
    /// Falls back to `analytics.default_window` when absent.
    #[serde(default)]
    pub window: Option<Window>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub portfolio: MetricsResult,
    pub benchmark: MetricsResult,
    /// Every held instrument that was acquired.
    pub instruments: BTreeMap<String, MetricsResult>,
}

/// The normalized value series for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries {
    pub dates: Vec<NaiveDate>,
    pub portfolio: Vec<f64>,
    pub benchmark: Vec<f64>,
    pub benchmark_id: String,
}

/// A held instrument no provider could supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedInstrument {
    pub instrument: String,
    pub reason: String,
}

/// A response field that carries an undefined sentinel, e.g.
/// `metrics.portfolio.sharpe_ratio` or `correlation.SPY.QQQ`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndefinedField {
    pub field: String,
    pub reason: UndefinedReason,
}

/// Which provider supplied each acquired instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub instrument: String,
    pub provider: Option<String>,
    pub retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeResponse {
    pub window: Window,
    /// The weights actually applied, after dropping failed instruments.
    pub weights: BTreeMap<String, f64>,
    pub metrics: MetricsReport,
    pub correlation: CorrelationMatrix,
    pub timeseries: Timeseries,
    pub failed: Vec<FailedInstrument>,
    pub undefined: Vec<UndefinedField>,
    pub sources: Vec<SourceReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceRequest {
    pub instrument_ids: Vec<String>,
    pub target_weights: Vec<Decimal>,
    pub current_values: Vec<Decimal>,
}
