use crate::correlation::{CorrelationMatrix, ReturnMatrix, correlation_matrix};
use crate::report::MetricsResult;
use core_types::{Metric, UndefinedReason};

/// Trading days per year, used for every annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// A standard deviation below this is treated as zero.
const ZERO_VARIANCE_EPSILON: f64 = 1e-12;

/// A stateless calculator bundling the per-series statistics with a fixed
/// risk-free rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsEngine {
    risk_free_daily: f64,
}

impl MetricsEngine {
    /// `risk_free_annual` is converted to a daily rate by dividing by 252.
    pub fn new(risk_free_annual: f64) -> Self {
        Self {
            risk_free_daily: risk_free_annual / TRADING_DAYS,
        }
    }

    pub fn risk_free_daily(&self) -> f64 {
        self.risk_free_daily
    }

    /// Computes the full `MetricsResult` for one return series.
    pub fn evaluate(&self, returns: &[f64]) -> MetricsResult {
        MetricsResult {
            sharpe_ratio: sharpe_ratio(returns, self.risk_free_daily),
            volatility: volatility(returns),
            max_drawdown: max_drawdown(returns),
            annualized_return: annualized_return(returns),
        }
    }

    pub fn correlation(&self, matrix: &ReturnMatrix) -> CorrelationMatrix {
        correlation_matrix(matrix)
    }
}

/// Day-over-day relative changes. One element shorter than `prices`.
pub fn daily_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n).
pub(crate) fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|r| (r - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// `(mean - risk_free_daily) / stdev * sqrt(252)`.
///
/// Undefined for an empty series and for a zero standard deviation, which
/// includes every single-element series.
pub fn sharpe_ratio(returns: &[f64], risk_free_daily: f64) -> Metric {
    let (Some(m), Some(s)) = (mean(returns), std_dev(returns)) else {
        return Metric::Undefined(UndefinedReason::EmptySeries);
    };
    if s < ZERO_VARIANCE_EPSILON {
        return Metric::Undefined(UndefinedReason::ZeroVariance);
    }
    Metric::from_f64((m - risk_free_daily) / s * TRADING_DAYS.sqrt())
}

/// `stdev * sqrt(252)`.
pub fn volatility(returns: &[f64]) -> Metric {
    match std_dev(returns) {
        Some(s) => Metric::from_f64(s * TRADING_DAYS.sqrt()),
        None => Metric::Undefined(UndefinedReason::EmptySeries),
    }
}

/// The deepest fall of cumulative growth below its running peak.
///
/// Growth is `C[i] = Π(1 + r[0..=i])` and the peak starts at `C[0]`, so the
/// result is `min((C[i] - P[i]) / P[i])`: never positive, and exactly zero
/// when `C` never falls.
pub fn max_drawdown(returns: &[f64]) -> Metric {
    if returns.is_empty() {
        return Metric::Undefined(UndefinedReason::EmptySeries);
    }

    let mut cumulative = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for r in returns {
        cumulative *= 1.0 + r;
        peak = peak.max(cumulative);
        let drawdown = (cumulative - peak) / peak;
        if !drawdown.is_finite() {
            return Metric::Undefined(UndefinedReason::NonFinite);
        }
        worst = worst.min(drawdown);
    }
    Metric::from_f64(worst)
}

/// `mean * 252`. Simple arithmetic annualization, not geometric.
pub fn annualized_return(returns: &[f64]) -> Metric {
    match mean(returns) {
        Some(m) => Metric::from_f64(m * TRADING_DAYS),
        None => Metric::Undefined(UndefinedReason::EmptySeries),
    }
}
