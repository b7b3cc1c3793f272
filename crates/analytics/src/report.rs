use core_types::{Metric, UndefinedReason};
use serde::{Deserialize, Serialize};

/// The standard statistics for one instrument or one portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub sharpe_ratio: Metric,
    pub volatility: Metric,
    pub max_drawdown: Metric,
    pub annualized_return: Metric,
}

impl MetricsResult {
    /// Rounds every defined field. Only for the presentation boundary.
    pub fn rounded(&self, decimal_places: u32) -> Self {
        Self {
            sharpe_ratio: self.sharpe_ratio.rounded(decimal_places),
            volatility: self.volatility.rounded(decimal_places),
            max_drawdown: self.max_drawdown.rounded(decimal_places),
            annualized_return: self.annualized_return.rounded(decimal_places),
        }
    }

    /// Names and reasons of the fields that have no value.
    pub fn undefined_fields(&self) -> Vec<(&'static str, UndefinedReason)> {
        [
            ("sharpe_ratio", self.sharpe_ratio),
            ("volatility", self.volatility),
            ("max_drawdown", self.max_drawdown),
            ("annualized_return", self.annualized_return),
        ]
        .into_iter()
        .filter_map(|(name, metric)| metric.undefined_reason().map(|r| (name, r)))
        .collect()
    }
}
