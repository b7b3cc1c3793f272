use crate::error::PortfolioError;
use analytics::{MetricsEngine, MetricsResult, daily_returns};
use chrono::NaiveDate;
use core_types::{AlignedPriceTable, Weights};
use serde::Serialize;

/// Where both value series start when no other base is configured.
pub const DEFAULT_CHART_BASE: f64 = 100.0;

/// Portfolio and benchmark series derived from one aligned table.
///
/// `dates` and both value series are `table.len()` long; every return series
/// is one shorter, with return `i` describing the move from `dates[i]` to
/// `dates[i + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub dates: Vec<NaiveDate>,
    pub benchmark_id: String,
    pub portfolio_returns: Vec<f64>,
    pub benchmark_returns: Vec<f64>,
    pub portfolio_values: Vec<f64>,
    pub benchmark_values: Vec<f64>,
    /// Per-instrument returns of every weighted instrument, in weight order.
    pub instrument_returns: Vec<(String, Vec<f64>)>,
}

impl Composition {
    /// Metrics of the portfolio and of the benchmark, in that order.
    pub fn metrics(&self, engine: &MetricsEngine) -> (MetricsResult, MetricsResult) {
        (
            engine.evaluate(&self.portfolio_returns),
            engine.evaluate(&self.benchmark_returns),
        )
    }
}

/// Combines the weighted instruments of `table` into a portfolio with fixed
/// weights and lines it up against `benchmark_id`.
///
/// Both value series start at `base` on the first date and compound by
/// `(1 + r)`, so they are comparable regardless of price levels.
pub fn compose(
    table: &AlignedPriceTable,
    weights: &Weights,
    benchmark_id: &str,
    base: f64,
) -> Result<Composition, PortfolioError> {
    if !(base.is_finite() && base > 0.0) {
        return Err(PortfolioError::InvalidInput(format!(
            "chart base {base} must be a positive number"
        )));
    }
    if weights.is_empty() {
        return Err(PortfolioError::InvalidWeights("no instruments are weighted".to_string()));
    }

    let benchmark = table
        .column(benchmark_id)
        .ok_or_else(|| PortfolioError::MissingInstrument(benchmark_id.to_string()))?;

    let mut instrument_returns = Vec::with_capacity(weights.len());
    for id in weights.instruments() {
        let column = table
            .column(id)
            .ok_or_else(|| PortfolioError::MissingInstrument(id.to_string()))?;
        instrument_returns.push((id.to_string(), daily_returns(column)));
    }

    let steps = table.len().saturating_sub(1);
    let portfolio_returns: Vec<f64> = (0..steps)
        .map(|t| {
            weights
                .iter()
                .zip(&instrument_returns)
                .map(|((_, w), (_, returns))| w * returns[t])
                .sum()
        })
        .collect();
    let benchmark_returns = daily_returns(benchmark);

    tracing::debug!(
        instruments = weights.len(),
        benchmark = benchmark_id,
        steps,
        "Composed portfolio."
    );

    Ok(Composition {
        dates: table.dates().to_vec(),
        benchmark_id: benchmark_id.to_string(),
        portfolio_values: value_series(&portfolio_returns, base),
        benchmark_values: value_series(&benchmark_returns, base),
        portfolio_returns,
        benchmark_returns,
        instrument_returns,
    })
}

/// `base` followed by its compounding through `returns`.
fn value_series(returns: &[f64], base: f64) -> Vec<f64> {
    let mut values = Vec::with_capacity(returns.len() + 1);
    values.push(base);
    let mut current = base;
    for r in returns {
        current *= 1.0 + r;
        values.push(current);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::PriceSeries;

    const TOLERANCE: f64 = 1e-9;

    fn table(columns: &[(&str, &[f64])]) -> AlignedPriceTable {
        let series: Vec<PriceSeries> = columns
            .iter()
            .map(|(id, prices)| {
                let points = prices
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (NaiveDate::from_ymd_opt(2024, 3, 1 + i as u32).unwrap(), *p))
                    .collect();
                PriceSeries::new(*id, points).unwrap()
            })
            .collect();
        AlignedPriceTable::intersect(&series).unwrap()
    }

    fn weights(ids: &[&str], raw: &[f64]) -> Weights {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        Weights::normalize(&ids, raw).unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < TOLERANCE, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn equal_moves_give_the_same_portfolio_return() {
        let t = table(&[("X", &[100.0, 110.0, 121.0]), ("Y", &[50.0, 55.0, 60.5])]);
        let c = compose(&t, &weights(&["X", "Y"], &[0.5, 0.5]), "X", 100.0).unwrap();
        assert_close(&c.portfolio_returns, &[0.1, 0.1]);
        assert_close(&c.portfolio_values, &[100.0, 110.0, 121.0]);
        assert_eq!(c.dates.len(), 3);
    }

    #[test]
    fn portfolio_return_is_the_weighted_sum() {
        let t = table(&[("A", &[100.0, 110.0]), ("B", &[100.0, 90.0]), ("SPY", &[10.0, 10.5])]);
        // Raw weights 3:1 normalize to 0.75 / 0.25.
        let c = compose(&t, &weights(&["A", "B"], &[3.0, 1.0]), "SPY", 100.0).unwrap();
        assert_close(&c.portfolio_returns, &[0.75 * 0.1 + 0.25 * -0.1]);
        assert_close(&c.benchmark_returns, &[0.05]);
    }

    #[test]
    fn value_series_both_start_at_the_base() {
        let t = table(&[("A", &[20.0, 40.0, 30.0]), ("SPY", &[400.0, 404.0, 400.0])]);
        let c = compose(&t, &weights(&["A"], &[1.0]), "SPY", 1000.0).unwrap();
        assert_eq!(c.portfolio_values[0], 1000.0);
        assert_eq!(c.benchmark_values[0], 1000.0);
        assert_close(&c.portfolio_values, &[1000.0, 2000.0, 1500.0]);
        assert_close(&c.benchmark_values, &[1000.0, 1010.0, 1000.0]);
    }

    #[test]
    fn benchmark_may_also_be_held() {
        let t = table(&[("SPY", &[100.0, 101.0]), ("QQQ", &[100.0, 102.0])]);
        let c = compose(&t, &weights(&["SPY", "QQQ"], &[1.0, 1.0]), "SPY", 100.0).unwrap();
        assert_close(&c.portfolio_returns, &[0.015]);
        assert_close(&c.benchmark_returns, &[0.01]);
    }

    #[test]
    fn missing_instruments_are_reported() {
        let t = table(&[("A", &[1.0, 2.0])]);
        assert_eq!(
            compose(&t, &weights(&["A"], &[1.0]), "SPY", 100.0),
            Err(PortfolioError::MissingInstrument("SPY".to_string()))
        );
        assert_eq!(
            compose(&t, &weights(&["B"], &[1.0]), "A", 100.0),
            Err(PortfolioError::MissingInstrument("B".to_string()))
        );
    }

    #[test]
    fn rejects_a_non_positive_base() {
        let t = table(&[("A", &[1.0, 2.0])]);
        assert!(matches!(
            compose(&t, &weights(&["A"], &[1.0]), "A", 0.0),
            Err(PortfolioError::InvalidInput(_))
        ));
    }

    #[test]
    fn metrics_cover_both_sides() {
        let t = table(&[("A", &[100.0, 110.0, 99.0]), ("SPY", &[100.0, 100.0, 100.0])]);
        let c = compose(&t, &weights(&["A"], &[1.0]), "SPY", 100.0).unwrap();
        let (portfolio, benchmark) = c.metrics(&MetricsEngine::new(0.0));
        assert!(portfolio.sharpe_ratio.is_defined());
        assert!(!benchmark.sharpe_ratio.is_defined());
        assert_eq!(benchmark.max_drawdown, core_types::Metric::Value(0.0));
    }
}
