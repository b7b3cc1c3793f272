//! # Folio Analyzer
//!
//! The service boundary. Validates requests, drives acquisition, composes the
//! portfolio, runs the metrics engine and shapes the response; optionally
//! appends the result to the snapshot sink.

use acquisition::{Acquisition, Orchestrator};
use analytics::{MetricsEngine, MetricsResult, ReturnMatrix, correlation_matrix};
use chrono::NaiveDate;
use configuration::{AnalyticsSettings, Config};
use core_types::{Weights, round_to};
use database::{
    AnalyticsRecord, DbRepository, PortfolioSnapshot, SnapshotBatch, SnapshotSink,
    StoredAnalytics,
};
use portfolio::{TradePlan, compose};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

pub mod dto;
pub mod error;

pub use dto::{
    AnalyzeRequest, AnalyzeResponse, FailedInstrument, MetricsReport, RebalanceRequest,
    SourceReport, Timeseries, UndefinedField,
};
pub use error::AnalyzerError;

/// The main analysis service.
pub struct Analyzer {
    orchestrator: Orchestrator,
    settings: AnalyticsSettings,
}

impl Analyzer {
    pub fn new(orchestrator: Orchestrator, settings: AnalyticsSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    /// Builds the configured providers and the orchestrator around them.
    pub fn from_config(config: &Config) -> Result<Self, AnalyzerError> {
        let providers =
            api_client::build_providers(&config.providers, config.acquisition.request_timeout)?;
        let orchestrator = Orchestrator::new(providers, &config.acquisition);
        Ok(Self::new(orchestrator, config.analytics.clone()))
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    /// Runs one full acquisition and analysis cycle.
    ///
    /// Input errors are raised before any network call. A held instrument
    /// that cannot be acquired is dropped, its weight is redistributed
    /// proportionally, and it is listed in `failed`. A missing benchmark or an
    /// empty alignment aborts the request.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, AnalyzerError> {
        // --- 1. Validation ---
        let weights = validate(request)?;
        let benchmark_id = request.benchmark_id.trim();
        let window = request.window.unwrap_or(self.settings.default_window);

        let mut wanted = request.instrument_ids.clone();
        if !wanted.iter().any(|id| id == benchmark_id) {
            wanted.push(benchmark_id.to_string());
        }

        // --- 2. Acquisition ---
        let acquisition = self.orchestrator.acquire(&wanted, &window).await?;
        if acquisition.failed.contains(benchmark_id) {
            return Err(AnalyzerError::BenchmarkUnavailable {
                benchmark: benchmark_id.to_string(),
                reason: failure_reason(&acquisition, benchmark_id),
            });
        }

        let failed = failed_instruments(&acquisition, &request.instrument_ids);
        let weights = if failed.is_empty() {
            weights
        } else {
            let dropped: BTreeSet<String> = failed.iter().map(|f| f.instrument.clone()).collect();
            warn!(dropped = ?dropped, "Dropping unavailable instruments and renormalizing weights.");
            weights.without(&dropped).map_err(|_| {
                AnalyzerError::InvalidWeights(
                    "no weighted instrument could be acquired".to_string(),
                )
            })?
        };

        // --- 3. Composition & metrics ---
        let table = &acquisition.table;
        let composition = compose(table, &weights, benchmark_id, self.settings.chart_base)?;
        let engine = MetricsEngine::new(self.settings.risk_free_rate_annual);
        let (portfolio, benchmark) = composition.metrics(&engine);
        let instruments: BTreeMap<String, MetricsResult> = composition
            .instrument_returns
            .iter()
            .map(|(id, returns)| (id.clone(), engine.evaluate(returns)))
            .collect();
        let correlation = correlation_matrix(&ReturnMatrix::from_table(table));

        // --- 4. Presentation ---
        let dp = self.settings.decimal_places;
        let metrics = MetricsReport {
            portfolio: portfolio.rounded(dp),
            benchmark: benchmark.rounded(dp),
            instruments: instruments
                .into_iter()
                .map(|(id, m)| (id, m.rounded(dp)))
                .collect(),
        };
        let correlation = correlation.rounded(dp);
        let undefined = undefined_fields(&metrics, &correlation);

        info!(
            rows = table.len(),
            instruments = weights.len(),
            failed = failed.len(),
            undefined = undefined.len(),
            "Analysis complete."
        );

        Ok(AnalyzeResponse {
            window,
            weights: weights.iter().map(|(id, w)| (id.to_string(), round_to(w, dp))).collect(),
            metrics,
            correlation,
            timeseries: Timeseries {
                dates: composition.dates.clone(),
                portfolio: composition.portfolio_values.iter().map(|v| round_to(*v, dp)).collect(),
                benchmark: composition.benchmark_values.iter().map(|v| round_to(*v, dp)).collect(),
                benchmark_id: composition.benchmark_id.clone(),
            },
            failed,
            undefined,
            sources: acquisition
                .reports
                .iter()
                .map(|r| SourceReport {
                    instrument: r.instrument.clone(),
                    provider: r.provider.clone(),
                    retries: r.retries,
                })
                .collect(),
        })
    }
}

/// Computes the trade plan for a rebalance request. Touches no market data.
pub fn rebalance(request: &RebalanceRequest) -> Result<TradePlan, AnalyzerError> {
    let plan = portfolio::rebalance(
        &request.instrument_ids,
        &request.current_values,
        &request.target_weights,
    )?;
    Ok(plan)
}

/// Appends one analysis to the sink as a single batch and returns its run id.
///
/// Each instrument gets one analytics row dated `recorded_on`; each chart
/// point becomes one portfolio snapshot.
pub async fn persist(
    sink: &dyn SnapshotSink,
    response: &AnalyzeResponse,
    recorded_on: NaiveDate,
) -> Result<Uuid, AnalyzerError> {
    let run_id = Uuid::new_v4();
    let mut batch = SnapshotBatch::new(run_id);

    batch.analytics = response
        .metrics
        .instruments
        .iter()
        .map(|(id, m)| AnalyticsRecord {
            date: recorded_on,
            instrument: id.clone(),
            sharpe: m.sharpe_ratio.value(),
            drawdown: m.max_drawdown.value(),
            volatility: m.volatility.value(),
        })
        .collect();

    let ts = &response.timeseries;
    batch.portfolio = ts
        .dates
        .iter()
        .zip(&ts.portfolio)
        .zip(&ts.benchmark)
        .map(|((date, p), b)| PortfolioSnapshot {
            date: *date,
            benchmark_id: ts.benchmark_id.clone(),
            portfolio_value: *p,
            benchmark_value: *b,
        })
        .collect();

    sink.append(&batch).await?;
    Ok(run_id)
}

/// Stored per-instrument statistics, oldest first.
pub async fn history(
    repo: &DbRepository,
    limit: Option<i64>,
) -> Result<Vec<StoredAnalytics>, AnalyzerError> {
    Ok(repo.fetch_analytics_history(limit).await?)
}

fn validate(request: &AnalyzeRequest) -> Result<Weights, AnalyzerError> {
    if request.instrument_ids.is_empty() {
        return Err(AnalyzerError::InvalidInput(
            "at least one instrument is required".to_string(),
        ));
    }
    if request.benchmark_id.trim().is_empty() {
        return Err(AnalyzerError::InvalidInput("a benchmark is required".to_string()));
    }
    let mut seen = HashSet::new();
    for id in &request.instrument_ids {
        if id.trim().is_empty() {
            return Err(AnalyzerError::InvalidInput(
                "instrument identifiers must not be empty".to_string(),
            ));
        }
        if !seen.insert(id.as_str()) {
            return Err(AnalyzerError::InvalidInput(format!(
                "instrument '{id}' is listed more than once"
            )));
        }
    }
    Ok(Weights::normalize(&request.instrument_ids, &request.weights)?)
}

fn failure_reason(acquisition: &Acquisition, instrument: &str) -> String {
    acquisition
        .report(instrument)
        .and_then(|r| r.last_failure())
        .map_or_else(|| "no provider returned data".to_string(), |f| f.to_string())
}

fn failed_instruments(acquisition: &Acquisition, held: &[String]) -> Vec<FailedInstrument> {
    held.iter()
        .filter(|id| acquisition.failed.contains(id.as_str()))
        .map(|id| FailedInstrument {
            instrument: id.clone(),
            reason: failure_reason(acquisition, id),
        })
        .collect()
}

fn undefined_fields(
    metrics: &MetricsReport,
    correlation: &analytics::CorrelationMatrix,
) -> Vec<UndefinedField> {
    let mut fields = Vec::new();
    let mut push = |prefix: String, result: &MetricsResult| {
        for (name, reason) in result.undefined_fields() {
            fields.push(UndefinedField {
                field: format!("{prefix}.{name}"),
                reason,
            });
        }
    };
    push("metrics.portfolio".to_string(), &metrics.portfolio);
    push("metrics.benchmark".to_string(), &metrics.benchmark);
    for (id, result) in &metrics.instruments {
        push(format!("metrics.instruments.{id}"), result);
    }
    for (a, b, reason) in correlation.undefined_pairs() {
        fields.push(UndefinedField {
            field: format!("correlation.{a}.{b}"),
            reason,
        });
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(ids: &[&str], weights: &[f64], benchmark: &str) -> AnalyzeRequest {
        AnalyzeRequest {
            instrument_ids: ids.iter().map(|s| s.to_string()).collect(),
            weights: weights.to_vec(),
            benchmark_id: benchmark.to_string(),
            window: None,
        }
    }

    #[test]
    fn validation_rejects_bad_requests() {
        assert!(matches!(
            validate(&request(&[], &[], "SPY")),
            Err(AnalyzerError::InvalidInput(_))
        ));
        assert!(matches!(
            validate(&request(&["A"], &[1.0], " ")),
            Err(AnalyzerError::InvalidInput(_))
        ));
        assert!(matches!(
            validate(&request(&["A", "A"], &[1.0, 1.0], "SPY")),
            Err(AnalyzerError::InvalidInput(_))
        ));
        assert!(matches!(
            validate(&request(&["A", "B"], &[0.0, 0.0], "SPY")),
            Err(AnalyzerError::InvalidWeights(_))
        ));
        assert!(matches!(
            validate(&request(&["A", "B"], &[1.0], "SPY")),
            Err(AnalyzerError::InvalidWeights(_))
        ));
    }

    #[test]
    fn validation_normalizes_weights() {
        let weights = validate(&request(&["A", "B"], &[3.0, 1.0], "SPY")).unwrap();
        assert_eq!(weights.get("A"), Some(0.75));
    }

    #[test]
    fn rebalance_maps_to_a_trade_plan() {
        let plan = rebalance(&RebalanceRequest {
            instrument_ids: vec!["A".to_string(), "B".to_string()],
            target_weights: vec![dec!(1), dec!(3)],
            current_values: vec![dec!(2000), dec!(2000)],
        })
        .unwrap();
        assert_eq!(plan.get("B").unwrap().target_value, dec!(3000));
        assert_eq!(plan.get("A").unwrap().trade_delta, dec!(-1000));
    }

    #[test]
    fn rebalance_rejects_mismatched_lengths() {
        let result = rebalance(&RebalanceRequest {
            instrument_ids: vec!["A".to_string()],
            target_weights: vec![dec!(1), dec!(1)],
            current_values: vec![dec!(1)],
        });
        assert!(matches!(result, Err(AnalyzerError::InvalidWeights(_))));
    }
}
