use acquisition::Orchestrator;
use analyzer::{AnalyzeRequest, Analyzer, AnalyzerError, history, persist};
use api_client::{FetchFailure, PriceProvider};
use async_trait::async_trait;
use chrono::NaiveDate;
use configuration::{AcquisitionSettings, AnalyticsSettings};
use core_types::{Metric, PriceSeries, UndefinedReason, Window};
use database::{DbRepository, connect_to, run_migrations};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Serves fixed price histories and reports every other instrument as
/// not found.
struct FixtureProvider {
    prices: HashMap<String, Vec<f64>>,
}

impl FixtureProvider {
    fn new(prices: &[(&str, &[f64])]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(id, p)| (id.to_string(), p.to_vec()))
                .collect(),
        }
    }
}

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2 + i as u32).unwrap()
}

#[async_trait]
impl PriceProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn fetch(&self, instrument_id: &str, _window: &Window) -> Result<PriceSeries, FetchFailure> {
        let prices = self
            .prices
            .get(instrument_id)
            .ok_or_else(|| FetchFailure::NotFound(instrument_id.to_string()))?;
        let points = prices.iter().enumerate().map(|(i, p)| (day(i), *p)).collect();
        PriceSeries::new(instrument_id, points).map_err(|e| FetchFailure::Transient(e.to_string()))
    }
}

fn analyzer(provider: FixtureProvider) -> Analyzer {
    let settings = AcquisitionSettings {
        max_retries: 1,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        request_timeout: Duration::from_secs(1),
        max_concurrency: 4,
    };
    let providers: Vec<Arc<dyn PriceProvider>> = vec![Arc::new(provider) as Arc<dyn PriceProvider>];
    let analytics = AnalyticsSettings {
        risk_free_rate_annual: 0.0,
        decimal_places: 3,
        ..AnalyticsSettings::default()
    };
    Analyzer::new(Orchestrator::new(providers, &settings), analytics)
}

fn request(ids: &[&str], weights: &[f64], benchmark: &str) -> AnalyzeRequest {
    AnalyzeRequest {
        instrument_ids: ids.iter().map(|s| s.to_string()).collect(),
        weights: weights.to_vec(),
        benchmark_id: benchmark.to_string(),
        window: Some(Window::Since(day(0))),
    }
}

#[tokio::test]
async fn perfectly_correlated_pair() {
    let analyzer = analyzer(FixtureProvider::new(&[
        ("X", &[100.0, 110.0, 121.0]),
        ("Y", &[50.0, 55.0, 60.5]),
    ]));

    let response = analyzer
        .analyze(&request(&["X", "Y"], &[0.5, 0.5], "X"))
        .await
        .unwrap();

    assert_eq!(response.timeseries.dates, vec![day(0), day(1), day(2)]);
    assert_eq!(response.timeseries.portfolio, vec![100.0, 110.0, 121.0]);
    assert_eq!(response.timeseries.benchmark, vec![100.0, 110.0, 121.0]);
    assert_eq!(response.correlation.get("X", "Y"), Some(Metric::Value(1.0)));

    // Both steps return exactly 10%, so there is no dispersion.
    let portfolio = response.metrics.portfolio;
    assert_eq!(portfolio.volatility, Metric::Value(0.0));
    assert_eq!(
        portfolio.sharpe_ratio,
        Metric::Undefined(UndefinedReason::ZeroVariance)
    );
    assert_eq!(portfolio.annualized_return, Metric::Value(25.2));
    assert_eq!(portfolio.max_drawdown, Metric::Value(0.0));
    assert!(
        response
            .undefined
            .iter()
            .any(|u| u.field == "metrics.portfolio.sharpe_ratio" && u.reason == UndefinedReason::ZeroVariance)
    );
    assert!(response.failed.is_empty());
}

#[tokio::test]
async fn failed_holding_is_dropped_and_reported() {
    let analyzer = analyzer(FixtureProvider::new(&[
        ("A", &[10.0, 11.0, 10.0, 12.0]),
        ("SPY", &[400.0, 404.0, 402.0, 410.0]),
    ]));

    let response = analyzer
        .analyze(&request(&["A", "GONE"], &[0.25, 0.75], "SPY"))
        .await
        .unwrap();

    assert_eq!(response.failed.len(), 1);
    assert_eq!(response.failed[0].instrument, "GONE");
    assert_eq!(response.weights.get("A"), Some(&1.0));
    assert!(!response.weights.contains_key("GONE"));
    assert!(response.metrics.instruments.contains_key("A"));
    assert!(response.metrics.portfolio.sharpe_ratio.is_defined());
}

#[tokio::test]
async fn missing_benchmark_aborts() {
    let analyzer = analyzer(FixtureProvider::new(&[("A", &[10.0, 11.0])]));

    let result = analyzer.analyze(&request(&["A"], &[1.0], "SPY")).await;
    assert!(matches!(result, Err(AnalyzerError::BenchmarkUnavailable { .. })));
}

#[tokio::test]
async fn zero_weights_abort_before_any_fetch() {
    let analyzer = analyzer(FixtureProvider::new(&[]));

    let result = analyzer.analyze(&request(&["A", "B"], &[0.0, 0.0], "SPY")).await;
    assert!(matches!(result, Err(AnalyzerError::InvalidWeights(_))));
}

#[tokio::test]
async fn analyses_are_persisted_and_read_back() {
    let analyzer = analyzer(FixtureProvider::new(&[
        ("A", &[10.0, 11.0, 10.0, 12.0]),
        ("B", &[20.0, 20.0, 20.0, 20.0]),
        ("SPY", &[400.0, 404.0, 402.0, 410.0]),
    ]));
    let response = analyzer
        .analyze(&request(&["A", "B"], &[1.0, 1.0], "SPY"))
        .await
        .unwrap();

    let pool = connect_to("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    let repo = DbRepository::new(pool);

    let recorded_on = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let run_id = persist(&repo, &response, recorded_on).await.unwrap();

    let rows = history(&repo, None).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.run_id == run_id.to_string() && r.date == recorded_on));
    let flat = rows.iter().find(|r| r.instrument == "B").unwrap();
    assert_eq!(flat.sharpe, None);
    assert_eq!(flat.volatility, Some(0.0));

    let snapshots = repo.fetch_portfolio_snapshots(run_id).await.unwrap();
    assert_eq!(snapshots.len(), response.timeseries.dates.len());
    assert_eq!(snapshots[0].portfolio_value, 100.0);
}
