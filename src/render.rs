use analyzer::AnalyzeResponse;
use analytics::MetricsResult;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use database::StoredAnalytics;
use portfolio::TradePlan;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn metrics_row(name: &str, m: &MetricsResult) -> Vec<String> {
    vec![
        name.to_string(),
        m.sharpe_ratio.to_string(),
        m.volatility.to_string(),
        m.max_drawdown.to_string(),
        m.annualized_return.to_string(),
    ]
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

pub fn analysis(response: &AnalyzeResponse) {
    let metrics = &response.metrics;
    let mut summary = table(vec!["", "Sharpe", "Volatility", "Max drawdown", "Annualized return"]);
    summary.add_row(metrics_row("Portfolio", &metrics.portfolio));
    summary.add_row(metrics_row(
        &format!("Benchmark ({})", response.timeseries.benchmark_id),
        &metrics.benchmark,
    ));
    for (id, m) in &metrics.instruments {
        summary.add_row(metrics_row(id, m));
    }
    println!("Window: {}", response.window);
    println!("{summary}");

    let instruments = response.correlation.instruments();
    let mut header = vec![""];
    header.extend(instruments.iter().map(String::as_str));
    let mut correlation = table(header);
    for a in instruments {
        let mut row = vec![a.clone()];
        row.extend(instruments.iter().map(|b| {
            response
                .correlation
                .get(a, b)
                .map_or_else(String::new, |m| m.to_string())
        }));
        correlation.add_row(row);
    }
    println!("Correlation");
    println!("{correlation}");

    let ts = &response.timeseries;
    if let (Some(first), Some(last)) = (ts.dates.first(), ts.dates.last()) {
        println!(
            "{} aligned dates from {first} to {last}: portfolio {} -> {}, benchmark {} -> {}",
            ts.dates.len(),
            ts.portfolio.first().copied().unwrap_or_default(),
            ts.portfolio.last().copied().unwrap_or_default(),
            ts.benchmark.first().copied().unwrap_or_default(),
            ts.benchmark.last().copied().unwrap_or_default(),
        );
    }

    for failed in &response.failed {
        println!("Unavailable: {} ({})", failed.instrument, failed.reason);
    }
    for field in &response.undefined {
        println!("Undefined: {} ({})", field.field, field.reason);
    }
}

pub fn trade_plan(plan: &TradePlan) {
    let mut trades = table(vec!["Instrument", "Current", "Target weight", "Target", "Trade"]);
    for t in &plan.trades {
        trades.add_row(vec![
            t.instrument.clone(),
            t.current_value.round_dp(2).to_string(),
            t.target_weight.round_dp(4).to_string(),
            t.target_value.round_dp(2).to_string(),
            t.trade_delta.round_dp(2).to_string(),
        ]);
    }
    println!("Total value: {}", plan.total_value.round_dp(2));
    println!("{trades}");
}

pub fn history(rows: &[StoredAnalytics]) {
    let mut history = table(vec!["Run", "Date", "Instrument", "Sharpe", "Max drawdown", "Volatility"]);
    for r in rows {
        history.add_row(vec![
            r.run_id.clone(),
            r.date.to_string(),
            r.instrument.clone(),
            optional(r.sharpe),
            optional(r.drawdown),
            optional(r.volatility),
        ]);
    }
    println!("{history}");
}
