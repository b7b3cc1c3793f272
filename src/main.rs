use analyzer::{AnalyzeRequest, Analyzer, RebalanceRequest};
use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::{Config, LoggingSettings, ProviderKind, ProviderSettings};
use core_types::Window;
use database::{DbRepository, connect, run_migrations};
use indicatif::ProgressStyle;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod render;

/// The main entry point for the Folio portfolio analytics tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; settings may come from the shell.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();
    let config = configuration::load_config_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let _guard = init_logging(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Analyze(args) => handle_analyze(args, config).await,
        Commands::Rebalance(args) => handle_rebalance(args),
        Commands::History(args) => handle_history(args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Multi-provider price acquisition and portfolio risk analytics.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch prices and compute portfolio, benchmark and per-instrument metrics.
    Analyze(AnalyzeArgs),
    /// Compute the trades that move current holdings onto target weights.
    Rebalance(RebalanceArgs),
    /// Show per-instrument statistics from earlier analyses.
    History(HistoryArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Comma-separated instrument identifiers (e.g., "SPY,QQQ").
    #[arg(long, value_delimiter = ',', required = true)]
    tickers: Vec<String>,

    /// Comma-separated non-negative weights, one per ticker.
    #[arg(long, value_delimiter = ',', required = true)]
    weights: Vec<f64>,

    /// The instrument to compare the portfolio against.
    #[arg(long, default_value = "SPY")]
    benchmark: String,

    /// A start date (YYYY-MM-DD) or a lookback such as 6mo or 1y.
    #[arg(long)]
    window: Option<Window>,

    /// Restrict and reorder providers for this run (e.g., "alpha-vantage,yahoo").
    #[arg(long, value_enum, value_delimiter = ',')]
    providers: Vec<ProviderKind>,

    /// Print the response as JSON.
    #[arg(long)]
    json: bool,

    /// Do not append the result to the snapshot database.
    #[arg(long)]
    no_persist: bool,
}

#[derive(Parser)]
struct RebalanceArgs {
    /// Comma-separated instrument identifiers.
    #[arg(long, value_delimiter = ',', required = true)]
    tickers: Vec<String>,

    /// Comma-separated target weights, one per ticker.
    #[arg(long, value_delimiter = ',', required = true)]
    weights: Vec<Decimal>,

    /// Comma-separated current holding values, one per ticker.
    #[arg(long, value_delimiter = ',', required = true)]
    values: Vec<Decimal>,

    /// Print the trade plan as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct HistoryArgs {
    /// Show at most this many rows.
    #[arg(long)]
    limit: Option<i64>,

    /// Print the rows as JSON.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs stderr and daily-rolling file output behind one `EnvFilter`.
///
/// Stderr goes through the indicatif layer so that the per-instrument
/// acquisition spinners and log lines do not overwrite each other. The
/// returned guard flushes the file writer on drop.
fn init_logging(settings: &LoggingSettings) -> anyhow::Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender =
        tracing_appender::rolling::daily(&settings.directory, &settings.file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let indicatif_layer = IndicatifLayer::new().with_progress_style(
        ProgressStyle::with_template("{spinner:.green} {span_name} {span_fields} [{elapsed}]")
            .context("Invalid progress template")?,
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(indicatif_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(guard)
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_analyze(args: AnalyzeArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.providers.is_empty() {
        config.providers = args
            .providers
            .iter()
            .map(|kind| {
                let mut provider = config
                    .providers
                    .iter()
                    .find(|p| p.kind == *kind)
                    .cloned()
                    .unwrap_or_else(|| ProviderSettings::new(*kind));
                provider.enabled = true;
                provider
            })
            .collect();
        configuration::validate(&config)?;
    }

    let analyzer = Analyzer::from_config(&config)?;
    let request = AnalyzeRequest {
        instrument_ids: args.tickers,
        weights: args.weights,
        benchmark_id: args.benchmark,
        window: args.window,
    };
    let response = analyzer.analyze(&request).await?;

    if !args.no_persist {
        let pool = connect().await.context("Failed to open the snapshot database")?;
        run_migrations(&pool).await?;
        let repo = DbRepository::new(pool);
        let run_id = analyzer::persist(&repo, &response, chrono::Local::now().date_naive()).await?;
        tracing::info!(%run_id, "Persisted analysis.");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        render::analysis(&response);
    }
    Ok(())
}

fn handle_rebalance(args: RebalanceArgs) -> anyhow::Result<()> {
    let request = RebalanceRequest {
        instrument_ids: args.tickers,
        target_weights: args.weights,
        current_values: args.values,
    };
    let plan = analyzer::rebalance(&request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        render::trade_plan(&plan);
    }
    Ok(())
}

async fn handle_history(args: HistoryArgs) -> anyhow::Result<()> {
    let pool = connect().await.context("Failed to open the snapshot database")?;
    run_migrations(&pool).await?;
    let repo = DbRepository::new(pool);
    let rows = analyzer::history(&repo, args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        render::history(&rows);
    }
    Ok(())
}
