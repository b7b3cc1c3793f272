use chrono::NaiveDate;
use core_types::{LookbackPeriod, Window};
use serde::Deserialize;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every section has defaults so an absent `config.toml` still yields a
/// usable configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub acquisition: AcquisitionSettings,
    /// Upstream price providers, in priority order.
    pub providers: Vec<ProviderSettings>,
    pub analytics: AnalyticsSettings,
    pub logging: LoggingSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acquisition: AcquisitionSettings::default(),
            providers: vec![
                ProviderSettings::new(ProviderKind::Yahoo),
                ProviderSettings::new(ProviderKind::AlphaVantage),
            ],
            analytics: AnalyticsSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Retry, backoff and concurrency parameters for the acquisition layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    /// Extra attempts against one provider after a retryable failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound for any single backoff delay.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Bound on a single provider call. An elapsed timeout counts as transient.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How many instruments may be fetched at the same time.
    pub max_concurrency: usize,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            request_timeout: Duration::from_secs(10),
            max_concurrency: 4,
        }
    }
}

/// The upstream data sources this build knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Yahoo,
    AlphaVantage,
}

impl ProviderKind {
    /// The environment variable consulted when no `api_key` is configured.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Yahoo => None,
            ProviderKind::AlphaVantage => Some("ALPHAVANTAGE_API_KEY"),
        }
    }
}

/// Connection parameters for one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Overrides the provider's public endpoint, e.g. for a caching proxy.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            base_url: None,
            api_key: None,
            enabled: true,
        }
    }

    /// The configured key, or the provider's environment variable if set.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.kind
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.is_empty())
            })
    }
}

/// Parameters for the metrics and presentation layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Annual risk-free rate; the daily rate is this divided by 252.
    pub risk_free_rate_annual: f64,
    /// Decimal places applied to every number in a response.
    pub decimal_places: u32,
    /// Starting level of both charted value series.
    pub chart_base: f64,
    /// The window used when a request does not name one.
    pub default_window: Window,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            risk_free_rate_annual: 0.03,
            decimal_places: 3,
            chart_base: 100.0,
            default_window: default_window(),
        }
    }
}

/// Where the rolling log file is written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: String,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "folio.log".to_string(),
        }
    }
}

/// Analyses cover everything since the start of 2023 unless told otherwise.
fn default_window() -> Window {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .map(Window::Since)
        .unwrap_or(Window::Lookback(LookbackPeriod::OneYear))
}
