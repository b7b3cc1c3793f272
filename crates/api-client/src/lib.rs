use crate::error::ApiError;
use async_trait::async_trait;
use configuration::{ProviderKind, ProviderSettings};
use core_types::{PriceSeries, Window};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

pub mod alpha_vantage;
pub mod error;
pub mod responses;
pub mod yahoo;
// --- Public API ---
pub use alpha_vantage::AlphaVantageProvider;
pub use error::FetchFailure;
pub use yahoo::YahooChartProvider;

/// The uniform interface to one upstream source of daily close prices.
///
/// Each implementation normalizes its own payload into a `PriceSeries` and
/// reports failures with the typed `FetchFailure` taxonomy. Implementations
/// must not mutate shared state; the only side effect is the network call.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// A short, stable name used in logs and acquisition reports.
    fn name(&self) -> &str;

    /// Fetches the close-price series of one instrument over `window`.
    async fn fetch(&self, instrument_id: &str, window: &Window) -> Result<PriceSeries, FetchFailure>;
}

/// Maps an HTTP status to a failure kind, or `None` for success.
pub(crate) fn classify_status(status: StatusCode, context: &str) -> Option<FetchFailure> {
    if status.is_success() {
        return None;
    }
    let detail = format!("HTTP {status}: {}", truncate(context, 200));
    Some(match status {
        StatusCode::TOO_MANY_REQUESTS => FetchFailure::RateLimited(detail),
        StatusCode::NOT_FOUND => FetchFailure::NotFound(detail),
        StatusCode::REQUEST_TIMEOUT => FetchFailure::Transient(detail),
        s if s.is_server_error() => FetchFailure::Transient(detail),
        // Auth and malformed-request errors will not improve with a retry and
        // say nothing about whether the instrument exists.
        _ => FetchFailure::Unsupported(detail),
    })
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Builds the enabled providers in configured priority order.
pub fn build_providers(
    settings: &[ProviderSettings],
    timeout: Duration,
) -> Result<Vec<Arc<dyn PriceProvider>>, ApiError> {
    let mut providers: Vec<Arc<dyn PriceProvider>> = Vec::new();
    for provider in settings.iter().filter(|p| p.enabled) {
        match provider.kind {
            ProviderKind::Yahoo => {
                providers.push(Arc::new(YahooChartProvider::new(
                    provider.base_url.clone(),
                    timeout,
                )?));
            }
            ProviderKind::AlphaVantage => {
                let api_key = provider.resolved_api_key();
                if api_key.is_none() {
                    tracing::warn!("Alpha Vantage has no API key; it will report every request as unsupported.");
                }
                providers.push(Arc::new(AlphaVantageProvider::new(
                    provider.base_url.clone(),
                    api_key,
                    timeout,
                )?));
            }
        }
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_matches_the_failure_taxonomy() {
        assert_eq!(classify_status(StatusCode::OK, ""), None);
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            Some(FetchFailure::RateLimited(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, ""),
            Some(FetchFailure::NotFound(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            Some(FetchFailure::Transient(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            Some(FetchFailure::Unsupported(_))
        ));
    }

    #[test]
    fn builds_only_enabled_providers_in_order() {
        let mut disabled = ProviderSettings::new(ProviderKind::Yahoo);
        disabled.enabled = false;
        let settings = vec![
            disabled,
            ProviderSettings::new(ProviderKind::AlphaVantage),
            ProviderSettings::new(ProviderKind::Yahoo),
        ];
        let providers = build_providers(&settings, Duration::from_secs(1)).unwrap();
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["alpha_vantage", "yahoo"]);
    }
}
