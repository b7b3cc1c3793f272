use crate::error::{ApiError, FetchFailure};
use crate::responses::AlphaVantageDailyResponse;
use crate::{PriceProvider, classify_status};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use core_types::{PriceSeries, Window};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// `compact` returns the latest 100 trading days, which always covers at
/// least this many calendar days.
const COMPACT_CALENDAR_DAYS: i64 = 100;

/// Daily adjusted closes from Alpha Vantage's `TIME_SERIES_DAILY_ADJUSTED`.
///
/// The endpoint has no notion of a relative range, so only `Window::Since` is
/// honored; a lookback request is reported as `Unsupported`.
#[derive(Clone)]
pub struct AlphaVantageProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageProvider {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
        })
    }
}

/// Picks the smallest output size that still reaches back to `start`.
pub(crate) fn output_size_for(start: NaiveDate, today: NaiveDate) -> &'static str {
    if today - start <= ChronoDuration::days(COMPACT_CALENDAR_DAYS) {
        "compact"
    } else {
        "full"
    }
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    async fn fetch(&self, instrument_id: &str, window: &Window) -> Result<PriceSeries, FetchFailure> {
        let start = match window {
            Window::Since(start) => *start,
            Window::Lookback(period) => {
                return Err(FetchFailure::Unsupported(format!(
                    "lookback '{}' cannot be expressed; an explicit start date is required",
                    period.as_token()
                )));
            }
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(FetchFailure::Unsupported("no API key configured".to_string()));
        };

        let url = format!("{}/query", self.base_url);
        let output_size = output_size_for(start, Utc::now().date_naive());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_DAILY_ADJUSTED"),
                ("symbol", instrument_id),
                ("outputsize", output_size),
                ("apikey", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if let Some(failure) = classify_status(status, "alpha vantage request failed") {
            return Err(failure);
        }

        let body = response
            .json::<AlphaVantageDailyResponse>()
            .await
            .map_err(|e| FetchFailure::Transient(format!("malformed daily payload: {e}")))?;

        normalize_daily(instrument_id, body, start)
    }
}

/// Converts a daily payload into a `PriceSeries` starting at `start`.
pub(crate) fn normalize_daily(
    instrument_id: &str,
    body: AlphaVantageDailyResponse,
    start: NaiveDate,
) -> Result<PriceSeries, FetchFailure> {
    if let Some(note) = body.note.or(body.information) {
        return Err(FetchFailure::RateLimited(note));
    }
    if let Some(message) = body.error_message {
        return Err(FetchFailure::NotFound(format!("{instrument_id}: {message}")));
    }
    let Some(time_series) = body.time_series else {
        return Err(FetchFailure::Transient("response carried no time series".to_string()));
    };

    let mut points = Vec::with_capacity(time_series.len());
    for (day, bar) in time_series {
        let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
            .map_err(|e| FetchFailure::Transient(format!("bad date '{day}': {e}")))?;
        if date < start {
            continue;
        }
        let raw = bar.adjusted_close.as_deref().unwrap_or(&bar.close);
        let price = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| FetchFailure::Transient(format!("bad price '{raw}' on {day}: {e}")))?;
        points.push((date, price));
    }

    let series = PriceSeries::normalized(instrument_id, points);
    if series.is_empty() {
        return Err(FetchFailure::NotFound(format!("{instrument_id}: no prices since {start}")));
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AlphaVantageDailyResponse {
        serde_json::from_str(json).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn uses_adjusted_close_and_filters_before_start() {
        let body = parse(
            r#"{"Meta Data":{},"Time Series (Daily)":{
                "2024-01-03":{"4. close":"11.0","5. adjusted close":"10.5"},
                "2024-01-02":{"4. close":"10.0","5. adjusted close":"9.5"},
                "2023-12-29":{"4. close":"9.0","5. adjusted close":"8.5"}
            }}"#,
        );
        let series = normalize_daily("IBM", body, date("2024-01-01")).unwrap();
        let points: Vec<_> = series.iter().map(|(d, p)| (*d, *p)).collect();
        assert_eq!(points, vec![(date("2024-01-02"), 9.5), (date("2024-01-03"), 10.5)]);
    }

    #[test]
    fn throttle_note_is_rate_limited() {
        let body = parse(r#"{"Note":"Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#);
        assert!(matches!(
            normalize_daily("IBM", body, date("2024-01-01")),
            Err(FetchFailure::RateLimited(_))
        ));
    }

    #[test]
    fn error_message_is_not_found() {
        let body = parse(r#"{"Error Message":"Invalid API call."}"#);
        assert!(matches!(
            normalize_daily("NOPE", body, date("2024-01-01")),
            Err(FetchFailure::NotFound(_))
        ));
    }

    #[test]
    fn compact_only_when_start_is_recent() {
        let today = date("2024-06-30");
        assert_eq!(output_size_for(date("2024-05-01"), today), "compact");
        assert_eq!(output_size_for(date("2023-01-01"), today), "full");
    }

    #[tokio::test]
    async fn lookback_is_unsupported_without_a_network_call() {
        let provider = AlphaVantageProvider::new(
            Some("http://127.0.0.1:9".to_string()),
            Some("demo".to_string()),
            Duration::from_millis(50),
        )
        .unwrap();
        let result = provider
            .fetch("IBM", &Window::Lookback(core_types::LookbackPeriod::OneYear))
            .await;
        assert!(matches!(result, Err(FetchFailure::Unsupported(_))));
    }
}
