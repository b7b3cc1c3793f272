use crate::error::{ApiError, FetchFailure};
use crate::responses::YahooChartResponse;
use crate::{PriceProvider, classify_status};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{PriceSeries, Window};
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Daily adjusted closes from the Yahoo Finance chart endpoint.
///
/// Honors both window forms: a lookback maps to `range=`, an explicit start
/// maps to `period1`/`period2`.
#[derive(Clone)]
pub struct YahooChartProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooChartProvider {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        // The endpoint throttles requests without a browser-like agent.
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (compatible; folio/0.1)"),
        );

        let raw = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url =
            Url::parse(&raw).map_err(|e| ApiError::InvalidBaseUrl(format!("{raw}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(raw));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .timeout(timeout)
                .build()?,
            base_url,
        })
    }

    /// The chart endpoint for one instrument, with the identifier
    /// percent-encoded as a single path segment.
    fn chart_url(&self, instrument_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart", instrument_id]);
        }
        url
    }

    fn query_for(window: &Window, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("interval", "1d".to_string()),
            ("events", "div,splits".to_string()),
        ];
        match window {
            Window::Lookback(period) => query.push(("range", period.as_token().to_string())),
            Window::Since(start) => {
                let period1 = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
                query.push(("period1", period1.unwrap_or_default().to_string()));
                query.push(("period2", now.timestamp().to_string()));
            }
        }
        query
    }
}

#[async_trait]
impl PriceProvider for YahooChartProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(&self, instrument_id: &str, window: &Window) -> Result<PriceSeries, FetchFailure> {
        let response = self
            .client
            .get(self.chart_url(instrument_id))
            .query(&Self::query_for(window, Utc::now()))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Yahoo reports unknown symbols as 404 with a chart.error body; try the
        // body first so the description survives.
        let parsed = serde_json::from_str::<YahooChartResponse>(&text);
        if !status.is_success() {
            if let Ok(body) = &parsed {
                if let Some(err) = &body.chart.error {
                    if err.code.eq_ignore_ascii_case("Not Found") {
                        return Err(FetchFailure::NotFound(format!("{instrument_id}: {}", err.description)));
                    }
                }
            }
            return Err(classify_status(status, &text)
                .unwrap_or_else(|| FetchFailure::Transient(format!("unexpected status {status}"))));
        }

        let body = parsed.map_err(|e| FetchFailure::Transient(format!("malformed chart payload: {e}")))?;
        let series = normalize_chart(instrument_id, body)?;

        // Honor an explicit start exactly; the endpoint may hand back an
        // extra bar before period1.
        let series = match window {
            Window::Since(start) => series.since(*start),
            Window::Lookback(_) => series,
        };
        if series.is_empty() {
            return Err(FetchFailure::NotFound(format!("{instrument_id}: no prices since requested start")));
        }
        Ok(series)
    }
}

/// Converts a chart payload into a `PriceSeries`, preferring adjusted closes.
pub(crate) fn normalize_chart(
    instrument_id: &str,
    body: YahooChartResponse,
) -> Result<PriceSeries, FetchFailure> {
    if let Some(err) = body.chart.error {
        return Err(if err.code.eq_ignore_ascii_case("Not Found") {
            FetchFailure::NotFound(format!("{instrument_id}: {}", err.description))
        } else {
            FetchFailure::Transient(format!("{}: {}", err.code, err.description))
        });
    }

    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(FetchFailure::NotFound(format!("{instrument_id}: empty chart result")));
    };

    let closes = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .filter(|a| !a.is_empty())
        .or_else(|| result.indicators.quote.into_iter().next().map(|q| q.close))
        .unwrap_or_default();

    let offset = result.meta.gmtoffset;
    let points = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| Some((exchange_date(*ts, offset)?, close?)));

    let series = PriceSeries::normalized(instrument_id, points);
    if series.is_empty() {
        return Err(FetchFailure::NotFound(format!("{instrument_id}: no prices in window")));
    }
    Ok(series)
}

/// The trading date of a bar, in the exchange's local calendar.
fn exchange_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp + gmtoffset, 0).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::LookbackPeriod;

    fn parse(json: &str) -> YahooChartResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn prefers_adjusted_close_and_skips_null_bars() {
        // Sessions on 2024-01-02..04 at 14:30 UTC; the middle adjusted close is null.
        let body = parse(
            r#"{"chart":{"result":[{
                "meta":{"gmtoffset":-18000},
                "timestamp":[1704205800,1704292200,1704378600],
                "indicators":{
                    "quote":[{"close":[101.0,102.0,103.0]}],
                    "adjclose":[{"adjclose":[100.5,null,102.5]}]
                }}],"error":null}}"#,
        );
        let series = normalize_chart("SPY", body).unwrap();
        let points: Vec<_> = series.iter().map(|(d, p)| (d.to_string(), *p)).collect();
        assert_eq!(
            points,
            vec![("2024-01-02".to_string(), 100.5), ("2024-01-04".to_string(), 102.5)]
        );
    }

    #[test]
    fn falls_back_to_raw_close_without_adjclose() {
        let body = parse(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800],
                "indicators":{"quote":[{"close":[101.0]}]}}],"error":null}}"#,
        );
        let series = normalize_chart("SPY", body).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn chart_error_not_found_maps_to_not_found() {
        let body = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        );
        assert!(matches!(normalize_chart("NOPE", body), Err(FetchFailure::NotFound(_))));
    }

    #[test]
    fn instrument_is_encoded_as_one_path_segment() {
        let provider = YahooChartProvider::new(None, Duration::from_secs(1)).unwrap();
        assert_eq!(
            provider.chart_url("SPY").as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/SPY"
        );
        let url = provider.chart_url("BRK/B?x#y");
        assert_eq!(url.path(), "/v8/finance/chart/BRK%2FB%3Fx%23y");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let proxied =
            YahooChartProvider::new(Some("http://localhost:8080/proxy/".to_string()), Duration::from_secs(1))
                .unwrap();
        assert_eq!(proxied.chart_url("QQQ").path(), "/proxy/v8/finance/chart/QQQ");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            YahooChartProvider::new(Some("not a url".to_string()), Duration::from_secs(1)),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            YahooChartProvider::new(Some("mailto:someone@example.com".to_string()), Duration::from_secs(1)),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn query_uses_range_for_lookback_and_periods_for_start() {
        let now = DateTime::from_timestamp(1_704_205_800, 0).unwrap();
        let lookback = YahooChartProvider::query_for(&Window::Lookback(LookbackPeriod::OneYear), now);
        assert!(lookback.contains(&("range", "1y".to_string())));

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let since = YahooChartProvider::query_for(&Window::Since(start), now);
        assert!(since.contains(&("period1", "1704067200".to_string())));
        assert!(since.contains(&("period2", "1704205800".to_string())));
    }
}
