use crate::error::AcquisitionError;
use crate::retry::RetryPolicy;
use api_client::{FetchFailure, PriceProvider};
use configuration::AcquisitionSettings;
use core_types::{AlignedPriceTable, PriceSeries, Window};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One call against one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub provider: String,
    /// `None` when the attempt produced the series.
    pub failure: Option<FetchFailure>,
}

/// Everything that happened while resolving one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    pub instrument: String,
    /// The provider that supplied the series, if any did.
    pub provider: Option<String>,
    /// Retry attempts across all providers, first attempts excluded.
    pub retries: u32,
    pub attempts: Vec<AttemptRecord>,
}

impl InstrumentReport {
    fn new(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            provider: None,
            retries: 0,
            attempts: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.provider.is_some()
    }

    /// The failure of the final attempt, which is what ended resolution for
    /// an instrument that could not be acquired.
    pub fn last_failure(&self) -> Option<&FetchFailure> {
        self.attempts.last().and_then(|a| a.failure.as_ref())
    }
}

/// The result of one acquisition cycle.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// The intersected table of every instrument that was acquired.
    pub table: AlignedPriceTable,
    /// Instruments for which every provider was exhausted.
    pub failed: BTreeSet<String>,
    /// One report per requested instrument, in request order.
    pub reports: Vec<InstrumentReport>,
}

impl Acquisition {
    pub fn report(&self, instrument: &str) -> Option<&InstrumentReport> {
        self.reports.iter().find(|r| r.instrument == instrument)
    }
}

/// Fetches a set of instruments from providers in priority order.
///
/// Instruments are resolved concurrently up to `max_concurrency`. For each
/// instrument the providers are tried in order: retryable failures are
/// retried with backoff on the same provider, the others fall through to the
/// next provider straight away. The first success wins.
pub struct Orchestrator {
    providers: Vec<Arc<dyn PriceProvider>>,
    retry: RetryPolicy,
    request_timeout: Duration,
    max_concurrency: usize,
}

impl Orchestrator {
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>, settings: &AcquisitionSettings) -> Self {
        Self {
            providers,
            retry: RetryPolicy::from(settings),
            request_timeout: settings.request_timeout,
            max_concurrency: settings.max_concurrency.max(1),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Acquires every instrument and aligns the successes on their common
    /// dates.
    ///
    /// Instruments that no provider could supply are listed in `failed` and
    /// absent from the table. An empty table is an error for the whole
    /// request.
    pub async fn acquire(
        &self,
        instrument_ids: &[String],
        window: &Window,
    ) -> Result<Acquisition, AcquisitionError> {
        validate_request(instrument_ids)?;
        if self.providers.is_empty() {
            return Err(AcquisitionError::InvalidRequest(
                "no price providers are configured".to_string(),
            ));
        }

        info!(
            instruments = instrument_ids.len(),
            providers = ?self.provider_names(),
            %window,
            "Starting acquisition."
        );

        let mut outcomes: Vec<(usize, Option<PriceSeries>, InstrumentReport)> =
            stream::iter(instrument_ids.iter().enumerate())
                .map(|(idx, id)| async move {
                    let (series, report) = self.resolve(id, window).await;
                    (idx, series, report)
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;
        outcomes.sort_by_key(|(idx, _, _)| *idx);

        let mut acquired = Vec::new();
        let mut failed = BTreeSet::new();
        let mut reports = Vec::with_capacity(outcomes.len());
        for (_, series, report) in outcomes {
            match series {
                Some(series) => acquired.push(series),
                None => {
                    failed.insert(report.instrument.clone());
                }
            }
            reports.push(report);
        }

        if acquired.is_empty() {
            return Err(AcquisitionError::AlignmentEmpty(format!(
                "no instrument could be acquired ({} failed)",
                failed.len()
            )));
        }

        let table = AlignedPriceTable::intersect(&acquired)?;
        info!(
            rows = table.len(),
            acquired = table.instruments().len(),
            failed = failed.len(),
            "Acquisition complete."
        );

        Ok(Acquisition {
            table,
            failed,
            reports,
        })
    }

    #[tracing::instrument(name = "acquire", skip(self, window), fields(instrument = %instrument_id))]
    async fn resolve(
        &self,
        instrument_id: &str,
        window: &Window,
    ) -> (Option<PriceSeries>, InstrumentReport) {
        let mut report = InstrumentReport::new(instrument_id);

        for provider in &self.providers {
            let name = provider.name();
            let mut retries_here = 0;
            loop {
                match self.attempt(provider.as_ref(), instrument_id, window).await {
                    Ok(series) => {
                        info!(provider = name, points = series.len(), retries = report.retries, "Acquired.");
                        report.attempts.push(AttemptRecord {
                            provider: name.to_string(),
                            failure: None,
                        });
                        report.provider = Some(name.to_string());
                        return (Some(series), report);
                    }
                    Err(failure) => {
                        warn!(provider = name, kind = failure.kind(), error = %failure, "Attempt failed.");
                        let retry = failure.is_retryable() && self.retry.should_retry(retries_here);
                        report.attempts.push(AttemptRecord {
                            provider: name.to_string(),
                            failure: Some(failure),
                        });
                        if !retry {
                            break;
                        }
                        retries_here += 1;
                        report.retries += 1;
                        let delay = self.retry.delay(retries_here);
                        debug!(provider = name, retry = retries_here, ?delay, "Backing off.");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        warn!(attempts = report.attempts.len(), "Every provider was exhausted.");
        (None, report)
    }

    async fn attempt(
        &self,
        provider: &dyn PriceProvider,
        instrument_id: &str,
        window: &Window,
    ) -> Result<PriceSeries, FetchFailure> {
        let series = tokio::time::timeout(self.request_timeout, provider.fetch(instrument_id, window))
            .await
            .map_err(|_| {
                FetchFailure::Transient(format!("timed out after {:?}", self.request_timeout))
            })??;

        if series.instrument() != instrument_id {
            return Err(FetchFailure::Unsupported(format!(
                "provider returned '{}' for '{instrument_id}'",
                series.instrument()
            )));
        }
        if series.is_empty() {
            return Err(FetchFailure::NotFound(format!("{instrument_id}: empty series")));
        }
        Ok(series)
    }
}

fn validate_request(instrument_ids: &[String]) -> Result<(), AcquisitionError> {
    if instrument_ids.is_empty() {
        return Err(AcquisitionError::InvalidRequest(
            "at least one instrument is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for id in instrument_ids {
        if id.trim().is_empty() {
            return Err(AcquisitionError::InvalidRequest(
                "instrument identifiers must not be empty".to_string(),
            ));
        }
        if !seen.insert(id.as_str()) {
            return Err(AcquisitionError::InvalidRequest(format!(
                "instrument '{id}' is requested more than once"
            )));
        }
    }
    Ok(())
}
