use thiserror::Error;

/// Why a single fetch against a single provider did not produce a series.
///
/// The kinds are distinct because the acquisition layer dispatches on them:
/// `RateLimited` and `Transient` are retried on the same provider, the other
/// two fall through to the next provider immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("instrument not found: {0}")]
    NotFound(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("request not supported by this provider: {0}")]
    Unsupported(String),
}

impl FetchFailure {
    /// Whether another attempt on the same provider may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchFailure::RateLimited(_) | FetchFailure::Transient(_))
    }

    /// A short, stable label for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::RateLimited(_) => "rate_limited",
            FetchFailure::NotFound(_) => "not_found",
            FetchFailure::Transient(_) => "transient",
            FetchFailure::Unsupported(_) => "unsupported",
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if let Some(failure) = crate::classify_status(status, &err.to_string()) {
                return failure;
            }
        }
        // Timeouts, refused connections, truncated bodies and undecodable
        // payloads are all worth another attempt.
        FetchFailure::Transient(err.to_string())
    }
}

/// Errors raised while constructing provider clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to build the HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),

    #[error("Invalid provider base URL: {0}")]
    InvalidBaseUrl(String),
}
