use acquisition::AcquisitionError;
use core_types::CoreError;
use portfolio::PortfolioError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("No common dates across the requested instruments: {0}")]
    AlignmentEmpty(String),

    #[error("Benchmark '{benchmark}' could not be acquired: {reason}")]
    BenchmarkUnavailable { benchmark: String, reason: String },

    #[error("Failed to build the price providers: {0}")]
    Providers(#[from] api_client::error::ApiError),

    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error("An internal calculation error occurred: {0}")]
    Calculation(String),
}

impl From<CoreError> for AnalyzerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidWeights(reason) => AnalyzerError::InvalidWeights(reason),
            CoreError::AlignmentEmpty(reason) => AnalyzerError::AlignmentEmpty(reason),
            other => AnalyzerError::InvalidInput(other.to_string()),
        }
    }
}

impl From<AcquisitionError> for AnalyzerError {
    fn from(err: AcquisitionError) -> Self {
        match err {
            AcquisitionError::AlignmentEmpty(reason) => AnalyzerError::AlignmentEmpty(reason),
            AcquisitionError::InvalidRequest(reason) => AnalyzerError::InvalidInput(reason),
        }
    }
}

impl From<PortfolioError> for AnalyzerError {
    fn from(err: PortfolioError) -> Self {
        match err {
            PortfolioError::InvalidWeights(reason) => AnalyzerError::InvalidWeights(reason),
            PortfolioError::InvalidInput(reason) => AnalyzerError::InvalidInput(reason),
            // The table is built from the same instruments the composer asks
            // for, so this is a bug rather than bad input.
            PortfolioError::MissingInstrument(id) => {
                AnalyzerError::Calculation(format!("'{id}' is missing from the aligned table"))
            }
        }
    }
}
