use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid price series for '{instrument}': {reason}")]
    InvalidSeries { instrument: String, reason: String },

    #[error("Invalid window '{0}': expected YYYY-MM-DD or one of 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max")]
    InvalidWindow(String),

    #[error("No common dates across instruments: {0}")]
    AlignmentEmpty(String),
}
