use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    #[error("Instrument '{0}' is not in the aligned price table")]
    MissingInstrument(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<CoreError> for PortfolioError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidWeights(reason) => PortfolioError::InvalidWeights(reason),
            other => PortfolioError::InvalidInput(other.to_string()),
        }
    }
}
