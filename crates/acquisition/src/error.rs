use core_types::CoreError;
use thiserror::Error;

/// Request-level acquisition failures. A single instrument running out of
/// providers is not one of these; it is reported in `Acquisition::failed`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    #[error("No common dates across the acquired instruments: {0}")]
    AlignmentEmpty(String),

    #[error("Invalid acquisition request: {0}")]
    InvalidRequest(String),
}

impl From<CoreError> for AcquisitionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AlignmentEmpty(reason) => AcquisitionError::AlignmentEmpty(reason),
            other => AcquisitionError::InvalidRequest(other.to_string()),
        }
    }
}
