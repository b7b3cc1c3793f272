use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Return matrix columns must have equal length: '{instrument}' has {found} rows, expected {expected}")]
    RaggedMatrix {
        instrument: String,
        expected: usize,
        found: usize,
    },

    #[error("Instrument '{0}' appears more than once in the return matrix")]
    DuplicateInstrument(String),
}
