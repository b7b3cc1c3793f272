//! # Folio Acquisition
//!
//! Resolves a set of instruments against the configured price providers and
//! merges whatever succeeded into one `AlignedPriceTable`.
//!
//! Per-instrument failures are not errors here: they are collected in
//! `Acquisition::failed` alongside the partial result. Only an empty
//! alignment, or a malformed request, fails the whole call.

pub mod error;
pub mod orchestrator;
pub mod retry;

// --- Public API ---
pub use error::AcquisitionError;
pub use orchestrator::{Acquisition, AttemptRecord, InstrumentReport, Orchestrator};
pub use retry::RetryPolicy;
