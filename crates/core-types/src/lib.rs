//! # Folio Core Types
//!
//! Layer 0 of the workspace. Every other crate speaks in these types: the
//! request window, the canonical `PriceSeries` that each provider adapter
//! normalizes into, the intersected `AlignedPriceTable`, normalized `Weights`
//! and the `Metric` sentinel used wherever a statistic can be undefined.
//!
//! This crate holds no I/O and no async code.

pub mod error;
pub mod metric;
pub mod series;
pub mod weights;
pub mod window;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use metric::{MAX_DECIMAL_PLACES, Metric, UndefinedReason, round_to};
pub use series::{AlignedPriceTable, PriceSeries};
pub use weights::Weights;
pub use window::{LookbackPeriod, Window};
