//! # Folio Metrics Engine
//!
//! Pure, stateless functions that turn return series into risk and
//! performance statistics: annualized Sharpe ratio, annualized volatility,
//! maximum drawdown, arithmetic annualized return and a Pearson correlation
//! matrix.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** no I/O, no async, no clocks. Depends only on `core-types`.
//! - **Full precision inside:** nothing here rounds. Rounding happens at the
//!   presentation boundary via the `rounded` helpers.
//! - **No silent NaN:** every statistic is a `Metric`, either a finite value or
//!   `Undefined` with the reason.

// Declare the modules that constitute this crate.
pub mod correlation;
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use correlation::{CorrelationMatrix, ReturnMatrix, correlation_matrix};
pub use engine::{
    MetricsEngine, TRADING_DAYS, annualized_return, daily_returns, max_drawdown, sharpe_ratio,
    volatility,
};
pub use error::AnalyticsError;
pub use report::MetricsResult;
