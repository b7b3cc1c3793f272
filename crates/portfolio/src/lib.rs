//! # Folio Portfolio
//!
//! Two pure calculations over request-local data:
//!
//! - `compose` turns an aligned price table and fixed weights into portfolio
//!   and benchmark return series plus base-normalized value series for charts.
//! - `rebalance` turns current holdings and target weights into a trade plan.

pub mod composer;
pub mod error;
pub mod rebalancer;

// --- Public API ---
pub use composer::{Composition, DEFAULT_CHART_BASE, compose};
pub use error::PortfolioError;
pub use rebalancer::{Trade, TradePlan, rebalance};
