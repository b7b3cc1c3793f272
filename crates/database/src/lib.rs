//! # Folio Database Crate
//!
//! The append-only snapshot sink. Analysis runs write their per-instrument
//! statistics and chart points here; nothing is ever updated or deleted.
//!
//! ## Architectural Principles
//!
//! - **Explicit handle:** there is no global connection. The caller builds a
//!   `DbRepository` from a pool and passes it to whatever writes.
//! - **Single writer:** the pool holds one connection and each batch is one
//!   transaction, so concurrent runs never interleave partial records.
//!
//! ## Public API
//!
//! - `connect` / `connect_to`: open the SQLite pool.
//! - `run_migrations`: apply the embedded schema.
//! - `DbRepository`: reads history and implements `SnapshotSink`.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{DEFAULT_DATABASE_URL, connect, connect_to, run_migrations};
pub use error::DbError;
pub use repository::{
    AnalyticsRecord, DbRepository, PortfolioSnapshot, SnapshotBatch, SnapshotSink,
    StoredAnalytics, StoredSnapshot,
};
