#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` entity store for the Sejm mirror.
//!
//! The store is a single `DuckDB` file holding one table per entity, keyed
//! by natural key. Writers go through [`upsert::bulk_upsert`], which
//! collapses a batch into one `INSERT ... ON CONFLICT DO UPDATE`
//! statement so that re-ingesting the same records is a no-op.

pub mod paths;
pub mod queries;
pub mod store;
pub mod upsert;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
