#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resumable ingestion of Sejm records into the local `DuckDB` mirror.
//!
//! [`pipeline::run`] walks terms, rosters, sittings, votings and votes,
//! upserting each level as it goes. [`resume::plan`] derives where an
//! interrupted run should pick up from what the store already holds.

pub mod mapper;
pub mod pipeline;
pub mod resume;
pub mod scrape;

#[cfg(test)]
mod testing;

pub use pipeline::{PipelineError, RunOptions};
pub use scrape::ScrapeError;
