#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Remote source client for the Sejm public-records API.
//!
//! The ingestion pipeline only depends on the [`SejmSource`] capability.
//! [`client::SejmApiClient`] implements it over HTTP, with every request
//! routed through the [`retry::RetryPolicy`] it was built with.

pub mod client;
pub mod retry;

use async_trait::async_trait;
use sejm_mirror_source_models::{
    ClubRecord, MpRecord, SittingRecord, TermRecord, VotingDetailRecord, VotingRecord,
    VotingTableEntry,
};

/// Errors that can occur while fetching from the remote source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a status that is not retried, or kept
    /// answering with a retryable one until the attempts ran out.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Final status code.
        status: reqwest::StatusCode,
    },

    /// The body was valid JSON but did not match the expected record shape.
    #[error("Failed to decode response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// Returns `true` if the server reported that the resource does not
    /// exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }
}

/// Typed fetch operations, one per level of the API hierarchy.
///
/// Implementations own their retry policy. A returned error is final.
#[async_trait]
pub trait SejmSource: Send + Sync {
    /// Lists all terms.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails.
    async fn fetch_terms(&self) -> Result<Vec<TermRecord>, SourceError>;

    /// Lists the legislators of a term.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails.
    async fn fetch_mps(&self, term: u32) -> Result<Vec<MpRecord>, SourceError>;

    /// Lists the clubs of a term.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails.
    async fn fetch_clubs(&self, term: u32) -> Result<Vec<ClubRecord>, SourceError>;

    /// Lists the sittings of a term. Empty for terms without structured
    /// sitting data.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails.
    async fn fetch_sittings(&self, term: u32) -> Result<Vec<SittingRecord>, SourceError>;

    /// Lists the flat date-to-sitting voting table of a term.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails.
    async fn fetch_voting_table(&self, term: u32) -> Result<Vec<VotingTableEntry>, SourceError>;

    /// Lists the votings of a sitting.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails.
    async fn fetch_votings(
        &self,
        term: u32,
        sitting: u32,
    ) -> Result<Vec<VotingRecord>, SourceError>;

    /// Fetches one voting with every legislator's vote.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails.
    async fn fetch_voting_detail(
        &self,
        term: u32,
        sitting: u32,
        voting: u32,
    ) -> Result<VotingDetailRecord, SourceError>;
}
