//! HTTP implementation of [`SejmSource`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sejm_mirror_source_models::{
    ClubRecord, MpRecord, SittingRecord, TermRecord, VotingDetailRecord, VotingRecord,
    VotingTableEntry,
};

use crate::retry::{self, RetryPolicy};
use crate::{SejmSource, SourceError};

/// Client for the Sejm API.
#[derive(Debug, Clone)]
pub struct SejmApiClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl SejmApiClient {
    /// Creates a client for `base_url` with the given per-request timeout
    /// and the default [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = self.url(path);
        log::debug!("Fetching {url}");
        let value = retry::send_json(&self.retry, || self.http.get(&url)).await?;
        log::debug!("Fetched {url}");
        Ok(value)
    }

    /// Like [`Self::get_json`], but a 404 yields an empty list. Endpoints
    /// that only exist for some terms use this.
    async fn get_optional_list<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, SourceError> {
        match self.get_json(path).await {
            Err(e) if e.is_not_found() => {
                log::debug!("{} not available: {e}", self.url(path));
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

#[async_trait]
impl SejmSource for SejmApiClient {
    async fn fetch_terms(&self) -> Result<Vec<TermRecord>, SourceError> {
        self.get_json("term").await
    }

    async fn fetch_mps(&self, term: u32) -> Result<Vec<MpRecord>, SourceError> {
        self.get_json(&format!("term{term}/MP")).await
    }

    async fn fetch_clubs(&self, term: u32) -> Result<Vec<ClubRecord>, SourceError> {
        self.get_json(&format!("term{term}/clubs")).await
    }

    async fn fetch_sittings(&self, term: u32) -> Result<Vec<SittingRecord>, SourceError> {
        self.get_optional_list(&format!("term{term}/proceedings"))
            .await
    }

    async fn fetch_voting_table(&self, term: u32) -> Result<Vec<VotingTableEntry>, SourceError> {
        self.get_optional_list(&format!("term{term}/votings")).await
    }

    async fn fetch_votings(
        &self,
        term: u32,
        sitting: u32,
    ) -> Result<Vec<VotingRecord>, SourceError> {
        self.get_json(&format!("term{term}/votings/{sitting}"))
            .await
    }

    async fn fetch_voting_detail(
        &self,
        term: u32,
        sitting: u32,
        voting: u32,
    ) -> Result<VotingDetailRecord, SourceError> {
        self.get_json(&format!("term{term}/votings/{sitting}/{voting}"))
            .await
    }
}
