//! Pipeline orchestrator.
//!
//! Walks terms, rosters, sittings, votings and votes in order. A sitting is
//! the unit of progress: its votings' details are fetched concurrently and
//! the sitting row, its days, votings, options and votes are written
//! together in one transaction once all of them have arrived. A term row is
//! committed together with its roster, before any of its sittings.
//!
//! The deepest stored `(term, sitting, voting)` therefore always belongs to
//! a fully committed sitting, which is what the resume planner relies on.

use std::sync::Arc;
use std::time::Instant;

use duckdb::Connection;
use futures::{StreamExt as _, TryStreamExt as _, stream};
use sejm_mirror_database::DbError;
use sejm_mirror_database::store::in_transaction;
use sejm_mirror_database::upsert::bulk_upsert;
use sejm_mirror_database_models::{Sitting, SittingDay, Term};
use sejm_mirror_ingest_models::progress::{ProgressCallback, null_progress};
use sejm_mirror_ingest_models::{Checkpoint, CheckpointError, RunSummary};
use sejm_mirror_source::SejmSource;

use crate::mapper::SittingScope;
use crate::scrape::{self, ScrapeError, ScrapedVotes};

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The checkpoint cursors are inconsistent.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Fetching or mapping failed.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// Writing to the store failed.
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Knobs of a pipeline run.
#[derive(Clone)]
pub struct RunOptions {
    /// Maximum vote-detail requests in flight. Zero is treated as one.
    pub max_concurrent_fetches: usize,
    /// Receives one step per processed sitting.
    pub progress: Arc<dyn ProgressCallback>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            progress: null_progress(),
        }
    }
}

/// Validates the raw cursors and runs the pipeline from them.
///
/// Invalid cursors are rejected before anything is fetched.
///
/// # Errors
///
/// Returns [`PipelineError::Checkpoint`] for illegal cursors, otherwise
/// whatever [`run`] returns.
pub async fn run_from(
    source: &dyn SejmSource,
    conn: &Connection,
    from_term: Option<u32>,
    from_sitting: Option<u32>,
    from_voting: Option<u32>,
    options: &RunOptions,
) -> Result<RunSummary, PipelineError> {
    let checkpoint = Checkpoint::new(from_term, from_sitting, from_voting)?;
    run(source, conn, checkpoint, options).await
}

/// Runs the pipeline from `checkpoint`.
///
/// Sittings committed before an error stay committed; nothing of the
/// sitting that was in progress is written.
///
/// # Errors
///
/// Returns [`PipelineError`] on the first fetch, integrity or storage
/// failure.
pub async fn run(
    source: &dyn SejmSource,
    conn: &Connection,
    checkpoint: Checkpoint,
    options: &RunOptions,
) -> Result<RunSummary, PipelineError> {
    let start = Instant::now();
    let mut summary = RunSummary::default();

    log::info!("Starting pipeline from {checkpoint}");

    let terms = scrape::scrape_terms(source, checkpoint.from_term()).await?;
    if terms.is_empty() {
        log::warn!("No terms found from {checkpoint}");
    }

    for term in &terms {
        run_term(source, conn, term, checkpoint, options, &mut summary).await?;
        summary.terms += 1;
    }

    summary.elapsed = start.elapsed();
    options.progress.finish(format!("Done: {summary}"));
    log::info!("Pipeline complete: {summary}");

    Ok(summary)
}

async fn run_term(
    source: &dyn SejmSource,
    conn: &Connection,
    term: &Term,
    checkpoint: Checkpoint,
    options: &RunOptions,
    summary: &mut RunSummary,
) -> Result<(), PipelineError> {
    let number = term.number;
    log::info!("Term {number}: scraping roster and clubs");

    let roster = scrape::scrape_mps(source, number).await?;
    if roster.mps.is_empty() {
        log::warn!("Term {number}: empty roster");
    }
    let clubs = scrape::scrape_clubs(source, number).await?;
    if clubs.is_empty() {
        log::warn!("Term {number}: no clubs");
    }
    in_transaction(conn, |c| {
        bulk_upsert(c, std::slice::from_ref(term))?;
        bulk_upsert(c, &roster.mps)?;
        bulk_upsert(c, &roster.links)?;
        bulk_upsert(c, &clubs)
    })?;
    summary.mps += roster.mps.len() as u64;
    summary.clubs += clubs.len() as u64;
    log::info!(
        "Term {number}: upserted {} MP(s), {} club(s)",
        roster.mps.len(),
        clubs.len()
    );

    let floor = checkpoint.sitting_floor(number);
    let mut sittings = scrape::scrape_sittings(source, number, floor).await?;
    if sittings.sittings.is_empty() {
        log::info!("Term {number}: no sitting listing, falling back to the voting table");
        sittings = scrape::discover_sittings_from_votings(source, number, floor).await?;
    }
    if sittings.sittings.is_empty() {
        log::warn!("Term {number}: no sittings found");
    }

    options.progress.set_total(sittings.sittings.len() as u64);
    options.progress.set_message(format!("Term {number}"));

    for sitting in &sittings.sittings {
        let days: Vec<SittingDay> = sittings
            .sitting_days
            .iter()
            .filter(|day| day.sitting_id == sitting.id)
            .cloned()
            .collect();
        run_sitting(source, conn, sitting, &days, number, checkpoint, options, summary).await?;
        options.progress.inc(1);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_sitting(
    source: &dyn SejmSource,
    conn: &Connection,
    sitting: &Sitting,
    days: &[SittingDay],
    term: u32,
    checkpoint: Checkpoint,
    options: &RunOptions,
    summary: &mut RunSummary,
) -> Result<(), PipelineError> {
    let scope = SittingScope {
        term,
        sitting: sitting.number,
    };

    let votings =
        scrape::scrape_votings(source, scope, checkpoint.voting_floor(term, sitting.number))
            .await?;
    if votings.votings.is_empty() {
        log::warn!("Term {term}, sitting {}: no votings", sitting.number);
    }

    let details: Vec<ScrapedVotes> = stream::iter(
        votings
            .votings
            .iter()
            .map(|voting| scrape::scrape_votes(source, scope, voting)),
    )
    .buffer_unordered(options.max_concurrent_fetches.max(1))
    .try_collect()
    .await?;

    let mut detail_options = Vec::new();
    let mut votes = Vec::new();
    for detail in details {
        detail_options.extend(detail.voting_options);
        votes.extend(detail.votes);
    }
    let voting_options = scrape::authoritative_options(votings.voting_options, detail_options);

    let written = in_transaction(conn, |c| {
        bulk_upsert(c, std::slice::from_ref(sitting))?;
        bulk_upsert(c, days)?;
        bulk_upsert(c, &votings.votings)?;
        bulk_upsert(c, &voting_options)?;
        bulk_upsert(c, &votes)
    })?;

    summary.sittings += 1;
    summary.votings += votings.votings.len() as u64;
    summary.votes += votes.len() as u64;

    log::info!(
        "Term {term}, sitting {}: {} voting(s), {written} vote(s) upserted",
        sitting.number,
        votings.votings.len()
    );

    Ok(())
}
