#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion checkpoint, configuration, progress, and result types.

pub mod config;
pub mod progress;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use config::{ConfigError, IngestConfig, RetryConfig};

/// A checkpoint cursor that cannot be honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CheckpointError {
    /// `from_voting` was given without both `from_sitting` and `from_term`.
    #[error("from_voting can only be set if from_sitting and from_term are also set")]
    VotingWithoutSitting,

    /// `from_sitting` was given without `from_term`.
    #[error("from_sitting can only be set if from_term is also set")]
    SittingWithoutTerm,
}

/// Where a pipeline run starts.
///
/// Each cursor is inclusive. A deeper cursor only applies inside the
/// exact term (and sitting) named by the shallower ones, so once the
/// traversal moves past the checkpoint every sibling is processed in
/// full. The constructor rejects cursors that skip a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checkpoint {
    from_term: Option<u32>,
    from_sitting: Option<u32>,
    from_voting: Option<u32>,
}

impl Checkpoint {
    /// A checkpoint that processes everything.
    #[must_use]
    pub const fn start() -> Self {
        Self {
            from_term: None,
            from_sitting: None,
            from_voting: None,
        }
    }

    /// Starts at `term`.
    #[must_use]
    pub const fn at_term(term: u32) -> Self {
        Self {
            from_term: Some(term),
            from_sitting: None,
            from_voting: None,
        }
    }

    /// Starts at `sitting` of `term`.
    #[must_use]
    pub const fn at_sitting(term: u32, sitting: u32) -> Self {
        Self {
            from_term: Some(term),
            from_sitting: Some(sitting),
            from_voting: None,
        }
    }

    /// Starts at `voting` of `sitting` of `term`.
    #[must_use]
    pub const fn at_voting(term: u32, sitting: u32, voting: u32) -> Self {
        Self {
            from_term: Some(term),
            from_sitting: Some(sitting),
            from_voting: Some(voting),
        }
    }

    /// Validates and builds a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if `from_voting` is set without
    /// `from_sitting` and `from_term`, or `from_sitting` without
    /// `from_term`.
    pub const fn new(
        from_term: Option<u32>,
        from_sitting: Option<u32>,
        from_voting: Option<u32>,
    ) -> Result<Self, CheckpointError> {
        if from_voting.is_some() && (from_sitting.is_none() || from_term.is_none()) {
            return Err(CheckpointError::VotingWithoutSitting);
        }
        if from_sitting.is_some() && from_term.is_none() {
            return Err(CheckpointError::SittingWithoutTerm);
        }
        Ok(Self {
            from_term,
            from_sitting,
            from_voting,
        })
    }

    #[must_use]
    pub const fn from_term(&self) -> Option<u32> {
        self.from_term
    }

    /// Lowest sitting number to process within `term`.
    #[must_use]
    pub fn sitting_floor(&self, term: u32) -> Option<u32> {
        if self.from_term == Some(term) {
            self.from_sitting
        } else {
            None
        }
    }

    /// Lowest voting number to process within `sitting` of `term`.
    #[must_use]
    pub fn voting_floor(&self, term: u32, sitting: u32) -> Option<u32> {
        if self.from_term == Some(term) && self.from_sitting == Some(sitting) {
            self.from_voting
        } else {
            None
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from_term, self.from_sitting, self.from_voting) {
            (None, _, _) => write!(f, "start"),
            (Some(t), None, _) => write!(f, "term {t}"),
            (Some(t), Some(s), None) => write!(f, "term {t}, sitting {s}"),
            (Some(t), Some(s), Some(v)) => write!(f, "term {t}, sitting {s}, voting {v}"),
        }
    }
}

/// Totals of a completed pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Terms processed.
    pub terms: u64,
    /// Sittings processed.
    pub sittings: u64,
    /// Votings processed.
    pub votings: u64,
    /// Vote records written.
    pub votes: u64,
    /// Legislators written across all terms.
    pub mps: u64,
    /// Clubs written across all terms.
    pub clubs: u64,
    /// How long the run took.
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} term(s), {} sitting(s), {} voting(s), {} vote(s), {} MP(s), {} club(s) in {:.1}s",
            self.terms,
            self.sittings,
            self.votings,
            self.votes,
            self.mps,
            self.clubs,
            self.elapsed.as_secs_f64(),
        )
    }
}
