#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Row types of the entity store.
//!
//! These are the shapes persisted in `DuckDB`. They are distinct from the
//! wire records in `sejm_mirror_source_models`: every row carries its
//! natural key as `id` and references its parent by the parent's key.

use chrono::{NaiveDate, NaiveDateTime};
pub use sejm_mirror_source_models::VoteValue;
use serde::{Deserialize, Serialize};

/// A parliamentary term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub number: u32,
    pub from_date: NaiveDate,
    pub to_date: Option<NaiveDate>,
}

/// A sitting (multi-day session) of a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitting {
    pub id: String,
    pub term_id: String,
    pub number: u32,
    pub title: String,
}

/// One calendar day of a sitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SittingDay {
    pub id: String,
    pub sitting_id: String,
    pub date: NaiveDate,
}

/// A single voting event within a sitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voting {
    pub id: String,
    pub sitting_id: String,
    pub number: u32,
    /// Ordinal of the day within the sitting.
    pub sitting_day: u32,
    pub date: NaiveDateTime,
    pub title: String,
    pub description: Option<String>,
    pub topic: Option<String>,
    pub kind: Option<String>,
    pub yes: Option<u32>,
    pub no: Option<u32>,
    pub abstain: Option<u32>,
    pub not_participating: Option<u32>,
    pub present: Option<u32>,
    pub total_voted: Option<u32>,
    pub majority_type: Option<String>,
    pub majority_votes: Option<u32>,
    pub against_all: Option<u32>,
}

/// One selectable option of a voting. Plain yes/no votings have exactly
/// one option with index 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingOption {
    pub id: String,
    pub voting_id: String,
    pub option_index: u32,
    pub label: Option<String>,
    pub description: Option<String>,
    pub votes: Option<u32>,
}

/// A club (parliamentary party) within a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: String,
    pub term_id: String,
    /// Source-assigned short name, e.g. `PiS`.
    pub club_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub members_count: Option<u32>,
}

/// A legislator, independent of any term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mp {
    pub id: String,
    pub first_name: String,
    pub second_name: Option<String>,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub birth_place: Option<String>,
}

/// A legislator's membership in one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpTermLink {
    pub id: String,
    pub mp_id: String,
    pub term_id: String,
    /// The legislator's term-scoped numeric ID, as referenced by votes.
    pub in_term_id: u32,
    pub active: Option<bool>,
    pub club: Option<String>,
    pub district_num: Option<u32>,
    pub district_name: String,
    pub voivodeship: Option<String>,
    pub education: Option<String>,
    pub profession: Option<String>,
    pub number_of_votes: Option<u32>,
    pub email: Option<String>,
    pub inactivity_cause: Option<String>,
    pub inactivity_description: Option<String>,
}

/// One legislator's vote on one voting option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub voting_option_id: String,
    pub term_id: String,
    pub mp_term_id: u32,
    pub vote: VoteValue,
    pub club: Option<String>,
}

/// Every entity table, parents before children.
pub const ENTITY_TABLES: [&str; 9] = [
    "term",
    "sitting",
    "sitting_day",
    "voting",
    "voting_option",
    "club",
    "mp",
    "mp_term_link",
    "vote",
];

/// Row counts of every entity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub terms: u64,
    pub sittings: u64,
    pub sitting_days: u64,
    pub votings: u64,
    pub voting_options: u64,
    pub clubs: u64,
    pub mps: u64,
    pub mp_term_links: u64,
    pub votes: u64,
}

impl TableCounts {
    /// Returns `(table name, count)` pairs in [`ENTITY_TABLES`] order.
    #[must_use]
    pub const fn entries(&self) -> [(&'static str, u64); 9] {
        let t = ENTITY_TABLES;
        [
            (t[0], self.terms),
            (t[1], self.sittings),
            (t[2], self.sitting_days),
            (t[3], self.votings),
            (t[4], self.voting_options),
            (t[5], self.clubs),
            (t[6], self.mps),
            (t[7], self.mp_term_links),
            (t[8], self.votes),
        ]
    }

    /// Total rows across all tables.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.terms
            + self.sittings
            + self.sitting_days
            + self.votings
            + self.voting_options
            + self.clubs
            + self.mps
            + self.mp_term_links
            + self.votes
    }
}
