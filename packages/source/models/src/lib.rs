#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Records decoded from the Sejm public-records API.
//!
//! Each type mirrors one endpoint's JSON shape. Required fields are
//! non-optional so a response missing them fails to decode instead of
//! producing a half-populated record.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Sitting number the API uses for planned, not yet scheduled sittings.
pub const PLANNED_SITTING_NUMBER: u32 = 0;

/// A parliamentary term (`/term`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRecord {
    /// Term number.
    #[serde(rename = "num")]
    pub number: u32,
    /// First day of the term.
    #[serde(rename = "from")]
    pub from_date: NaiveDate,
    /// Last day of the term, absent for the current one.
    #[serde(rename = "to", default)]
    pub to_date: Option<NaiveDate>,
}

/// A sitting of the chamber (`/term{N}/proceedings`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SittingRecord {
    /// Sitting number, [`PLANNED_SITTING_NUMBER`] for planned sittings.
    pub number: u32,
    /// Human-readable title.
    pub title: String,
    /// Calendar days the sitting spans.
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
}

/// One row of the flat voting table (`/term{N}/votings`).
///
/// Older terms lack the proceedings endpoint; this table is then the only
/// way to learn which sittings exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingTableEntry {
    /// Sitting (proceeding) number.
    pub proceeding: u32,
    /// Day on which votings took place.
    #[serde(rename = "date")]
    pub sitting_date: NaiveDate,
    /// Number of votings held that day.
    #[serde(rename = "votingsNum", default)]
    pub votings_count: Option<u32>,
}

/// One selectable option of a voting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingOptionRecord {
    /// One-based option index.
    #[serde(rename = "optionIndex")]
    pub index: u32,
    /// Short label, e.g. a candidate name.
    #[serde(rename = "option", default)]
    pub label: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Votes cast for this option.
    #[serde(default)]
    pub votes: Option<u32>,
}

/// A roll-call voting (`/term{N}/votings/{sitting}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingRecord {
    /// Term number.
    pub term: u32,
    /// Sitting number.
    pub sitting: u32,
    /// Ordinal of the day within the sitting.
    pub sitting_day: u32,
    /// Voting number within the sitting.
    #[serde(rename = "votingNumber")]
    pub number: u32,
    /// When the voting took place.
    pub date: NaiveDateTime,
    /// Title of the voting.
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    /// `ELECTRONIC`, `TRADITIONAL` or `ON_LIST`.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub yes: Option<u32>,
    #[serde(default)]
    pub no: Option<u32>,
    #[serde(default)]
    pub abstain: Option<u32>,
    #[serde(default)]
    pub not_participating: Option<u32>,
    #[serde(default)]
    pub present: Option<u32>,
    #[serde(default)]
    pub total_voted: Option<u32>,
    #[serde(default)]
    pub majority_type: Option<String>,
    #[serde(default)]
    pub majority_votes: Option<u32>,
    #[serde(default)]
    pub against_all: Option<u32>,
    /// Explicit options; absent for plain yes/no/abstain votings.
    #[serde(default)]
    pub voting_options: Option<Vec<VotingOptionRecord>>,
}

/// A voting with every legislator's vote
/// (`/term{N}/votings/{sitting}/{voting}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingDetailRecord {
    #[serde(flatten)]
    pub voting: VotingRecord,
    /// Per-legislator votes.
    #[serde(rename = "votes", default)]
    pub mp_votes: Vec<MpVoteRecord>,
}

/// A vote a legislator can cast on one option.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteValue {
    Yes,
    No,
    Abstain,
    Absent,
    Present,
}

/// The top-level `vote` field of a legislator's vote.
///
/// Multi-option votings report `VOTE_VALID` here and carry the actual
/// choices in a per-option map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteMark {
    #[serde(rename = "VOTE_VALID")]
    Valid,
    #[serde(untagged)]
    Value(VoteValue),
}

/// One legislator's vote as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpVoteRecord {
    /// The legislator's term-scoped numeric ID.
    #[serde(rename = "MP")]
    pub mp_term_id: u32,
    /// Club the legislator voted as a member of.
    #[serde(default)]
    pub club: Option<String>,
    pub vote: VoteMark,
    /// Per-option choices for multi-option votings.
    #[serde(rename = "listVotes", default)]
    pub list_votes: Option<BTreeMap<u32, VoteValue>>,
}

/// A legislator's vote in a shape that cannot express the
/// `VOTE_VALID`-without-choices combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ballot {
    /// A plain vote, recorded against the voting's first option.
    SingleOption(VoteValue),
    /// One vote per option index.
    MultiOption(BTreeMap<u32, VoteValue>),
}

/// A vote marked `VOTE_VALID` came without its per-option choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("vote of MP {mp_term_id} is VOTE_VALID but carries no per-option votes")]
pub struct MissingOptionVotes {
    /// The legislator's term-scoped numeric ID.
    pub mp_term_id: u32,
}

impl MpVoteRecord {
    /// Resolves the reported fields into a [`Ballot`].
    ///
    /// # Errors
    ///
    /// Returns [`MissingOptionVotes`] if the vote is marked `VOTE_VALID`
    /// without a per-option map.
    pub fn ballot(&self) -> Result<Ballot, MissingOptionVotes> {
        match (&self.list_votes, self.vote) {
            (Some(choices), _) => Ok(Ballot::MultiOption(choices.clone())),
            (None, VoteMark::Value(value)) => Ok(Ballot::SingleOption(value)),
            (None, VoteMark::Valid) => Err(MissingOptionVotes {
                mp_term_id: self.mp_term_id,
            }),
        }
    }
}

/// A legislator as listed in a term's roster (`/term{N}/MP`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MpRecord {
    /// Term-scoped numeric ID, referenced by votes.
    #[serde(rename = "id")]
    pub in_term_id: u32,
    pub first_name: String,
    #[serde(default)]
    pub second_name: Option<String>,
    pub last_name: String,
    pub birth_date: NaiveDate,
    #[serde(rename = "birthLocation", default)]
    pub birth_place: Option<String>,
    /// Club abbreviation.
    #[serde(default)]
    pub club: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub district_num: Option<u32>,
    pub district_name: String,
    #[serde(default)]
    pub voivodeship: Option<String>,
    #[serde(rename = "educationLevel", default)]
    pub education: Option<String>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub number_of_votes: Option<u32>,
    #[serde(default)]
    pub email: Option<String>,
    // Usually both are present, some records only carry the description.
    #[serde(rename = "inactiveCause", default)]
    pub inactivity_cause: Option<String>,
    #[serde(rename = "waiverDesc", default)]
    pub inactivity_description: Option<String>,
}

/// A parliamentary club (`/term{N}/clubs`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubRecord {
    /// Club abbreviation, e.g. `PiS`.
    #[serde(rename = "id")]
    pub club_id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub fax: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub members_count: Option<u32>,
}
