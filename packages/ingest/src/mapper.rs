//! Conversion of API records into keyed store rows.
//!
//! Every function here is pure: the same record in the same context always
//! maps to the same rows with the same natural keys.

use sejm_mirror_database_models::{
    Club, Mp, MpTermLink, Sitting, SittingDay, Term, Vote, Voting, VotingOption,
};
use sejm_mirror_natural_key::{
    MpIdentity, VotingIdentity, club_key, sitting_day_key, sitting_key, term_key,
};
use sejm_mirror_source_models::{
    Ballot, ClubRecord, MissingOptionVotes, MpRecord, MpVoteRecord, SittingRecord, TermRecord,
    VotingOptionRecord, VotingRecord,
};

/// Index of the option that plain votings and single-option votes use.
pub const DEFAULT_OPTION_INDEX: u32 = 1;

/// Label of the option synthesized for votings that list none.
pub const DEFAULT_OPTION_LABEL: &str = "Default option (no options provided)";

/// A sitting's position in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SittingScope {
    pub term: u32,
    pub sitting: u32,
}

impl SittingScope {
    #[must_use]
    pub fn sitting_id(&self) -> String {
        sitting_key(self.term, self.sitting)
    }

    /// Identity of a stored voting of this sitting.
    #[must_use]
    pub fn voting_identity(&self, voting: &Voting) -> VotingIdentity {
        VotingIdentity {
            term: self.term,
            sitting: self.sitting,
            sitting_day: voting.sitting_day,
            number: voting.number,
            date: voting.date.date(),
        }
    }
}

#[must_use]
pub fn term(record: &TermRecord) -> Term {
    Term {
        id: term_key(record.number),
        number: record.number,
        from_date: record.from_date,
        to_date: record.to_date,
    }
}

/// Maps a sitting and one [`SittingDay`] per listed date.
#[must_use]
pub fn sitting(term: u32, record: &SittingRecord) -> (Sitting, Vec<SittingDay>) {
    let sitting = Sitting {
        id: sitting_key(term, record.number),
        term_id: term_key(term),
        number: record.number,
        title: record.title.clone(),
    };
    let days = record
        .dates
        .iter()
        .map(|&date| SittingDay {
            id: sitting_day_key(term, record.number, date),
            sitting_id: sitting.id.clone(),
            date,
        })
        .collect();
    (sitting, days)
}

#[must_use]
pub fn voting(scope: SittingScope, record: &VotingRecord) -> Voting {
    let identity = VotingIdentity {
        term: scope.term,
        sitting: scope.sitting,
        sitting_day: record.sitting_day,
        number: record.number,
        date: record.date.date(),
    };

    Voting {
        id: identity.key(),
        sitting_id: scope.sitting_id(),
        number: record.number,
        sitting_day: record.sitting_day,
        date: record.date,
        title: record.title.clone(),
        description: record.description.clone(),
        topic: record.topic.clone(),
        kind: record.kind.clone(),
        yes: record.yes,
        no: record.no,
        abstain: record.abstain,
        not_participating: record.not_participating,
        present: record.present,
        total_voted: record.total_voted,
        majority_type: record.majority_type.clone(),
        majority_votes: record.majority_votes,
        against_all: record.against_all,
    }
}

/// Maps the options of a voting. A voting without options gets the single
/// default option.
#[must_use]
pub fn voting_options(
    identity: &VotingIdentity,
    options: Option<&[VotingOptionRecord]>,
) -> Vec<VotingOption> {
    let voting_id = identity.key();

    match options {
        Some(options) if !options.is_empty() => options
            .iter()
            .map(|option| VotingOption {
                id: identity.option_key(option.index),
                voting_id: voting_id.clone(),
                option_index: option.index,
                label: option.label.clone(),
                description: option.description.clone(),
                votes: option.votes,
            })
            .collect(),
        _ => vec![VotingOption {
            id: identity.option_key(DEFAULT_OPTION_INDEX),
            voting_id,
            option_index: DEFAULT_OPTION_INDEX,
            label: Some(DEFAULT_OPTION_LABEL.to_string()),
            description: None,
            votes: Some(0),
        }],
    }
}

/// Expands one legislator's vote into one row per option voted on.
///
/// # Errors
///
/// Returns [`MissingOptionVotes`] if the vote is marked `VOTE_VALID` but
/// carries no per-option choices.
pub fn votes(
    term: u32,
    identity: &VotingIdentity,
    record: &MpVoteRecord,
) -> Result<Vec<Vote>, MissingOptionVotes> {
    let term_id = term_key(term);
    let row = |option_index: u32, vote| Vote {
        id: identity.vote_key(option_index, record.mp_term_id),
        voting_option_id: identity.option_key(option_index),
        term_id: term_id.clone(),
        mp_term_id: record.mp_term_id,
        vote,
        club: record.club.clone(),
    };

    Ok(match record.ballot()? {
        Ballot::SingleOption(vote) => vec![row(DEFAULT_OPTION_INDEX, vote)],
        Ballot::MultiOption(choices) => choices
            .into_iter()
            .map(|(option_index, vote)| row(option_index, vote))
            .collect(),
    })
}

/// Maps a roster entry to the term-independent legislator and their
/// membership in `term`.
#[must_use]
pub fn mp(term: u32, record: &MpRecord) -> (Mp, MpTermLink) {
    let identity = MpIdentity {
        first_name: &record.first_name,
        last_name: &record.last_name,
        birth_date: record.birth_date,
        birth_place: record.birth_place.as_deref(),
    };
    let mp = Mp {
        id: identity.key(),
        first_name: record.first_name.clone(),
        second_name: record.second_name.clone(),
        last_name: record.last_name.clone(),
        birth_date: record.birth_date,
        birth_place: record.birth_place.clone(),
    };
    let link = MpTermLink {
        id: identity.term_link_key(term),
        mp_id: mp.id.clone(),
        term_id: term_key(term),
        in_term_id: record.in_term_id,
        active: record.active,
        club: record.club.clone(),
        district_num: record.district_num,
        district_name: record.district_name.clone(),
        voivodeship: record.voivodeship.clone(),
        education: record.education.clone(),
        profession: record.profession.clone(),
        number_of_votes: record.number_of_votes,
        email: record.email.clone(),
        inactivity_cause: record.inactivity_cause.clone(),
        inactivity_description: record.inactivity_description.clone(),
    };
    (mp, link)
}

#[must_use]
pub fn club(term: u32, record: &ClubRecord) -> Club {
    Club {
        id: club_key(term, &record.club_id),
        term_id: term_key(term),
        club_id: record.club_id.clone(),
        name: record.name.clone(),
        phone: record.phone.clone(),
        fax: record.fax.clone(),
        email: record.email.clone(),
        members_count: record.members_count,
    }
}
