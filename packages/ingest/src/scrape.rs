//! Stage functions: fetch one level of the hierarchy and map it to rows.
//!
//! Stage functions never touch the store. Checkpoint floors are passed in
//! explicitly; callers decide whether a floor applies at the current
//! position.

use std::collections::{BTreeMap, BTreeSet};

use sejm_mirror_database_models::{
    Club, Mp, MpTermLink, Sitting, SittingDay, Term, Vote, Voting, VotingOption,
};
use sejm_mirror_natural_key::{sitting_day_key, sitting_key, term_key};
use sejm_mirror_source::{SejmSource, SourceError};
use sejm_mirror_source_models::PLANNED_SITTING_NUMBER;

use crate::mapper::{self, SittingScope};

/// Errors raised by stage functions.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Fetching from the source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A vote is marked `VOTE_VALID` but carries no per-option choices.
    #[error(
        "Invalid vote data in term {term}, sitting {sitting}, voting {voting}: \
         MP {mp_term_id} is VOTE_VALID without per-option votes"
    )]
    Integrity {
        term: u32,
        sitting: u32,
        voting: u32,
        mp_term_id: u32,
    },
}

/// Sittings of a term and their calendar days.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedSittings {
    pub sittings: Vec<Sitting>,
    pub sitting_days: Vec<SittingDay>,
}

/// Votings of a sitting and their options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedVotings {
    pub votings: Vec<Voting>,
    pub voting_options: Vec<VotingOption>,
}

/// Legislators of a term and their memberships in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedMps {
    pub mps: Vec<Mp>,
    pub links: Vec<MpTermLink>,
}

/// Votes of one voting plus the options reported alongside them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedVotes {
    pub voting_options: Vec<VotingOption>,
    pub votes: Vec<Vote>,
}

/// Fetches all terms numbered `from_term` or later, in ascending order.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the fetch fails.
pub async fn scrape_terms(
    source: &dyn SejmSource,
    from_term: Option<u32>,
) -> Result<Vec<Term>, ScrapeError> {
    let mut terms: Vec<Term> = source
        .fetch_terms()
        .await?
        .iter()
        .filter(|t| from_term.is_none_or(|floor| t.number >= floor))
        .map(mapper::term)
        .collect();
    terms.sort_by_key(|t| t.number);

    log::debug!("Terms from {from_term:?}: {}", terms.len());

    Ok(terms)
}

/// Fetches the roster of a term.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the fetch fails.
pub async fn scrape_mps(source: &dyn SejmSource, term: u32) -> Result<ScrapedMps, ScrapeError> {
    let (mps, links) = source
        .fetch_mps(term)
        .await?
        .iter()
        .map(|record| mapper::mp(term, record))
        .unzip();

    Ok(ScrapedMps { mps, links })
}

/// Fetches the clubs of a term.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the fetch fails.
pub async fn scrape_clubs(source: &dyn SejmSource, term: u32) -> Result<Vec<Club>, ScrapeError> {
    Ok(source
        .fetch_clubs(term)
        .await?
        .iter()
        .map(|record| mapper::club(term, record))
        .collect())
}

/// Fetches the sittings of a term numbered `from_sitting` or later.
/// Planned sittings are dropped.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the fetch fails.
pub async fn scrape_sittings(
    source: &dyn SejmSource,
    term: u32,
    from_sitting: Option<u32>,
) -> Result<ScrapedSittings, ScrapeError> {
    let mut records = source.fetch_sittings(term).await?;
    records.retain(|s| {
        s.number != PLANNED_SITTING_NUMBER && from_sitting.is_none_or(|floor| s.number >= floor)
    });
    records.sort_by_key(|s| s.number);

    let mut scraped = ScrapedSittings::default();
    for record in &records {
        let (sitting, days) = mapper::sitting(term, record);
        scraped.sittings.push(sitting);
        scraped.sitting_days.extend(days);
    }

    log::debug!(
        "Term {term}: {} sitting(s) from {from_sitting:?}",
        scraped.sittings.len()
    );

    Ok(scraped)
}

/// Derives the sittings of a term from its flat voting table. Used for
/// terms that have votings but no sitting listing.
///
/// Each distinct proceeding number becomes a sitting titled
/// `Posiedzenie nr {n}` with one day per distinct date.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the fetch fails.
pub async fn discover_sittings_from_votings(
    source: &dyn SejmSource,
    term: u32,
    from_sitting: Option<u32>,
) -> Result<ScrapedSittings, ScrapeError> {
    let mut dates_by_sitting: BTreeMap<u32, BTreeSet<_>> = BTreeMap::new();
    for entry in source.fetch_voting_table(term).await? {
        if entry.proceeding == PLANNED_SITTING_NUMBER
            || from_sitting.is_some_and(|floor| entry.proceeding < floor)
        {
            continue;
        }
        dates_by_sitting
            .entry(entry.proceeding)
            .or_default()
            .insert(entry.sitting_date);
    }

    let mut scraped = ScrapedSittings::default();
    for (number, dates) in dates_by_sitting {
        let id = sitting_key(term, number);
        scraped
            .sitting_days
            .extend(dates.into_iter().map(|date| SittingDay {
                id: sitting_day_key(term, number, date),
                sitting_id: id.clone(),
                date,
            }));
        scraped.sittings.push(Sitting {
            id,
            term_id: term_key(term),
            number,
            title: format!("Posiedzenie nr {number}"),
        });
    }

    log::debug!(
        "Term {term}: discovered {} sitting(s) from the voting table",
        scraped.sittings.len()
    );

    Ok(scraped)
}

/// Fetches the votings of a sitting numbered `from_voting` or later.
/// Votings that list no options get the default option.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the fetch fails.
pub async fn scrape_votings(
    source: &dyn SejmSource,
    scope: SittingScope,
    from_voting: Option<u32>,
) -> Result<ScrapedVotings, ScrapeError> {
    let mut records = source.fetch_votings(scope.term, scope.sitting).await?;
    records.retain(|v| from_voting.is_none_or(|floor| v.number >= floor));
    records.sort_by_key(|v| v.number);

    let mut scraped = ScrapedVotings::default();
    for record in &records {
        let voting = mapper::voting(scope, record);
        let identity = scope.voting_identity(&voting);
        scraped.voting_options.extend(mapper::voting_options(
            &identity,
            record.voting_options.as_deref(),
        ));
        scraped.votings.push(voting);
    }

    Ok(scraped)
}

/// Fetches the detail of one voting and expands every legislator's vote.
///
/// The option list of the detail response replaces the one from the
/// sitting listing; older terms disagree between the two.
///
/// # Errors
///
/// Returns [`ScrapeError::Integrity`] on a `VOTE_VALID` vote without
/// per-option choices, or [`ScrapeError::Source`] if the fetch fails.
pub async fn scrape_votes(
    source: &dyn SejmSource,
    scope: SittingScope,
    voting: &Voting,
) -> Result<ScrapedVotes, ScrapeError> {
    let detail = source
        .fetch_voting_detail(scope.term, scope.sitting, voting.number)
        .await?;
    let identity = scope.voting_identity(voting);

    let voting_options =
        mapper::voting_options(&identity, detail.voting.voting_options.as_deref());

    let mut votes = Vec::with_capacity(detail.mp_votes.len());
    for record in &detail.mp_votes {
        let rows = mapper::votes(scope.term, &identity, record).map_err(|e| {
            ScrapeError::Integrity {
                term: scope.term,
                sitting: scope.sitting,
                voting: voting.number,
                mp_term_id: e.mp_term_id,
            }
        })?;
        votes.extend(rows);
    }

    if votes.is_empty() {
        log::warn!(
            "No votes for voting {} of sitting {} (term {})",
            voting.number,
            scope.sitting,
            scope.term
        );
    }

    Ok(ScrapedVotes {
        voting_options,
        votes,
    })
}

/// Combines option lists of the sitting listing and of voting details.
///
/// A voting that has detail options keeps only those, even when the
/// listing reported more. Listing options remain for votings without
/// detail options.
#[must_use]
pub fn authoritative_options(
    listed: Vec<VotingOption>,
    detailed: Vec<VotingOption>,
) -> Vec<VotingOption> {
    let detailed_votings: BTreeSet<String> =
        detailed.iter().map(|o| o.voting_id.clone()).collect();

    listed
        .into_iter()
        .filter(|o| !detailed_votings.contains(&o.voting_id))
        .chain(detailed)
        .collect()
}

#[cfg(test)]
mod tests {
    use sejm_mirror_source_models::VoteValue;

    use super::*;
    use crate::testing::{self, FakeSource};

    const SCOPE: SittingScope = SittingScope {
        term: 10,
        sitting: 39,
    };

    fn date(s: &str) -> chrono::NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn terms_below_the_floor_are_skipped() {
        let source = FakeSource {
            terms: vec![
                testing::term_record(10),
                testing::term_record(8),
                testing::term_record(9),
            ],
            ..FakeSource::default()
        };

        let all = scrape_terms(&source, None).await.unwrap();
        assert_eq!(all.iter().map(|t| t.number).collect::<Vec<_>>(), vec![8, 9, 10]);

        let from_9 = scrape_terms(&source, Some(9)).await.unwrap();
        assert_eq!(from_9.iter().map(|t| t.number).collect::<Vec<_>>(), vec![9, 10]);
    }

    #[tokio::test]
    async fn planned_sitting_is_never_returned() {
        let mut source = FakeSource::default();
        source.sittings.insert(
            10,
            vec![testing::sitting_record(0), testing::sitting_record(1)],
        );

        let scraped = scrape_sittings(&source, 10, None).await.unwrap();
        assert_eq!(scraped.sittings.len(), 1);
        assert_eq!(scraped.sittings[0].number, 1);
        assert_eq!(scraped.sitting_days.len(), 2);
    }

    #[tokio::test]
    async fn sittings_below_the_floor_are_skipped() {
        let mut source = FakeSource::default();
        source.sittings.insert(
            10,
            (1..=5).map(testing::sitting_record).collect(),
        );

        let scraped = scrape_sittings(&source, 10, Some(4)).await.unwrap();
        assert_eq!(
            scraped.sittings.iter().map(|s| s.number).collect::<Vec<_>>(),
            vec![4, 5]
        );
    }

    #[tokio::test]
    async fn voting_table_groups_dates_by_proceeding() {
        let mut source = FakeSource::default();
        source.voting_table.insert(
            5,
            vec![
                testing::table_entry(5, "2025-01-15"),
                testing::table_entry(5, "2025-01-16"),
                testing::table_entry(6, "2025-02-01"),
                testing::table_entry(5, "2025-01-15"),
            ],
        );

        let scraped = discover_sittings_from_votings(&source, 5, None).await.unwrap();

        assert_eq!(scraped.sittings.len(), 2);
        assert_eq!(scraped.sittings[0].number, 5);
        assert_eq!(scraped.sittings[0].title, "Posiedzenie nr 5");
        assert_eq!(scraped.sittings[0].id, sitting_key(5, 5));
        assert_eq!(scraped.sittings[1].title, "Posiedzenie nr 6");

        let days_of_5: Vec<_> = scraped
            .sitting_days
            .iter()
            .filter(|d| d.sitting_id == scraped.sittings[0].id)
            .map(|d| d.date)
            .collect();
        assert_eq!(days_of_5, vec![date("2025-01-15"), date("2025-01-16")]);
        assert_eq!(scraped.sitting_days.len(), 3);
    }

    #[tokio::test]
    async fn voting_table_respects_the_sitting_floor() {
        let mut source = FakeSource::default();
        source.voting_table.insert(
            5,
            vec![
                testing::table_entry(5, "2025-01-15"),
                testing::table_entry(6, "2025-02-01"),
            ],
        );

        let scraped = discover_sittings_from_votings(&source, 5, Some(6)).await.unwrap();
        assert_eq!(scraped.sittings.len(), 1);
        assert_eq!(scraped.sittings[0].number, 6);
    }

    #[tokio::test]
    async fn votings_get_options_and_respect_the_floor() {
        let mut with_options = testing::voting_record(10, 39, 12);
        with_options.voting_options = Some(vec![
            testing::option_record(1, "Kandydat A"),
            testing::option_record(2, "Kandydat B"),
        ]);

        let mut source = FakeSource::default();
        source.votings.insert(
            (10, 39),
            vec![
                testing::voting_record(10, 39, 10),
                testing::voting_record(10, 39, 11),
                with_options,
            ],
        );

        let all = scrape_votings(&source, SCOPE, None).await.unwrap();
        assert_eq!(all.votings.len(), 3);
        assert_eq!(all.voting_options.len(), 4);

        let from_11 = scrape_votings(&source, SCOPE, Some(11)).await.unwrap();
        assert_eq!(
            from_11.votings.iter().map(|v| v.number).collect::<Vec<_>>(),
            vec![11, 12]
        );
        assert_eq!(from_11.voting_options.len(), 3);
    }

    #[tokio::test]
    async fn detail_options_replace_listed_options() {
        let list_voting = mapper::voting(SCOPE, &testing::voting_record(10, 39, 205));

        let mut detail_voting = testing::voting_record(10, 39, 205);
        detail_voting.voting_options = Some(vec![
            testing::option_record(1, "Kandydat A"),
            testing::option_record(2, "Kandydat B"),
        ]);

        let mut source = FakeSource::default();
        source.details.insert(
            (10, 39, 205),
            testing::detail_record(
                detail_voting,
                vec![testing::multi_vote(1, "PiS", &[(1, "YES"), (2, "ABSTAIN")])],
            ),
        );

        let scraped = scrape_votes(&source, SCOPE, &list_voting).await.unwrap();

        assert_eq!(scraped.voting_options.len(), 2);
        assert_eq!(scraped.voting_options[1].label.as_deref(), Some("Kandydat B"));
        assert!(scraped.voting_options.iter().all(|o| o.voting_id == list_voting.id));

        assert_eq!(scraped.votes.len(), 2);
        assert_eq!(scraped.votes[1].vote, VoteValue::Abstain);
        assert_eq!(scraped.votes[1].voting_option_id, scraped.voting_options[1].id);
    }

    #[tokio::test]
    async fn valid_mark_without_choices_aborts_the_voting() {
        let list_voting = mapper::voting(SCOPE, &testing::voting_record(10, 39, 205));

        let mut source = FakeSource::default();
        source.details.insert(
            (10, 39, 205),
            testing::detail_record(
                testing::voting_record(10, 39, 205),
                vec![
                    testing::single_vote(1, "PiS", "YES"),
                    testing::single_vote(2, "KO", "VOTE_VALID"),
                ],
            ),
        );

        let err = scrape_votes(&source, SCOPE, &list_voting).await.unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::Integrity {
                term: 10,
                sitting: 39,
                voting: 205,
                mp_term_id: 2,
            }
        ));
    }

    #[tokio::test]
    async fn roster_and_clubs_are_keyed_per_term() {
        let source = FakeSource::single_voting();

        let mps = scrape_mps(&source, 10).await.unwrap();
        assert_eq!(mps.mps.len(), 1);
        assert_eq!(mps.links[0].term_id, term_key(10));
        assert_eq!(mps.links[0].district_name, "Kraków");

        let clubs = scrape_clubs(&source, 10).await.unwrap();
        assert_eq!(clubs.len(), 1);
        assert_eq!(clubs[0].club_id, "PiS");
    }

    #[tokio::test]
    async fn detail_options_drop_extra_listed_options() {
        let mut listed_record = testing::voting_record(10, 39, 205);
        listed_record.voting_options = Some(vec![
            testing::option_record(1, "Kandydat A"),
            testing::option_record(2, "Kandydat B"),
        ]);
        let mut source = FakeSource::default();
        source.votings.insert(
            (10, 39),
            vec![listed_record, testing::voting_record(10, 39, 206)],
        );
        let listed = scrape_votings(&source, SCOPE, None).await.unwrap();
        assert_eq!(listed.voting_options.len(), 3);

        let detail_for_205 = mapper::voting_options(
            &SCOPE.voting_identity(&listed.votings[0]),
            None,
        );

        let merged = authoritative_options(listed.voting_options, detail_for_205);

        let of_205: Vec<_> = merged
            .iter()
            .filter(|o| o.voting_id == listed.votings[0].id)
            .collect();
        assert_eq!(of_205.len(), 1);
        assert_eq!(of_205[0].option_index, 1);
        assert_eq!(
            merged
                .iter()
                .filter(|o| o.voting_id == listed.votings[1].id)
                .count(),
            1
        );
    }
}
