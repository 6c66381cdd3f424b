//! Resume planner.
//!
//! The pipeline commits a sitting together with its votings and votes, so
//! the deepest stored `(term, sitting, voting)` names the last fully
//! committed sitting. The planned checkpoint points *at* its last voting
//! rather than past it; re-writing that voting is harmless because every
//! write is an upsert. A sitting that failed part-way left nothing behind
//! and is fetched in full.

use duckdb::Connection;
use sejm_mirror_database::DbError;
use sejm_mirror_database::queries::{max_sitting_number, max_term_number, max_voting_number};
use sejm_mirror_ingest_models::{Checkpoint, RunSummary};
use sejm_mirror_natural_key::{sitting_key, term_key};
use sejm_mirror_source::SejmSource;

use crate::pipeline::{self, PipelineError, RunOptions};

/// Derives the checkpoint to resume from: the highest stored term, its
/// highest stored sitting and that sitting's highest stored voting, as
/// deep as the store goes.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn plan(conn: &Connection) -> Result<Checkpoint, DbError> {
    let Some(term) = max_term_number(conn)? else {
        return Ok(Checkpoint::start());
    };
    let Some(sitting) = max_sitting_number(conn, &term_key(term))? else {
        return Ok(Checkpoint::at_term(term));
    };
    let Some(voting) = max_voting_number(conn, &sitting_key(term, sitting))? else {
        return Ok(Checkpoint::at_sitting(term, sitting));
    };
    Ok(Checkpoint::at_voting(term, sitting, voting))
}

/// Plans a checkpoint from the store and runs the pipeline from it.
///
/// # Errors
///
/// Returns [`PipelineError`] if planning or the run fails.
pub async fn resume_pipeline(
    source: &dyn SejmSource,
    conn: &Connection,
    options: &RunOptions,
) -> Result<RunSummary, PipelineError> {
    let checkpoint = plan(conn)?;
    log::info!("Resuming from {checkpoint}");
    pipeline::run(source, conn, checkpoint, options).await
}

#[cfg(test)]
mod tests {
    use sejm_mirror_database::store::open_in_memory;
    use sejm_mirror_database::upsert::bulk_upsert;

    use super::*;
    use crate::mapper::{self, SittingScope};
    use crate::testing::{self, FakeSource};

    fn store_term(conn: &Connection, number: u32) {
        bulk_upsert(conn, &[mapper::term(&testing::term_record(number))]).unwrap();
    }

    fn store_sitting(conn: &Connection, term: u32, number: u32) {
        let (sitting, _) = mapper::sitting(term, &testing::sitting_record(number));
        bulk_upsert(conn, &[sitting]).unwrap();
    }

    fn store_voting(conn: &Connection, term: u32, sitting: u32, number: u32) {
        let scope = SittingScope { term, sitting };
        let voting = mapper::voting(scope, &testing::voting_record(term, sitting, number));
        bulk_upsert(conn, &[voting]).unwrap();
    }

    #[test]
    fn empty_store_starts_from_scratch() {
        let conn = open_in_memory().unwrap();
        assert_eq!(plan(&conn).unwrap(), Checkpoint::start());
    }

    #[test]
    fn term_without_sittings_resumes_at_the_term() {
        let conn = open_in_memory().unwrap();
        store_term(&conn, 9);
        store_term(&conn, 10);
        assert_eq!(plan(&conn).unwrap(), Checkpoint::at_term(10));
    }

    #[test]
    fn sitting_without_votings_resumes_at_the_sitting() {
        let conn = open_in_memory().unwrap();
        store_term(&conn, 10);
        store_sitting(&conn, 10, 3);
        store_sitting(&conn, 10, 4);
        assert_eq!(plan(&conn).unwrap(), Checkpoint::at_sitting(10, 4));
    }

    #[test]
    fn resumes_at_the_latest_voting_of_the_latest_sitting() {
        let conn = open_in_memory().unwrap();
        store_term(&conn, 10);
        store_sitting(&conn, 10, 3);
        store_sitting(&conn, 10, 4);
        store_voting(&conn, 10, 3, 90);
        store_voting(&conn, 10, 4, 7);
        store_voting(&conn, 10, 4, 12);
        assert_eq!(plan(&conn).unwrap(), Checkpoint::at_voting(10, 4, 12));
    }

    #[test]
    fn deeper_levels_of_older_terms_are_ignored() {
        let conn = open_in_memory().unwrap();
        store_term(&conn, 9);
        store_sitting(&conn, 9, 80);
        store_term(&conn, 10);
        assert_eq!(plan(&conn).unwrap(), Checkpoint::at_term(10));
    }

    #[tokio::test]
    async fn resume_refetches_the_last_voting() {
        let source = FakeSource::single_voting();
        let conn = open_in_memory().unwrap();

        pipeline::run(&source, &conn, Checkpoint::start(), &RunOptions::default())
            .await
            .unwrap();
        let before = sejm_mirror_database::queries::table_counts(&conn).unwrap();
        source.detail_requests.lock().unwrap().clear();

        resume_pipeline(&source, &conn, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(
            *source.detail_requests.lock().unwrap(),
            vec![(10, 39, 205)]
        );
        assert_eq!(
            sejm_mirror_database::queries::table_counts(&conn).unwrap(),
            before
        );
    }

    fn votes_of_voting(conn: &Connection, sitting: u32, voting: u32) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM vote v \
             JOIN voting_option o ON o.id = v.voting_option_id \
             JOIN voting g ON g.id = o.voting_id \
             JOIN sitting s ON s.id = g.sitting_id \
             WHERE s.number = ? AND g.number = ?",
            duckdb::params![sitting, voting],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn failure_in_an_earlier_sitting_is_fetched_again() {
        let mut source = FakeSource::single_voting();
        source.sittings.insert(
            10,
            vec![testing::sitting_record(39), testing::sitting_record(40)],
        );
        let later = testing::voting_record(10, 40, 1);
        source.votings.insert((10, 40), vec![later.clone()]);
        source.details.insert(
            (10, 40, 1),
            testing::detail_record(later, vec![testing::single_vote(1, "PiS", "YES")]),
        );
        let detail_39 = source.details.remove(&(10, 39, 205)).unwrap();
        let conn = open_in_memory().unwrap();

        pipeline::run(&source, &conn, Checkpoint::start(), &RunOptions::default())
            .await
            .unwrap_err();
        assert_eq!(plan(&conn).unwrap(), Checkpoint::at_term(10));

        source.details.insert((10, 39, 205), detail_39);
        resume_pipeline(&source, &conn, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(votes_of_voting(&conn, 39, 205), 1);
        assert_eq!(votes_of_voting(&conn, 40, 1), 1);
        assert_eq!(plan(&conn).unwrap(), Checkpoint::at_voting(10, 40, 1));
    }

    #[tokio::test]
    async fn failure_inside_a_sitting_refetches_its_earlier_votings() {
        let mut source = FakeSource::single_voting();
        let earlier = testing::voting_record(10, 39, 204);
        source
            .votings
            .insert((10, 39), vec![earlier.clone(), testing::voting_record(10, 39, 205)]);
        let conn = open_in_memory().unwrap();

        pipeline::run(&source, &conn, Checkpoint::start(), &RunOptions::default())
            .await
            .unwrap_err();
        assert_eq!(plan(&conn).unwrap(), Checkpoint::at_term(10));

        source.details.insert(
            (10, 39, 204),
            testing::detail_record(earlier, vec![testing::single_vote(1, "PiS", "YES")]),
        );
        resume_pipeline(&source, &conn, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(votes_of_voting(&conn, 39, 204), 1);
        assert_eq!(votes_of_voting(&conn, 39, 205), 1);
    }

    #[tokio::test]
    async fn failure_after_a_committed_sitting_resumes_at_its_last_voting() {
        let mut source = FakeSource::single_voting();
        source.sittings.insert(
            10,
            vec![testing::sitting_record(39), testing::sitting_record(40)],
        );
        source
            .votings
            .insert((10, 40), vec![testing::voting_record(10, 40, 1)]);
        let conn = open_in_memory().unwrap();

        pipeline::run(&source, &conn, Checkpoint::start(), &RunOptions::default())
            .await
            .unwrap_err();

        assert_eq!(plan(&conn).unwrap(), Checkpoint::at_voting(10, 39, 205));
        assert_eq!(votes_of_voting(&conn, 39, 205), 1);
    }
}
