//! Read-side queries: resume cursors, row counts, and Parquet export.

use std::path::{Path, PathBuf};

use duckdb::Connection;
use sejm_mirror_database_models::{ENTITY_TABLES, TableCounts};

use crate::DbError;

fn to_number(value: Option<i64>, what: &str) -> Result<Option<u32>, DbError> {
    value
        .map(|n| {
            u32::try_from(n).map_err(|_| DbError::Conversion {
                message: format!("{what} {n} is out of range"),
            })
        })
        .transpose()
}

fn max_number(
    conn: &Connection,
    sql: &str,
    parent_id: Option<&str>,
    what: &str,
) -> Result<Option<u32>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let max: Option<i64> = match parent_id {
        Some(id) => stmt.query_row([id], |row| row.get(0))?,
        None => stmt.query_row([], |row| row.get(0))?,
    };
    to_number(max, what)
}

/// Returns the highest term number stored, or `None` if the store is empty.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn max_term_number(conn: &Connection) -> Result<Option<u32>, DbError> {
    max_number(
        conn,
        "SELECT MAX(number)::BIGINT FROM term",
        None,
        "term number",
    )
}

/// Returns the highest sitting number stored for a term.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn max_sitting_number(conn: &Connection, term_id: &str) -> Result<Option<u32>, DbError> {
    max_number(
        conn,
        "SELECT MAX(number)::BIGINT FROM sitting WHERE term_id = ?",
        Some(term_id),
        "sitting number",
    )
}

/// Returns the highest voting number stored for a sitting.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn max_voting_number(conn: &Connection, sitting_id: &str) -> Result<Option<u32>, DbError> {
    max_number(
        conn,
        "SELECT MAX(number)::BIGINT FROM voting WHERE sitting_id = ?",
        Some(sitting_id),
        "voting number",
    )
}

fn count(conn: &Connection, table: &str) -> Result<u64, DbError> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    #[allow(clippy::cast_sign_loss)]
    Ok(n as u64)
}

/// Returns the row count of every entity table.
///
/// # Errors
///
/// Returns [`DbError`] if any query fails.
pub fn table_counts(conn: &Connection) -> Result<TableCounts, DbError> {
    Ok(TableCounts {
        terms: count(conn, "term")?,
        sittings: count(conn, "sitting")?,
        sitting_days: count(conn, "sitting_day")?,
        votings: count(conn, "voting")?,
        voting_options: count(conn, "voting_option")?,
        clubs: count(conn, "club")?,
        mps: count(conn, "mp")?,
        mp_term_links: count(conn, "mp_term_link")?,
        votes: count(conn, "vote")?,
    })
}

/// Writes one `<table>.parquet` file per entity table into `dir`.
///
/// Returns the paths written, in hierarchy order.
///
/// # Errors
///
/// Returns [`DbError`] if the directory cannot be created or a `COPY`
/// fails.
pub fn export_parquet(conn: &Connection, dir: &Path) -> Result<Vec<PathBuf>, DbError> {
    crate::paths::ensure_dir(dir)?;

    let mut written = Vec::new();
    for table in ENTITY_TABLES {
        let path = dir.join(format!("{table}.parquet"));
        let quoted = path.display().to_string().replace('\'', "''");
        conn.execute_batch(&format!(
            "COPY {table} TO '{quoted}' (FORMAT PARQUET)"
        ))?;
        log::info!("Exported {table} to {}", path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sejm_mirror_database_models::{Sitting, Term, Voting};
    use sejm_mirror_natural_key::{VotingIdentity, sitting_key, term_key};

    use super::*;
    use crate::store::open_in_memory;
    use crate::upsert::bulk_upsert;

    fn term(number: u32) -> Term {
        Term {
            id: term_key(number),
            number,
            from_date: NaiveDate::from_ymd_opt(2019, 11, 12).unwrap(),
            to_date: None,
        }
    }

    fn sitting(term: u32, number: u32) -> Sitting {
        Sitting {
            id: sitting_key(term, number),
            term_id: term_key(term),
            number,
            title: format!("Posiedzenie nr {number}"),
        }
    }

    fn voting(term: u32, sitting: u32, number: u32) -> Voting {
        let date = NaiveDate::from_ymd_opt(2025, 7, 22)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let identity = VotingIdentity {
            term,
            sitting,
            sitting_day: 1,
            number,
            date: date.date(),
        };
        Voting {
            id: identity.key(),
            sitting_id: sitting_key(term, sitting),
            number,
            sitting_day: 1,
            date,
            title: "Pkt. 1".to_string(),
            description: None,
            topic: None,
            kind: Some("ELECTRONIC".to_string()),
            yes: None,
            no: None,
            abstain: None,
            not_participating: None,
            present: None,
            total_voted: None,
            majority_type: None,
            majority_votes: None,
            against_all: None,
        }
    }

    #[test]
    fn maxima_of_empty_store_are_none() {
        let conn = open_in_memory().unwrap();
        assert_eq!(max_term_number(&conn).unwrap(), None);
        assert_eq!(max_sitting_number(&conn, &term_key(10)).unwrap(), None);
        assert_eq!(max_voting_number(&conn, &sitting_key(10, 1)).unwrap(), None);
    }

    #[test]
    fn maxima_are_scoped_to_their_parent() {
        let conn = open_in_memory().unwrap();
        bulk_upsert(&conn, &[term(9), term(10)]).unwrap();
        bulk_upsert(&conn, &[sitting(9, 80), sitting(10, 3), sitting(10, 4)]).unwrap();
        bulk_upsert(
            &conn,
            &[voting(10, 3, 50), voting(10, 4, 7), voting(10, 4, 12)],
        )
        .unwrap();

        assert_eq!(max_term_number(&conn).unwrap(), Some(10));
        assert_eq!(max_sitting_number(&conn, &term_key(10)).unwrap(), Some(4));
        assert_eq!(max_sitting_number(&conn, &term_key(9)).unwrap(), Some(80));
        assert_eq!(max_voting_number(&conn, &sitting_key(10, 4)).unwrap(), Some(12));
    }

    #[test]
    fn counts_every_table() {
        let conn = open_in_memory().unwrap();
        bulk_upsert(&conn, &[term(10)]).unwrap();
        bulk_upsert(&conn, &[sitting(10, 1), sitting(10, 2)]).unwrap();

        let counts = table_counts(&conn).unwrap();
        assert_eq!(counts.terms, 1);
        assert_eq!(counts.sittings, 2);
        assert_eq!(counts.votes, 0);
        assert_eq!(counts.entries().len(), 9);
    }

    #[cfg(feature = "duckdb-bundled")]
    #[test]
    fn exports_one_parquet_file_per_table() {
        let conn = open_in_memory().unwrap();
        bulk_upsert(&conn, &[term(10)]).unwrap();

        let dir = std::env::temp_dir().join(format!("sejm_mirror_export_{}", std::process::id()));
        let written = export_parquet(&conn, &dir).unwrap();

        assert_eq!(written.len(), ENTITY_TABLES.len());
        assert!(written.iter().all(|p| p.exists()));

        let terms: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM read_parquet('{}')", written[0].display()),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(terms, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
