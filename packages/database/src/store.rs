//! Opening the mirror database and running units of work.

use std::path::Path;

use duckdb::Connection;

use crate::DbError;

/// Opens (or creates) the mirror database at `path` and ensures the
/// schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;

    log::debug!("Opened mirror database at {}", path.display());

    Ok(conn)
}

/// Opens a throwaway in-memory database with the schema in place.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Creates every entity table. Safe to run against an existing database.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS term (
            id TEXT NOT NULL PRIMARY KEY,
            number INTEGER NOT NULL,
            from_date DATE NOT NULL,
            to_date DATE
        );

        CREATE TABLE IF NOT EXISTS sitting (
            id TEXT NOT NULL PRIMARY KEY,
            term_id TEXT NOT NULL,
            number INTEGER NOT NULL,
            title TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sitting_day (
            id TEXT NOT NULL PRIMARY KEY,
            sitting_id TEXT NOT NULL,
            date DATE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS voting (
            id TEXT NOT NULL PRIMARY KEY,
            sitting_id TEXT NOT NULL,
            number INTEGER NOT NULL,
            sitting_day INTEGER NOT NULL,
            date TIMESTAMP NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            topic TEXT,
            kind TEXT,
            yes INTEGER,
            no INTEGER,
            abstain INTEGER,
            not_participating INTEGER,
            present INTEGER,
            total_voted INTEGER,
            majority_type TEXT,
            majority_votes INTEGER,
            against_all INTEGER
        );

        CREATE TABLE IF NOT EXISTS voting_option (
            id TEXT NOT NULL PRIMARY KEY,
            voting_id TEXT NOT NULL,
            option_index INTEGER NOT NULL,
            label TEXT,
            description TEXT,
            votes INTEGER
        );

        CREATE TABLE IF NOT EXISTS club (
            id TEXT NOT NULL PRIMARY KEY,
            term_id TEXT NOT NULL,
            club_id TEXT NOT NULL,
            name TEXT NOT NULL,
            phone TEXT,
            fax TEXT,
            email TEXT,
            members_count INTEGER
        );

        CREATE TABLE IF NOT EXISTS mp (
            id TEXT NOT NULL PRIMARY KEY,
            first_name TEXT NOT NULL,
            second_name TEXT,
            last_name TEXT NOT NULL,
            birth_date DATE NOT NULL,
            birth_place TEXT
        );

        CREATE TABLE IF NOT EXISTS mp_term_link (
            id TEXT NOT NULL PRIMARY KEY,
            mp_id TEXT NOT NULL,
            term_id TEXT NOT NULL,
            in_term_id INTEGER NOT NULL,
            active BOOLEAN,
            club TEXT,
            district_num INTEGER,
            district_name TEXT NOT NULL,
            voivodeship TEXT,
            education TEXT,
            profession TEXT,
            number_of_votes INTEGER,
            email TEXT,
            inactivity_cause TEXT,
            inactivity_description TEXT
        );

        CREATE TABLE IF NOT EXISTS vote (
            id TEXT NOT NULL PRIMARY KEY,
            voting_option_id TEXT NOT NULL,
            term_id TEXT NOT NULL,
            mp_term_id INTEGER NOT NULL,
            vote TEXT NOT NULL,
            club TEXT
        );",
    )?;

    Ok(())
}

/// Runs `work` inside a transaction.
///
/// Commits if `work` succeeds. Otherwise rolls back and returns the
/// original error; a failed rollback is only logged.
///
/// # Errors
///
/// Returns [`DbError`] if `work`, `BEGIN` or `COMMIT` fails.
pub fn in_transaction<T>(
    conn: &Connection,
    work: impl FnOnce(&Connection) -> Result<T, DbError>,
) -> Result<T, DbError> {
    conn.execute_batch("BEGIN TRANSACTION")?;

    match work(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::error!("Rollback failed after {e}: {rollback}");
            }
            Err(e)
        }
    }
}
