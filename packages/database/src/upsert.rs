//! Bulk upsert writer.
//!
//! Every entity row type implements [`TableRow`], which names its table and
//! columns and yields its values. [`bulk_upsert`] loads a batch through a
//! `DuckDB` appender into a staging table, then applies it with one
//! `INSERT ... SELECT ... ON CONFLICT (id) DO UPDATE` statement, so a batch
//! is applied all-or-nothing at the statement boundary.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use duckdb::Connection;
use duckdb::types::ToSql;
use sejm_mirror_database_models::{
    Club, Mp, MpTermLink, Sitting, SittingDay, Term, Vote, Voting, VotingOption,
};

use crate::DbError;

/// A row that can be written by [`bulk_upsert`].
pub trait TableRow {
    /// Table the row lives in.
    const TABLE: &'static str;

    /// Every column in value order. The first column is the `id` primary key.
    const COLUMNS: &'static [&'static str];

    /// Columns that are a function of the key and are never overwritten
    /// on conflict, in addition to `id`.
    const IMMUTABLE_COLUMNS: &'static [&'static str];

    /// The row's natural key.
    fn key(&self) -> &str;

    /// Pushes every column of [`Self::COLUMNS`] in order.
    fn bind<'a>(&'a self, values: &mut RowValues<'a>);
}

/// Column values of one row, in [`TableRow::COLUMNS`] order.
#[derive(Default)]
pub struct RowValues<'a> {
    values: Vec<Box<dyn ToSql + 'a>>,
}

impl<'a> RowValues<'a> {
    /// Pushes the next value.
    pub fn push<T: ToSql + 'a>(&mut self, value: T) {
        self.values.push(Box::new(value));
    }

    /// Pushes a date as `YYYY-MM-DD`.
    pub fn push_date(&mut self, value: Option<NaiveDate>) {
        self.push(value.map(|d| d.format("%Y-%m-%d").to_string()));
    }

    /// Pushes a timestamp as `YYYY-MM-DD HH:MM:SS`.
    pub fn push_timestamp(&mut self, value: NaiveDateTime) {
        self.push(value.format("%Y-%m-%d %H:%M:%S").to_string());
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn as_params(&self) -> Vec<&dyn ToSql> {
        self.values
            .iter()
            .map(|value| &**value as &dyn ToSql)
            .collect()
    }
}

fn staging_table<T: TableRow>() -> String {
    format!("{}_staging", T::TABLE)
}

/// Builds the statement that moves the staged rows of `T` into its table.
fn upsert_sql<T: TableRow>() -> String {
    let columns = T::COLUMNS.join(", ");
    let mut sql = format!(
        "INSERT INTO {table} ({columns}) SELECT {columns} FROM {staging}",
        table = T::TABLE,
        staging = staging_table::<T>(),
    );

    let updates: Vec<String> = T::COLUMNS
        .iter()
        .skip(1)
        .filter(|c| !T::IMMUTABLE_COLUMNS.contains(*c))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();

    if updates.is_empty() {
        sql.push_str(" ON CONFLICT (id) DO NOTHING");
    } else {
        sql.push_str(" ON CONFLICT (id) DO UPDATE SET ");
        sql.push_str(&updates.join(", "));
    }

    sql
}

/// Inserts or updates a batch of rows keyed by natural key.
///
/// Empty input is a no-op. Rows sharing a key are collapsed first, keeping
/// the last occurrence. Keys not present in `rows` are untouched.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if staging or the upsert statement fails. Nothing
/// from the batch reaches the entity table in that case.
pub fn bulk_upsert<T: TableRow>(conn: &Connection, rows: &[T]) -> Result<u64, DbError> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut last_seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        last_seen.insert(row.key(), i);
    }
    let deduped: Vec<&T> = rows
        .iter()
        .enumerate()
        .filter(|(i, row)| last_seen.get(row.key()) == Some(i))
        .map(|(_, row)| row)
        .collect();

    if deduped.len() < rows.len() {
        log::debug!(
            "Deduplicated {} batch: {} -> {} rows",
            T::TABLE,
            rows.len(),
            deduped.len(),
        );
    }

    let staging = staging_table::<T>();
    conn.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {staging} AS SELECT {} FROM {} LIMIT 0",
        T::COLUMNS.join(", "),
        T::TABLE,
    ))?;

    {
        let mut appender = conn.appender(&staging)?;
        for row in &deduped {
            let mut values = RowValues::default();
            row.bind(&mut values);
            if values.len() != T::COLUMNS.len() {
                return Err(DbError::Conversion {
                    message: format!(
                        "{} row has {} values for {} columns",
                        T::TABLE,
                        values.len(),
                        T::COLUMNS.len()
                    ),
                });
            }
            appender.append_row(values.as_params().as_slice())?;
        }
        appender.flush()?;
    }

    let written = conn.execute(&upsert_sql::<T>(), [])?;
    conn.execute_batch(&format!("DROP TABLE {staging}"))?;
    log::debug!("Upserted {written} {} rows", T::TABLE);

    Ok(u64::try_from(written).unwrap_or(0))
}

impl TableRow for Term {
    const TABLE: &'static str = "term";
    const COLUMNS: &'static [&'static str] = &["id", "number", "from_date", "to_date"];
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &["number"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(self.number);
        b.push_date(Some(self.from_date));
        b.push_date(self.to_date);
    }
}

impl TableRow for Sitting {
    const TABLE: &'static str = "sitting";
    const COLUMNS: &'static [&'static str] = &["id", "term_id", "number", "title"];
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &["term_id", "number"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(&self.term_id);
        b.push(self.number);
        b.push(&self.title);
    }
}

impl TableRow for SittingDay {
    const TABLE: &'static str = "sitting_day";
    const COLUMNS: &'static [&'static str] = &["id", "sitting_id", "date"];
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &["sitting_id", "date"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(&self.sitting_id);
        b.push_date(Some(self.date));
    }
}

impl TableRow for Voting {
    const TABLE: &'static str = "voting";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "sitting_id",
        "number",
        "sitting_day",
        "date",
        "title",
        "description",
        "topic",
        "kind",
        "yes",
        "no",
        "abstain",
        "not_participating",
        "present",
        "total_voted",
        "majority_type",
        "majority_votes",
        "against_all",
    ];
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &["sitting_id", "number", "sitting_day"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(&self.sitting_id);
        b.push(self.number);
        b.push(self.sitting_day);
        b.push_timestamp(self.date);
        b.push(&self.title);
        b.push(self.description.as_deref());
        b.push(self.topic.as_deref());
        b.push(self.kind.as_deref());
        b.push(self.yes);
        b.push(self.no);
        b.push(self.abstain);
        b.push(self.not_participating);
        b.push(self.present);
        b.push(self.total_voted);
        b.push(self.majority_type.as_deref());
        b.push(self.majority_votes);
        b.push(self.against_all);
    }
}

impl TableRow for VotingOption {
    const TABLE: &'static str = "voting_option";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "voting_id",
        "option_index",
        "label",
        "description",
        "votes",
    ];
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &["voting_id", "option_index"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(&self.voting_id);
        b.push(self.option_index);
        b.push(self.label.as_deref());
        b.push(self.description.as_deref());
        b.push(self.votes);
    }
}

impl TableRow for Club {
    const TABLE: &'static str = "club";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "term_id",
        "club_id",
        "name",
        "phone",
        "fax",
        "email",
        "members_count",
    ];
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &["term_id", "club_id"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(&self.term_id);
        b.push(&self.club_id);
        b.push(&self.name);
        b.push(self.phone.as_deref());
        b.push(self.fax.as_deref());
        b.push(self.email.as_deref());
        b.push(self.members_count);
    }
}

impl TableRow for Mp {
    const TABLE: &'static str = "mp";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "first_name",
        "second_name",
        "last_name",
        "birth_date",
        "birth_place",
    ];
    const IMMUTABLE_COLUMNS: &'static [&'static str] =
        &["first_name", "last_name", "birth_date", "birth_place"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(&self.first_name);
        b.push(self.second_name.as_deref());
        b.push(&self.last_name);
        b.push_date(Some(self.birth_date));
        b.push(self.birth_place.as_deref());
    }
}

impl TableRow for MpTermLink {
    const TABLE: &'static str = "mp_term_link";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "mp_id",
        "term_id",
        "in_term_id",
        "active",
        "club",
        "district_num",
        "district_name",
        "voivodeship",
        "education",
        "profession",
        "number_of_votes",
        "email",
        "inactivity_cause",
        "inactivity_description",
    ];
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &["mp_id", "term_id"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(&self.mp_id);
        b.push(&self.term_id);
        b.push(self.in_term_id);
        b.push(self.active);
        b.push(self.club.as_deref());
        b.push(self.district_num);
        b.push(&self.district_name);
        b.push(self.voivodeship.as_deref());
        b.push(self.education.as_deref());
        b.push(self.profession.as_deref());
        b.push(self.number_of_votes);
        b.push(self.email.as_deref());
        b.push(self.inactivity_cause.as_deref());
        b.push(self.inactivity_description.as_deref());
    }
}

impl TableRow for Vote {
    const TABLE: &'static str = "vote";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "voting_option_id",
        "term_id",
        "mp_term_id",
        "vote",
        "club",
    ];
    const IMMUTABLE_COLUMNS: &'static [&'static str] =
        &["voting_option_id", "term_id", "mp_term_id"];

    fn key(&self) -> &str {
        &self.id
    }

    fn bind<'a>(&'a self, b: &mut RowValues<'a>) {
        b.push(&self.id);
        b.push(&self.voting_option_id);
        b.push(&self.term_id);
        b.push(self.mp_term_id);
        b.push(self.vote.as_ref());
        b.push(self.club.as_deref());
    }
}
