#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deterministic natural keys for mirrored entities.
//!
//! A natural key is the hex-encoded SHA-256 digest of an ordered tuple of
//! identifying fields. Each field is normalized to a canonical string,
//! escaped so the [`SEPARATOR`] can never appear inside it, and joined.
//! Missing values hash as [`EMPTY_TOKEN`], which is distinct from a present
//! empty string.
//!
//! Keys are used as primary keys in the store, so re-fetching the same
//! logical record always produces the same row identity.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use sha2::{Digest, Sha256};

/// Joins normalized parts before hashing.
pub const SEPARATOR: char = '|';

/// Normalized form of a missing value.
///
/// Escaped text always doubles a lone backslash, so no text part can
/// normalize to this token.
pub const EMPTY_TOKEN: &str = "\\N";

/// One identifying field of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyPart<'a> {
    /// A missing value.
    Null,
    /// Free text.
    Text(&'a str),
    /// Any integer.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A boolean flag.
    Bool(bool),
    /// A calendar date. Timestamps are truncated to this on conversion.
    Date(NaiveDate),
}

impl KeyPart<'_> {
    /// Returns the canonical string form of this part.
    #[must_use]
    pub fn normalize(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(EMPTY_TOKEN),
            Self::Text(s) => escape(s),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
        }
    }
}

fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['\\', SEPARATOR]) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c == '\\' || c == SEPARATOR {
            out.push('\\');
        }
        out.push(c);
    }
    Cow::Owned(out)
}

impl<'a> From<&'a str> for KeyPart<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for KeyPart<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value.as_str())
    }
}

impl From<i64> for KeyPart<'_> {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for KeyPart<'_> {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for KeyPart<'_> {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for KeyPart<'_> {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for KeyPart<'_> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for KeyPart<'_> {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for KeyPart<'_> {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value.date())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for KeyPart<'_> {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Date(value.date_naive())
    }
}

impl<'a, T: Into<KeyPart<'a>>> From<Option<T>> for KeyPart<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Derives the natural key of an ordered tuple of identifying fields.
#[must_use]
pub fn derive(parts: &[KeyPart<'_>]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            let mut buf = [0u8; 4];
            hasher.update(SEPARATOR.encode_utf8(&mut buf).as_bytes());
        }
        hasher.update(part.normalize().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Builds a natural key from a list of expressions convertible to
/// [`KeyPart`].
#[macro_export]
macro_rules! natural_key {
    ($($part:expr),+ $(,)?) => {
        $crate::derive(&[$($crate::KeyPart::from($part)),+])
    };
}

/// Key of a term.
#[must_use]
pub fn term_key(term: u32) -> String {
    natural_key!(term)
}

/// Key of a sitting within a term.
#[must_use]
pub fn sitting_key(term: u32, sitting: u32) -> String {
    natural_key!(term, sitting)
}

/// Key of one calendar day of a sitting.
#[must_use]
pub fn sitting_day_key(term: u32, sitting: u32, date: NaiveDate) -> String {
    natural_key!(term, sitting, date)
}

/// Key of a club (parliamentary party) within a term.
#[must_use]
pub fn club_key(term: u32, club_id: &str) -> String {
    natural_key!(term, club_id)
}

/// The identifying fields of a voting.
///
/// Source-assigned voting numbers are occasionally reused within a sitting
/// in older terms, so the sitting-day ordinal and the date take part in the
/// identity too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VotingIdentity {
    /// Term number.
    pub term: u32,
    /// Sitting number.
    pub sitting: u32,
    /// Ordinal of the day within the sitting.
    pub sitting_day: u32,
    /// Voting number within the sitting.
    pub number: u32,
    /// Date the voting took place.
    pub date: NaiveDate,
}

impl VotingIdentity {
    /// Key of the voting itself.
    #[must_use]
    pub fn key(&self) -> String {
        natural_key!(
            self.term,
            self.sitting,
            self.sitting_day,
            self.number,
            self.date
        )
    }

    /// Key of one option of the voting.
    #[must_use]
    pub fn option_key(&self, option_index: u32) -> String {
        natural_key!(
            self.term,
            self.sitting,
            self.sitting_day,
            self.number,
            self.date,
            option_index
        )
    }

    /// Key of one legislator's vote on one option of the voting.
    #[must_use]
    pub fn vote_key(&self, option_index: u32, mp_term_id: u32) -> String {
        natural_key!(
            self.term,
            self.sitting,
            self.sitting_day,
            self.number,
            self.date,
            option_index,
            mp_term_id
        )
    }
}

/// The term-independent identifying fields of a legislator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MpIdentity<'a> {
    /// First name.
    pub first_name: &'a str,
    /// Last name.
    pub last_name: &'a str,
    /// Date of birth.
    pub birth_date: NaiveDate,
    /// Place of birth, not always published.
    pub birth_place: Option<&'a str>,
}

impl MpIdentity<'_> {
    /// Key of the legislator.
    #[must_use]
    pub fn key(&self) -> String {
        natural_key!(
            self.first_name,
            self.last_name,
            self.birth_date,
            self.birth_place
        )
    }

    /// Key of the legislator's membership in a term.
    #[must_use]
    pub fn term_link_key(&self, term: u32) -> String {
        natural_key!(
            self.first_name,
            self.last_name,
            self.birth_date,
            self.birth_place,
            term
        )
    }
}
