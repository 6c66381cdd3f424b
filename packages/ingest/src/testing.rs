//! In-memory [`SejmSource`] and record fixtures for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sejm_mirror_source::{SejmSource, SourceError};
use sejm_mirror_source_models::{
    ClubRecord, MpRecord, MpVoteRecord, SittingRecord, TermRecord, VotingDetailRecord,
    VotingOptionRecord, VotingRecord, VotingTableEntry,
};

/// Serves canned records and counts every call.
#[derive(Default)]
pub struct FakeSource {
    pub terms: Vec<TermRecord>,
    pub mps: BTreeMap<u32, Vec<MpRecord>>,
    pub clubs: BTreeMap<u32, Vec<ClubRecord>>,
    pub sittings: BTreeMap<u32, Vec<SittingRecord>>,
    pub voting_table: BTreeMap<u32, Vec<VotingTableEntry>>,
    pub votings: BTreeMap<(u32, u32), Vec<VotingRecord>>,
    pub details: BTreeMap<(u32, u32, u32), VotingDetailRecord>,
    pub calls: AtomicUsize,
    pub detail_requests: Mutex<Vec<(u32, u32, u32)>>,
}

impl FakeSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Term 10 with sitting 39, voting 205 without options, and a single
    /// legislator voting `NO`.
    pub fn single_voting() -> Self {
        let mut source = Self {
            terms: vec![term_record(10)],
            ..Self::default()
        };
        source.mps.insert(10, vec![mp_record(1)]);
        source.clubs.insert(10, vec![club_record("PiS")]);
        source.sittings.insert(10, vec![sitting_record(39)]);
        source
            .votings
            .insert((10, 39), vec![voting_record(10, 39, 205)]);
        source.details.insert(
            (10, 39, 205),
            detail_record(
                voting_record(10, 39, 205),
                vec![single_vote(1, "PiS", "NO")],
            ),
        );
        source
    }
}

fn missing(what: String) -> SourceError {
    SourceError::Decode {
        url: what,
        message: "no fixture".to_string(),
    }
}

#[async_trait]
impl SejmSource for FakeSource {
    async fn fetch_terms(&self) -> Result<Vec<TermRecord>, SourceError> {
        self.hit();
        Ok(self.terms.clone())
    }

    async fn fetch_mps(&self, term: u32) -> Result<Vec<MpRecord>, SourceError> {
        self.hit();
        Ok(self.mps.get(&term).cloned().unwrap_or_default())
    }

    async fn fetch_clubs(&self, term: u32) -> Result<Vec<ClubRecord>, SourceError> {
        self.hit();
        Ok(self.clubs.get(&term).cloned().unwrap_or_default())
    }

    async fn fetch_sittings(&self, term: u32) -> Result<Vec<SittingRecord>, SourceError> {
        self.hit();
        Ok(self.sittings.get(&term).cloned().unwrap_or_default())
    }

    async fn fetch_voting_table(&self, term: u32) -> Result<Vec<VotingTableEntry>, SourceError> {
        self.hit();
        Ok(self.voting_table.get(&term).cloned().unwrap_or_default())
    }

    async fn fetch_votings(
        &self,
        term: u32,
        sitting: u32,
    ) -> Result<Vec<VotingRecord>, SourceError> {
        self.hit();
        Ok(self
            .votings
            .get(&(term, sitting))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_voting_detail(
        &self,
        term: u32,
        sitting: u32,
        voting: u32,
    ) -> Result<VotingDetailRecord, SourceError> {
        self.hit();
        self.detail_requests
            .lock()
            .unwrap()
            .push((term, sitting, voting));
        self.details
            .get(&(term, sitting, voting))
            .cloned()
            .ok_or_else(|| missing(format!("term{term}/votings/{sitting}/{voting}")))
    }
}

/// Delegates to a [`FakeSource`] but holds every detail fetch open for a
/// moment, recording the most fetches that were in flight at once.
pub struct ThrottledSource {
    pub inner: FakeSource,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ThrottledSource {
    pub const fn new(inner: FakeSource) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SejmSource for ThrottledSource {
    async fn fetch_terms(&self) -> Result<Vec<TermRecord>, SourceError> {
        self.inner.fetch_terms().await
    }

    async fn fetch_mps(&self, term: u32) -> Result<Vec<MpRecord>, SourceError> {
        self.inner.fetch_mps(term).await
    }

    async fn fetch_clubs(&self, term: u32) -> Result<Vec<ClubRecord>, SourceError> {
        self.inner.fetch_clubs(term).await
    }

    async fn fetch_sittings(&self, term: u32) -> Result<Vec<SittingRecord>, SourceError> {
        self.inner.fetch_sittings(term).await
    }

    async fn fetch_voting_table(&self, term: u32) -> Result<Vec<VotingTableEntry>, SourceError> {
        self.inner.fetch_voting_table(term).await
    }

    async fn fetch_votings(
        &self,
        term: u32,
        sitting: u32,
    ) -> Result<Vec<VotingRecord>, SourceError> {
        self.inner.fetch_votings(term, sitting).await
    }

    async fn fetch_voting_detail(
        &self,
        term: u32,
        sitting: u32,
        voting: u32,
    ) -> Result<VotingDetailRecord, SourceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.fetch_voting_detail(term, sitting, voting).await
    }
}

/// Adds votings `numbers` to sitting 39 of term 10, each with one vote.
pub fn add_votings(source: &mut FakeSource, numbers: impl IntoIterator<Item = u32>) {
    for number in numbers {
        let record = voting_record(10, 39, number);
        source
            .votings
            .entry((10, 39))
            .or_default()
            .push(record.clone());
        source.details.insert(
            (10, 39, number),
            detail_record(record, vec![single_vote(1, "PiS", "YES")]),
        );
    }
}

pub fn term_record(number: u32) -> TermRecord {
    serde_json::from_value(json!({
        "num": number,
        "from": "2023-11-13",
        "current": true,
    }))
    .unwrap()
}

pub fn sitting_record(number: u32) -> SittingRecord {
    serde_json::from_value(json!({
        "number": number,
        "title": format!("{number}. Posiedzenie Sejmu RP w dniach 22, 23 lipca 2025 r."),
        "dates": ["2025-07-22", "2025-07-23"],
    }))
    .unwrap()
}

pub fn voting_record(term: u32, sitting: u32, number: u32) -> VotingRecord {
    serde_json::from_value(json!({
        "term": term,
        "sitting": sitting,
        "sittingDay": 6,
        "votingNumber": number,
        "date": "2025-08-05T16:32:45",
        "title": "Pkt 25. Sprawozdanie Komisji",
        "kind": "ELECTRONIC",
        "yes": 254,
        "no": 180,
        "abstain": 1,
        "notParticipating": 25,
        "present": 0,
        "totalVoted": 435,
        "majorityType": "SIMPLE_MAJORITY",
        "majorityVotes": 181,
    }))
    .unwrap()
}

pub fn option_record(index: u32, label: &str) -> VotingOptionRecord {
    serde_json::from_value(json!({
        "optionIndex": index,
        "option": label,
        "votes": 0,
    }))
    .unwrap()
}

pub fn detail_record(voting: VotingRecord, votes: Vec<MpVoteRecord>) -> VotingDetailRecord {
    VotingDetailRecord {
        voting,
        mp_votes: votes,
    }
}

pub fn single_vote(mp: u32, club: &str, vote: &str) -> MpVoteRecord {
    serde_json::from_value(json!({
        "MP": mp,
        "club": club,
        "vote": vote,
    }))
    .unwrap()
}

pub fn multi_vote(mp: u32, club: &str, choices: &[(u32, &str)]) -> MpVoteRecord {
    let list_votes: serde_json::Map<String, serde_json::Value> = choices
        .iter()
        .map(|(index, vote)| (index.to_string(), json!(vote)))
        .collect();
    serde_json::from_value(json!({
        "MP": mp,
        "club": club,
        "vote": "VOTE_VALID",
        "listVotes": list_votes,
    }))
    .unwrap()
}

pub fn mp_record(id: u32) -> MpRecord {
    serde_json::from_value(json!({
        "id": id,
        "firstName": "Andrzej",
        "lastName": "Adamczyk",
        "birthDate": "1959-01-04",
        "birthLocation": "Krzeszowice",
        "club": "PiS",
        "active": true,
        "districtName": "Kraków",
        "districtNum": 13,
        "voivodeship": "małopolskie",
        "educationLevel": "wyższe",
        "profession": "ekonomista",
        "numberOfVotes": 45171,
        "email": "Andrzej.Adamczyk@sejm.pl",
    }))
    .unwrap()
}

pub fn club_record(id: &str) -> ClubRecord {
    serde_json::from_value(json!({
        "id": id,
        "name": "Klub Parlamentarny Prawo i Sprawiedliwość",
        "phone": "",
        "fax": "",
        "email": "",
        "membersCount": 189,
    }))
    .unwrap()
}

pub fn table_entry(proceeding: u32, date: &str) -> VotingTableEntry {
    serde_json::from_value(json!({
        "proceeding": proceeding,
        "date": date,
        "votingsNum": 3,
    }))
    .unwrap()
}
