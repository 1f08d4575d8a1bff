use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, UnitId},
    mongodb::optional_chrono_datetime,
};

/// A candidate, stored nested inside its election unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub active: bool,
    /// Number of live ballots for this candidate. Only ever changed in the same transaction as
    /// the ballot that it counts.
    pub vote_count: u32,
}

impl Candidate {
    pub fn new(id: CandidateId, name: &str) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            active: true,
            vote_count: 0,
        }
    }
}

/// A voting round ("shift") with its own candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionUnit {
    #[serde(rename = "_id")]
    pub id: UnitId,
    pub name: String,
    pub active: bool,
    #[serde(default, with = "optional_chrono_datetime")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, with = "optional_chrono_datetime")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl ElectionUnit {
    /// A new unit. Units start inactive so that candidates can be added before voting opens.
    pub fn new(
        id: UnitId,
        name: &str,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            active: false,
            starts_at,
            ends_at,
            candidates: Vec::new(),
        }
    }

    /// Does this unit accept ballots at `now`?
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.starts_at.map_or(true, |start| start <= now)
            && self.ends_at.map_or(true, |end| now < end)
    }

    pub fn candidate(&self, candidate_id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }

    /// The candidate with the given ID, if they belong to this unit and are standing.
    pub fn active_candidate(&self, candidate_id: CandidateId) -> Option<&Candidate> {
        self.candidate(candidate_id).filter(|c| c.active)
    }
}
