use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, UnitId},
    db::election_unit::{Candidate, ElectionUnit},
};

/// A new election unit, as specified by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSpec {
    pub name: String,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

impl UnitSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Unit name must not be empty".to_string());
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            if end <= start {
                return Err("Unit end time must be after its start time".to_string());
            }
        }
        Ok(())
    }
}

/// A new candidate, as specified by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
}

/// Body of requests that switch something on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFlag {
    pub active: bool,
}

/// Full view of a unit, for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDescription {
    pub id: UnitId,
    pub name: String,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub candidates: Vec<CandidateDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: CandidateId,
    pub name: String,
    pub active: bool,
    pub vote_count: u32,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name,
            active: candidate.active,
            vote_count: candidate.vote_count,
        }
    }
}

impl From<ElectionUnit> for UnitDescription {
    fn from(unit: ElectionUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name,
            active: unit.active,
            starts_at: unit.starts_at,
            ends_at: unit.ends_at,
            candidates: unit.candidates.into_iter().map(Into::into).collect(),
        }
    }
}

/// A unit as shown to voters: only standing candidates, and no running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUnit {
    pub id: UnitId,
    pub name: String,
    pub ends_at: Option<DateTime<Utc>>,
    pub candidates: Vec<PublicCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCandidate {
    pub id: CandidateId,
    pub name: String,
}

impl From<ElectionUnit> for PublicUnit {
    fn from(unit: ElectionUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name,
            ends_at: unit.ends_at,
            candidates: unit
                .candidates
                .into_iter()
                .filter(|c| c.active)
                .map(|c| PublicCandidate {
                    id: c.id,
                    name: c.name,
                })
                .collect(),
        }
    }
}
