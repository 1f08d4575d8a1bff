use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, UnitId};

/// One candidate's live counter next to the count recomputed from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub candidate_id: CandidateId,
    pub name: String,
    pub vote_count: u32,
    pub ledger_count: u32,
    pub consistent: bool,
}

/// A unit's results, recomputed from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTally {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub candidates: Vec<CandidateTally>,
    pub against_all: u32,
    pub abstain: u32,
    /// Live candidate ballots naming a candidate the unit doesn't have.
    pub unknown_candidate_ballots: u32,
    pub total_active_ballots: u32,
    /// True iff every counter agrees with the ledger.
    pub consistent: bool,
}

/// The outcome of checking every unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub consistent: bool,
    pub units_checked: usize,
    /// Only the units whose counters have drifted.
    pub drift: Vec<UnitTally>,
}
