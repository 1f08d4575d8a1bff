use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{vote::VoteType, AdminId, BallotId, CandidateId, UnitId, VoterId},
    db::ballot::Ballot,
};

/// Query parameters for listing ballots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromForm)]
pub struct BallotFilter {
    /// Only list ballots with this cancellation state.
    pub cancelled: Option<bool>,
}

/// A ledger row as shown to administrators. The verification hash stays with the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotDescription {
    pub id: BallotId,
    pub voter_id: VoterId,
    pub election_unit_id: UnitId,
    pub candidate_id: Option<CandidateId>,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
    pub is_cancelled: bool,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by_admin_id: Option<AdminId>,
}

impl From<Ballot> for BallotDescription {
    fn from(ballot: Ballot) -> Self {
        Self {
            id: ballot.id,
            voter_id: ballot.voter_id,
            election_unit_id: ballot.election_unit_id,
            candidate_id: ballot.candidate_id,
            vote_type: ballot.vote_type,
            created_at: ballot.created_at,
            is_cancelled: ballot.is_cancelled,
            cancellation_reason: ballot.cancellation_reason,
            cancelled_at: ballot.cancelled_at,
            cancelled_by_admin_id: ballot.cancelled_by_admin_id,
        }
    }
}
