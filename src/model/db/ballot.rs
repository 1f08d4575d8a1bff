use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{vote::VoteType, AdminId, BallotId, CandidateId, UnitId, VoterId},
    mongodb::optional_chrono_datetime,
};

/// One cast vote, as recorded in the ledger.
///
/// Ballots are never deleted. The only mutation is cancellation, which is one-way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: BallotId,
    pub voter_id: VoterId,
    pub election_unit_id: UnitId,
    /// Only present for [`VoteType::Candidate`] ballots.
    pub candidate_id: Option<CandidateId>,
    pub vote_type: VoteType,
    pub verification_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// Always present, so that the partial unique index can see live ballots.
    pub is_cancelled: bool,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default, with = "optional_chrono_datetime")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_by_admin_id: Option<AdminId>,
}

impl Ballot {
    /// The candidate whose counter this ballot contributes to, if any.
    pub fn counted_candidate(&self) -> Option<CandidateId> {
        match self.vote_type {
            VoteType::Candidate => self.candidate_id,
            VoteType::AgainstAll | VoteType::Abstain => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use mongodb::bson::{from_document, to_document, Bson};

    use super::*;

    #[test]
    fn live_ballot_document_shape() {
        let ballot = Ballot::example(5, VoteType::Abstain);
        let document = to_document(&ballot).unwrap();
        assert_eq!(document.get("is_cancelled"), Some(&Bson::Boolean(false)));
        assert_eq!(document.get("candidate_id"), Some(&Bson::Null));
        assert_eq!(document.get_str("vote_type").unwrap(), "abstain");
        assert!(matches!(document.get("created_at"), Some(Bson::DateTime(_))));

        // Millisecond precision is all the database keeps.
        let back: Ballot = from_document(document).unwrap();
        assert_eq!(back.id, 5);
        assert_eq!(back.counted_candidate(), None);
    }

    #[test]
    fn only_candidate_ballots_are_counted() {
        assert_eq!(Ballot::example(1, VoteType::Candidate).counted_candidate(), Some(1));
        let mut odd = Ballot::example(2, VoteType::AgainstAll);
        odd.candidate_id = Some(4);
        assert_eq!(odd.counted_candidate(), None);
    }
}
