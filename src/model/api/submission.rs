use serde::{Deserialize, Serialize};

use crate::model::common::{
    conversation::BallotDraft,
    names,
    vote::{Rejection, VoteType},
    CandidateId, UnitId,
};

/// A ballot as submitted by the conversational front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotSubmission {
    pub external_voter_id: String,
    pub full_name: String,
    pub nickname: String,
    pub election_unit_id: UnitId,
    #[serde(default)]
    pub candidate_id: Option<CandidateId>,
    pub vote_type: VoteType,
}

/// What a validated ballot is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Candidate(CandidateId),
    AgainstAll,
    Abstain,
}

impl Choice {
    pub fn vote_type(self) -> VoteType {
        match self {
            Self::Candidate(_) => VoteType::Candidate,
            Self::AgainstAll => VoteType::AgainstAll,
            Self::Abstain => VoteType::Abstain,
        }
    }

    pub fn candidate_id(self) -> Option<CandidateId> {
        match self {
            Self::Candidate(id) => Some(id),
            Self::AgainstAll | Self::Abstain => None,
        }
    }
}

/// A submission that has passed every check that needs no database access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub external_voter_id: String,
    pub full_name: String,
    pub nickname: String,
    pub unit_id: UnitId,
    pub choice: Choice,
}

impl BallotSubmission {
    /// Check the submission's shape, returning a human-readable message if it is malformed.
    pub fn validate(self) -> Result<ValidSubmission, String> {
        let external_voter_id = self.external_voter_id.trim();
        if external_voter_id.is_empty() {
            return Err("externalVoterId must not be empty".to_string());
        }

        let full_name = names::validate(&self.full_name)
            .map_err(|err| format!("Invalid fullName: {err}"))?;

        let nickname = names::validate_nickname(&self.nickname).map_err(|err| err.to_string())?;

        let choice = match (self.vote_type, self.candidate_id) {
            (VoteType::Candidate, Some(id)) => Choice::Candidate(id),
            (VoteType::Candidate, None) => {
                return Err("candidateId is required for candidate votes".to_string())
            }
            (VoteType::AgainstAll, None) => Choice::AgainstAll,
            (VoteType::Abstain, None) => Choice::Abstain,
            (_, Some(_)) => {
                return Err(format!(
                    "candidateId must be null for {} votes",
                    self.vote_type.as_str()
                ))
            }
        };

        Ok(ValidSubmission {
            external_voter_id: external_voter_id.to_string(),
            full_name: full_name.to_string(),
            nickname: nickname.to_string(),
            unit_id: self.election_unit_id,
            choice,
        })
    }

    /// The submission for a ballot confirmed through the conversation.
    pub fn from_draft(external_voter_id: &str, draft: BallotDraft) -> Self {
        Self {
            external_voter_id: external_voter_id.to_string(),
            full_name: draft.full_name,
            nickname: draft.nickname,
            election_unit_id: draft.unit_id,
            candidate_id: draft.candidate_id,
            vote_type: draft.vote_type,
        }
    }
}

/// The answer to a ballot submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionResponse {
    pub fn accepted(verification_hash: String) -> Self {
        Self {
            success: true,
            verification_hash: Some(verification_hash),
            error: None,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self::failed(rejection.to_string())
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            verification_hash: None,
            error: Some(error),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl BallotSubmission {
        pub fn example(external_voter_id: &str, unit_id: UnitId, choice: Choice) -> Self {
            Self {
                external_voter_id: external_voter_id.to_string(),
                full_name: "Иванов Иван Иванович".to_string(),
                nickname: format!("nick-{external_voter_id}"),
                election_unit_id: unit_id,
                candidate_id: choice.candidate_id(),
                vote_type: choice.vote_type(),
            }
        }
    }
}
