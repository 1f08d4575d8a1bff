use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::{CandidateId, UnitId, VoterId};

type HmacSha256 = Hmac<Sha256>;

/// What a ballot is cast for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    /// A vote for a specific candidate.
    Candidate,
    AgainstAll,
    Abstain,
}

impl VoteType {
    pub const ALL: [VoteType; 3] = [Self::Candidate, Self::AgainstAll, Self::Abstain];

    /// Does this vote type name a candidate?
    pub fn needs_candidate(self) -> bool {
        self == Self::Candidate
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::AgainstAll => "against_all",
            Self::Abstain => "abstain",
        }
    }
}

/// Why the coordinator refused a ballot. These are reported to the submitter verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejection {
    #[error("VOTING_NOT_ACTIVE")]
    VotingNotActive,
    #[error("INVALID_SHIFT")]
    InvalidShift,
    #[error("INVALID_CANDIDATE")]
    InvalidCandidate,
    #[error("ALREADY_VOTED")]
    AlreadyVoted,
}

#[allow(clippy::missing_panics_doc)]
/// Compute the verification token handed back for an accepted ballot.
///
/// The token is a keyed digest of everything that identifies the ballot, so it reveals nothing
/// without the server secret but can be recomputed by the server to confirm a receipt.
pub fn verification_hash(
    secret: &[u8],
    voter_id: VoterId,
    unit_id: UnitId,
    candidate_id: Option<CandidateId>,
    vote_type: VoteType,
    cast_at: DateTime<Utc>,
) -> String {
    let candidate = candidate_id.map(|id| id.to_string()).unwrap_or_default();
    let message = format!(
        "{voter_id}:{unit_id}:{candidate}:{}:{}",
        vote_type.as_str(),
        cast_at.timestamp_millis()
    );

    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    HEXLOWER.encode(&mac.finalize().into_bytes())
}
