use serde::{Deserialize, Serialize};

use crate::model::common::BallotId;

/// Which voter's ballots an administrator wants cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoterReference {
    ExternalId(String),
    /// Matched against voters' normalized full names.
    FullName(String),
}

/// An administrative request to cancel all of a voter's live ballots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequest {
    #[serde(default)]
    pub external_voter_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub reason: String,
}

impl CancellationRequest {
    /// Check that exactly one voter reference and a reason are given.
    pub fn validate(self) -> Result<(VoterReference, String), String> {
        let reason = validate_reason(&self.reason)?;
        let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        let reference = match (
            non_blank(self.external_voter_id),
            non_blank(self.full_name),
        ) {
            (Some(id), None) => VoterReference::ExternalId(id.trim().to_string()),
            (None, Some(name)) => VoterReference::FullName(name),
            (Some(_), Some(_)) => {
                return Err("Give either externalVoterId or fullName, not both".to_string())
            }
            (None, None) => return Err("Give one of externalVoterId or fullName".to_string()),
        };
        Ok((reference, reason))
    }
}

/// An administrative request to cancel one specific ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBallotRequest {
    pub reason: String,
}

/// Check a cancellation reason, returning it trimmed.
pub fn validate_reason(reason: &str) -> Result<String, String> {
    let reason = reason.trim();
    if reason.is_empty() {
        Err("A cancellation reason is required".to_string())
    } else {
        Ok(reason.to_string())
    }
}

/// What a cancellation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationReport {
    pub cancelled_ballot_ids: Vec<BallotId>,
    /// Whether a registry entry was found and marked as not having voted.
    pub registry_unmarked: bool,
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    fn request(json: &str) -> Result<(VoterReference, String), String> {
        serde_json::from_str::<CancellationRequest>(json)
            .unwrap()
            .validate()
    }

    #[test]
    fn exactly_one_reference() {
        assert_eq!(
            request(r#"{"externalVoterId": " tg-1 ", "reason": "duplicate"}"#),
            Ok((VoterReference::ExternalId("tg-1".to_string()), "duplicate".to_string()))
        );
        assert_eq!(
            request(r#"{"fullName": "Jane Doe", "reason": "mistake"}"#),
            Ok((VoterReference::FullName("Jane Doe".to_string()), "mistake".to_string()))
        );
        assert!(request(r#"{"externalVoterId": "tg-1", "fullName": "Jane Doe", "reason": "x"}"#)
            .is_err());
        assert!(request(r#"{"reason": "x"}"#).is_err());
        assert!(request(r#"{"externalVoterId": "", "reason": "x"}"#).is_err());
    }

    #[test]
    fn reason_is_required() {
        assert!(request(r#"{"externalVoterId": "tg-1", "reason": "   "}"#).is_err());
    }
}
