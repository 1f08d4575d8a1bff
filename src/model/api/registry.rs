use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::eligible_voter::EligibleVoter;

/// A batch of names to add to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameBatch {
    pub names: Vec<String>,
}

/// How each name in a batch was classified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddReport {
    pub added: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub invalid_names: Vec<String>,
}

/// The answer to an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub eligible: bool,
    pub has_voted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum RegistryFilter {
    #[field(value = "all")]
    All,
    #[field(value = "voted")]
    Voted,
    #[field(value = "not_voted")]
    NotVoted,
}

impl Default for RegistryFilter {
    fn default() -> Self {
        Self::All
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub full_name: String,
    pub normalized_name: String,
    pub has_voted: bool,
    pub voted_at: Option<DateTime<Utc>>,
}

impl From<EligibleVoter> for RegistryEntry {
    fn from(voter: EligibleVoter) -> Self {
        Self {
            full_name: voter.full_name,
            normalized_name: voter.normalized_name,
            has_voted: voter.has_voted,
            voted_at: voter.voted_at,
        }
    }
}
