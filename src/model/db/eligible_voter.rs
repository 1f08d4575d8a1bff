use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::names, mongodb::optional_chrono_datetime};

/// An entry in the eligible voter registry.
///
/// Entries are keyed by normalized full name, so two spellings of the same name share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleVoter {
    #[serde(rename = "_id")]
    pub normalized_name: String,
    /// The name as it was first added.
    pub full_name: String,
    pub has_voted: bool,
    #[serde(default, with = "optional_chrono_datetime")]
    pub voted_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub added_at: DateTime<Utc>,
}

impl EligibleVoter {
    /// A registry entry for someone who has not voted yet.
    pub fn new(full_name: &str) -> Self {
        Self {
            normalized_name: names::normalize(full_name),
            full_name: full_name.trim().to_string(),
            has_voted: false,
            voted_at: None,
            added_at: Utc::now(),
        }
    }
}
