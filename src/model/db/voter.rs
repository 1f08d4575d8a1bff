use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{names, VoterId};

/// A participant who has attempted to vote, as stored in the database.
///
/// Voters are created lazily by their first ballot and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: VoterId,
    /// Identity assigned by the conversational front-end. Unique.
    pub external_id: String,
    /// Full name as the voter typed it.
    pub full_name: String,
    /// Normalized full name, linking the voter to the eligible voter registry.
    pub normalized_name: String,
    pub nickname: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Voter {
    pub fn new(id: VoterId, external_id: &str, full_name: &str, nickname: &str) -> Self {
        Self {
            id,
            external_id: external_id.to_string(),
            full_name: full_name.trim().to_string(),
            normalized_name: names::normalize(full_name),
            nickname: nickname.trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_voter_normalizes_name() {
        let voter = Voter::new(3, "tg-42", "  Jane   DOE ", " jd ");
        assert_eq!(voter.full_name, "Jane   DOE");
        assert_eq!(voter.normalized_name, "jane doe");
        assert_eq!(voter.nickname, "jd");
    }
}
