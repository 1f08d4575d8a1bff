use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::conversation::ConversationState;

/// Where one external identity is in its conversation with the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub external_id: String,
    pub state: ConversationState,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(external_id: &str, state: ConversationState) -> Self {
        Self {
            external_id: external_id.to_string(),
            state,
            updated_at: Utc::now(),
        }
    }
}
