use serde::{Deserialize, Serialize};

use crate::model::common::conversation::ConversationState;

use super::submission::SubmissionResponse;

/// A conversation's state after an event, plus the outcome of any ballot it submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationView {
    pub state: ConversationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionResponse>,
}
