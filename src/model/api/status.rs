use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::status::{StatusRecord, VotingStatus};

/// Body of a request to start (or resume) voting. Both bounds are optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

/// The status register as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDescription {
    /// The status in force right now.
    pub status: VotingStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl StatusDescription {
    pub fn at(record: &StatusRecord, now: DateTime<Utc>) -> Self {
        Self {
            status: record.effective(now),
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}
