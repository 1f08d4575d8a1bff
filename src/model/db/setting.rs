use chrono::{DateTime, Utc};
use mongodb::bson::{Bson, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::model::common::status::{StatusRecord, VotingStatus};

pub const VOTING_STATUS: &str = "voting_status";
pub const VOTING_START_TIME: &str = "voting_start_time";
pub const VOTING_END_TIME: &str = "voting_end_time";

/// A key/value row of global configuration held in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(rename = "_id")]
    pub key: String,
    pub value: Bson,
}

impl Setting {
    pub fn new(key: &str, value: impl Into<Bson>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

impl StatusRecord {
    /// Rebuild the status record from its setting rows. Missing or malformed rows read as unset.
    pub fn from_settings(settings: &[Setting]) -> Self {
        let mut record = Self::default();
        for setting in settings {
            match (setting.key.as_str(), &setting.value) {
                (VOTING_STATUS, Bson::String(s)) => {
                    record.status = VotingStatus::parse(s).unwrap_or(VotingStatus::NotStarted);
                }
                (VOTING_START_TIME, Bson::DateTime(dt)) => record.start_time = Some(dt.to_chrono()),
                (VOTING_END_TIME, Bson::DateTime(dt)) => record.end_time = Some(dt.to_chrono()),
                _ => {}
            }
        }
        record
    }

    /// The setting rows that store this record.
    pub fn to_settings(&self) -> [Setting; 3] {
        fn time(value: Option<DateTime<Utc>>) -> Bson {
            value.map_or(Bson::Null, |dt| Bson::DateTime(BsonDateTime::from_chrono(dt)))
        }

        [
            Setting::new(VOTING_STATUS, self.status.as_str()),
            Setting::new(VOTING_START_TIME, time(self.start_time)),
            Setting::new(VOTING_END_TIME, time(self.end_time)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn status_record_settings() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let record = StatusRecord {
            status: VotingStatus::Paused,
            start_time: Some(start),
            end_time: Some(start + Duration::hours(1)),
        };
        assert_eq!(StatusRecord::from_settings(&record.to_settings()), record);

        let cleared = StatusRecord::default();
        assert_eq!(StatusRecord::from_settings(&cleared.to_settings()), cleared);
        assert_eq!(StatusRecord::from_settings(&[]), cleared);
    }

    #[test]
    fn malformed_settings_are_ignored() {
        let settings = [
            Setting::new(VOTING_STATUS, "sideways"),
            Setting::new(VOTING_END_TIME, 17),
            Setting::new("unrelated", true),
        ];
        assert_eq!(StatusRecord::from_settings(&settings), StatusRecord::default());
    }
}
