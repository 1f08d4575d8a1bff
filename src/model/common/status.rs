use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of the election as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingStatus {
    NotStarted,
    Active,
    Paused,
    Finished,
}

impl VotingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

/// An administrative command on the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCommand {
    Start {
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    },
    Pause,
    Stop,
    Reset,
}

impl StatusCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot {command} voting while it is {}", .from.as_str())]
    Illegal {
        from: VotingStatus,
        command: &'static str,
    },
    #[error("Voting end time must be after its start time")]
    EmptyWindow,
}

/// The stored state of the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: VotingStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self {
            status: VotingStatus::NotStarted,
            start_time: None,
            end_time: None,
        }
    }
}

impl StatusRecord {
    /// The status as seen at `now`, taking the time bounds into account.
    ///
    /// An active election before its start time has not started yet, and an active or paused
    /// election past its end time is over, even if nothing has persisted that fact yet.
    pub fn effective(&self, now: DateTime<Utc>) -> VotingStatus {
        match self.status {
            VotingStatus::Active | VotingStatus::Paused
                if self.end_time.map_or(false, |end| now >= end) =>
            {
                VotingStatus::Finished
            }
            VotingStatus::Active if self.start_time.map_or(false, |start| now < start) => {
                VotingStatus::NotStarted
            }
            status => status,
        }
    }

    /// Are ballots accepted at `now`?
    pub fn accepts_ballots(&self, now: DateTime<Utc>) -> bool {
        self.effective(now) == VotingStatus::Active
    }

    /// The record after applying `command` at `now`.
    ///
    /// Transitions are judged on the effective status, so an election whose end time has passed
    /// can no longer be restarted without a reset.
    pub fn apply(
        &self,
        command: StatusCommand,
        now: DateTime<Utc>,
    ) -> Result<StatusRecord, TransitionError> {
        let from = self.effective(now);
        let illegal = || TransitionError::Illegal {
            from,
            command: command.name(),
        };

        match command {
            StatusCommand::Start {
                start_time,
                end_time,
            } => {
                if from == VotingStatus::Finished {
                    return Err(illegal());
                }
                // Bounds that are not given are kept.
                let start_time = start_time.or(self.start_time);
                let end_time = end_time.or(self.end_time);
                if let Some(end) = end_time {
                    if end <= start_time.unwrap_or(now) {
                        return Err(TransitionError::EmptyWindow);
                    }
                }
                Ok(StatusRecord {
                    status: VotingStatus::Active,
                    start_time,
                    end_time,
                })
            }
            StatusCommand::Pause => match from {
                VotingStatus::Active => Ok(StatusRecord {
                    status: VotingStatus::Paused,
                    ..*self
                }),
                _ => Err(illegal()),
            },
            StatusCommand::Stop => match from {
                VotingStatus::Active | VotingStatus::Paused => Ok(StatusRecord {
                    status: VotingStatus::Finished,
                    ..*self
                }),
                _ => Err(illegal()),
            },
            StatusCommand::Reset => Ok(StatusRecord::default()),
        }
    }

    /// The record once the end time has been reached, if that changes anything.
    pub fn expire(&self, now: DateTime<Utc>) -> Option<StatusRecord> {
        let expired = self.status != VotingStatus::Finished
            && self.effective(now) == VotingStatus::Finished;
        expired.then_some(StatusRecord {
            status: VotingStatus::Finished,
            ..*self
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn start(
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> StatusCommand {
        StatusCommand::Start {
            start_time,
            end_time,
        }
    }

    #[test]
    fn full_lifecycle() {
        let record = StatusRecord::default();
        assert_eq!(record.effective(now()), VotingStatus::NotStarted);

        let record = record.apply(start(None, None), now()).unwrap();
        assert_eq!(record.status, VotingStatus::Active);
        assert!(record.accepts_ballots(now()));

        let record = record.apply(StatusCommand::Pause, now()).unwrap();
        assert_eq!(record.status, VotingStatus::Paused);
        assert!(!record.accepts_ballots(now()));

        let record = record.apply(start(None, None), now()).unwrap();
        assert_eq!(record.status, VotingStatus::Active);

        let record = record.apply(StatusCommand::Stop, now()).unwrap();
        assert_eq!(record.status, VotingStatus::Finished);

        let record = record.apply(StatusCommand::Reset, now()).unwrap();
        assert_eq!(record, StatusRecord::default());
    }

    #[test]
    fn illegal_transitions() {
        let not_started = StatusRecord::default();
        assert!(not_started.apply(StatusCommand::Pause, now()).is_err());
        assert!(not_started.apply(StatusCommand::Stop, now()).is_err());

        let finished = StatusRecord {
            status: VotingStatus::Finished,
            ..StatusRecord::default()
        };
        assert_eq!(
            finished.apply(start(None, None), now()),
            Err(TransitionError::Illegal {
                from: VotingStatus::Finished,
                command: "start",
            })
        );
        assert!(finished.apply(StatusCommand::Pause, now()).is_err());
        assert!(finished.apply(StatusCommand::Reset, now()).is_ok());
    }

    #[test]
    fn time_bounds_shape_effective_status() {
        let record = StatusRecord::default()
            .apply(
                start(
                    Some(now() + Duration::hours(1)),
                    Some(now() + Duration::hours(2)),
                ),
                now(),
            )
            .unwrap();
        assert_eq!(record.status, VotingStatus::Active);
        assert_eq!(record.effective(now()), VotingStatus::NotStarted);
        assert_eq!(
            record.effective(now() + Duration::minutes(90)),
            VotingStatus::Active
        );
        assert_eq!(
            record.effective(now() + Duration::hours(2)),
            VotingStatus::Finished
        );

        // A paused election still finishes at its end time.
        let paused = record
            .apply(StatusCommand::Pause, now() + Duration::minutes(90))
            .unwrap();
        assert_eq!(
            paused.effective(now() + Duration::hours(3)),
            VotingStatus::Finished
        );
    }

    #[test]
    fn window_must_not_be_empty() {
        let record = StatusRecord::default();
        assert_eq!(
            record.apply(start(None, Some(now() - Duration::seconds(1))), now()),
            Err(TransitionError::EmptyWindow)
        );
        assert_eq!(
            record.apply(
                start(Some(now() + Duration::hours(2)), Some(now() + Duration::hours(1))),
                now()
            ),
            Err(TransitionError::EmptyWindow)
        );
    }

    #[test]
    fn restarting_keeps_unspecified_bounds() {
        let end = now() + Duration::hours(1);
        let record = StatusRecord::default()
            .apply(start(None, Some(end)), now())
            .unwrap();
        let record = record.apply(StatusCommand::Pause, now()).unwrap();
        let record = record.apply(start(None, None), now()).unwrap();
        assert_eq!(record.end_time, Some(end));
    }

    #[test]
    fn expiry() {
        let end = now() + Duration::hours(1);
        let record = StatusRecord::default()
            .apply(start(None, Some(end)), now())
            .unwrap();
        assert_eq!(record.expire(now()), None);
        let expired = record.expire(end).unwrap();
        assert_eq!(expired.status, VotingStatus::Finished);
        assert_eq!(expired.end_time, Some(end));
        assert_eq!(expired.expire(end), None);
    }

    #[test]
    fn status_names_round_trip() {
        for status in [
            VotingStatus::NotStarted,
            VotingStatus::Active,
            VotingStatus::Paused,
            VotingStatus::Finished,
        ] {
            assert_eq!(VotingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VotingStatus::parse("bogus"), None);
    }
}
