//! Fire-and-forget notifications about accepted ballots and status changes.
//!
//! Nothing is persisted and delivery is best-effort: a subscriber that falls more than the
//! configured capacity behind loses the oldest notifications. Notifications never identify voters.

use chrono::{DateTime, Utc};
use rocket::tokio::sync::broadcast;
use serde::{Deserialize, Serialize};

use crate::model::common::{status::VotingStatus, vote::VoteType, BallotId, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    BallotAccepted {
        election_unit_id: UnitId,
        vote_type: VoteType,
        at: DateTime<Utc>,
    },
    BallotCancelled {
        ballot_id: BallotId,
        election_unit_id: UnitId,
        at: DateTime<Utc>,
    },
    StatusChanged {
        status: VotingStatus,
        at: DateTime<Utc>,
    },
}

impl Notification {
    /// Short name for the kind of notification.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BallotAccepted { .. } => "ballot_accepted",
            Self::BallotCancelled { .. } => "ballot_cancelled",
            Self::StatusChanged { .. } => "status_changed",
        }
    }
}

/// The sending half of the notification channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send a notification to everyone currently subscribed.
    pub fn publish(&self, notification: Notification) {
        let kind = notification.kind();
        match self.sender.send(notification) {
            Ok(receivers) => trace!("Published {kind} to {receivers} subscribers"),
            Err(_) => trace!("Dropped {kind}: no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}
