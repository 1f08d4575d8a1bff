//! The conversational front-end's progress towards a ballot, as an explicit state machine.
//!
//! Each external identity is in exactly one state. Events move it along the happy path
//! `Idle -> AwaitingName -> AwaitingUnit -> AwaitingChoice -> AwaitingConfirmation -> Idle`;
//! confirming produces a [`BallotDraft`] to submit, and cancelling returns to `Idle` from anywhere.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{names, vote::VoteType, CandidateId, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    AwaitingName {
        nickname: String,
    },
    AwaitingUnit {
        nickname: String,
        full_name: String,
    },
    AwaitingChoice {
        nickname: String,
        full_name: String,
        unit_id: UnitId,
    },
    AwaitingConfirmation {
        nickname: String,
        full_name: String,
        unit_id: UnitId,
        vote_type: VoteType,
        candidate_id: Option<CandidateId>,
    },
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::Idle
    }
}

impl ConversationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingName { .. } => "awaiting_name",
            Self::AwaitingUnit { .. } => "awaiting_unit",
            Self::AwaitingChoice { .. } => "awaiting_choice",
            Self::AwaitingConfirmation { .. } => "awaiting_confirmation",
        }
    }
}

/// Something the participant did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConversationEvent {
    Begin {
        nickname: String,
    },
    NameGiven {
        full_name: String,
    },
    UnitChosen {
        unit_id: UnitId,
    },
    ChoiceMade {
        vote_type: VoteType,
        #[serde(default)]
        candidate_id: Option<CandidateId>,
    },
    Confirmed,
    Cancelled,
}

impl ConversationEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Begin { .. } => "begin",
            Self::NameGiven { .. } => "name_given",
            Self::UnitChosen { .. } => "unit_chosen",
            Self::ChoiceMade { .. } => "choice_made",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A fully specified ballot, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotDraft {
    pub nickname: String,
    pub full_name: String,
    pub unit_id: UnitId,
    pub vote_type: VoteType,
    pub candidate_id: Option<CandidateId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("Event '{event}' is not allowed in state '{state}'")]
    IllegalTransition {
        state: &'static str,
        event: &'static str,
    },
    #[error("Invalid full name: {0}")]
    InvalidName(#[from] names::NameError),
    #[error("Invalid nickname: {0}")]
    InvalidNickname(#[from] names::NicknameError),
    #[error("A candidate must be named exactly when voting for a candidate")]
    InvalidChoice,
}

/// The outcome of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: ConversationState,
    /// Present when the event confirmed a ballot.
    pub submit: Option<BallotDraft>,
}

impl Step {
    fn to(next: ConversationState) -> Self {
        Self { next, submit: None }
    }
}

/// Apply `event` to `state`.
pub fn transition(
    state: ConversationState,
    event: ConversationEvent,
) -> Result<Step, ConversationError> {
    use ConversationEvent as E;
    use ConversationState as S;

    let illegal = ConversationError::IllegalTransition {
        state: state.name(),
        event: event.name(),
    };

    match (state, event) {
        (S::Idle, E::Begin { nickname }) => {
            let nickname = names::validate_nickname(&nickname)?;
            Ok(Step::to(S::AwaitingName {
                nickname: nickname.to_string(),
            }))
        }
        (S::AwaitingName { nickname }, E::NameGiven { full_name }) => {
            let full_name = names::validate(&full_name)?.to_string();
            Ok(Step::to(S::AwaitingUnit {
                nickname,
                full_name,
            }))
        }
        (
            S::AwaitingUnit {
                nickname,
                full_name,
            },
            E::UnitChosen { unit_id },
        ) => Ok(Step::to(S::AwaitingChoice {
            nickname,
            full_name,
            unit_id,
        })),
        (
            S::AwaitingChoice {
                nickname,
                full_name,
                unit_id,
            },
            E::ChoiceMade {
                vote_type,
                candidate_id,
            },
        ) => {
            if vote_type.needs_candidate() != candidate_id.is_some() {
                return Err(ConversationError::InvalidChoice);
            }
            Ok(Step::to(S::AwaitingConfirmation {
                nickname,
                full_name,
                unit_id,
                vote_type,
                candidate_id,
            }))
        }
        (
            S::AwaitingConfirmation {
                nickname,
                full_name,
                unit_id,
                vote_type,
                candidate_id,
            },
            E::Confirmed,
        ) => Ok(Step {
            next: S::Idle,
            submit: Some(BallotDraft {
                nickname,
                full_name,
                unit_id,
                vote_type,
                candidate_id,
            }),
        }),
        (S::Idle, E::Cancelled) => Err(illegal),
        (_, E::Cancelled) => Ok(Step::to(S::Idle)),
        _ => Err(illegal),
    }
}
