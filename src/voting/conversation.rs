//! Persisted conversations, one per external identity.

use mongodb::{bson::doc, options::ReplaceOptions};
use rocket::http::Status;

use crate::{
    error::{Error, Result},
    model::{
        api::{
            conversation::ConversationView,
            submission::{BallotSubmission, SubmissionResponse},
        },
        common::conversation::{transition, ConversationError, ConversationEvent, ConversationState},
        db::conversation::Conversation,
    },
};

use super::{SubmissionError, Voting};

impl From<ConversationError> for Error {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::IllegalTransition { .. } => Error::conflict(err.to_string()),
            _ => Error::Status(Status::UnprocessableEntity, err.to_string()),
        }
    }
}

impl Voting {
    /// Where this identity's conversation currently stands.
    pub async fn conversation(&self, external_id: &str) -> Result<ConversationView> {
        Ok(ConversationView {
            state: self.load_conversation(external_id).await?,
            submission: None,
        })
    }

    /// Apply one event to an identity's conversation, casting the ballot if it was confirmed.
    ///
    /// If the store fails while casting, the conversation stays where it was so that the
    /// confirmation can be retried.
    pub async fn advance(
        &self,
        external_id: &str,
        event: ConversationEvent,
    ) -> Result<ConversationView> {
        let turn = self.serializer.identity(external_id).await;
        let state = self.load_conversation(external_id).await?;
        let from = state.name();
        let step = transition(state, event)?;

        let submission = match step.submit {
            None => None,
            Some(draft) => {
                let submission = BallotSubmission::from_draft(external_id, draft)
                    .validate()
                    .map_err(|why| Error::Status(Status::UnprocessableEntity, why))?;
                match self.cast_in_turn(&turn, &submission).await {
                    Ok(hash) => Some(SubmissionResponse::accepted(hash)),
                    Err(SubmissionError::Rejected(rejection)) => {
                        Some(SubmissionResponse::rejected(rejection))
                    }
                    Err(SubmissionError::Invalid(why)) => {
                        return Err(Error::Status(Status::UnprocessableEntity, why))
                    }
                    Err(SubmissionError::Storage(err)) => return Err(err),
                }
            }
        };

        let conversation = Conversation::new(external_id, step.next);
        let conversations = self.coll::<Conversation>();
        let upsert = ReplaceOptions::builder().upsert(true).build();
        self.serializer
            .write(conversations.replace_one(
                doc! {"_id": external_id},
                &conversation,
                upsert,
            ))
            .await?;
        debug!(
            "Conversation {external_id}: {from} -> {}",
            conversation.state.name()
        );

        Ok(ConversationView {
            state: conversation.state,
            submission,
        })
    }

    async fn load_conversation(&self, external_id: &str) -> Result<ConversationState> {
        let conversation = self
            .coll::<Conversation>()
            .find_one(doc! {"_id": external_id}, None)
            .await?;
        Ok(conversation.map(|c| c.state).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        api::unit::{CandidateSpec, UnitSpec},
        common::vote::{Rejection, VoteType},
    };

    use super::*;

    async fn walk_to_confirmation(voting: &Voting, external_id: &str, unit_id: u32, candidate: u32) {
        let events = [
            ConversationEvent::Begin {
                nickname: "ivan".to_string(),
            },
            ConversationEvent::NameGiven {
                full_name: "Иванов Иван Иванович".to_string(),
            },
            ConversationEvent::UnitChosen { unit_id },
            ConversationEvent::ChoiceMade {
                vote_type: VoteType::Candidate,
                candidate_id: Some(candidate),
            },
        ];
        for event in events {
            let view = voting.advance(external_id, event).await.unwrap();
            assert_eq!(view.submission, None);
        }
    }

    async fn open_unit(voting: &Voting) -> (u32, u32) {
        let unit = voting
            .create_unit(&UnitSpec {
                name: "Morning".to_string(),
                starts_at: None,
                ends_at: None,
            })
            .await
            .unwrap();
        let candidate = voting
            .add_candidate(
                unit.id,
                &CandidateSpec {
                    name: "Alice Archer".to_string(),
                },
            )
            .await
            .unwrap();
        voting.set_unit_active(unit.id, true).await.unwrap();
        (unit.id, candidate.id)
    }

    #[backend_test(active)]
    async fn confirmed_conversation_casts_ballot(voting: Voting) {
        let (unit_id, candidate_id) = open_unit(&voting).await;
        walk_to_confirmation(&voting, "tg-1", unit_id, candidate_id).await;
        assert_eq!(
            voting.conversation("tg-1").await.unwrap().state.name(),
            "awaiting_confirmation"
        );

        let view = voting
            .advance("tg-1", ConversationEvent::Confirmed)
            .await
            .unwrap();
        assert_eq!(view.state, ConversationState::Idle);
        let submission = view.submission.unwrap();
        assert!(submission.success);
        assert!(submission.verification_hash.is_some());
        assert_eq!(voting.unit(unit_id).await.unwrap().candidates[0].vote_count, 1);

        // A second pass through the conversation is refused by the coordinator.
        walk_to_confirmation(&voting, "tg-1", unit_id, candidate_id).await;
        let view = voting
            .advance("tg-1", ConversationEvent::Confirmed)
            .await
            .unwrap();
        assert_eq!(
            view.submission,
            Some(SubmissionResponse::rejected(Rejection::AlreadyVoted))
        );
        assert_eq!(view.state, ConversationState::Idle);
    }

    #[backend_test]
    async fn illegal_and_invalid_events(voting: Voting) {
        assert_eq!(
            voting.conversation("tg-1").await.unwrap().state,
            ConversationState::Idle
        );
        let err = voting
            .advance("tg-1", ConversationEvent::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Conflict);

        voting
            .advance(
                "tg-1",
                ConversationEvent::Begin {
                    nickname: "ivan".to_string(),
                },
            )
            .await
            .unwrap();
        let err = voting
            .advance(
                "tg-1",
                ConversationEvent::NameGiven {
                    full_name: "Iv4n".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::UnprocessableEntity);
        // The failed event left the state alone.
        assert_eq!(
            voting.conversation("tg-1").await.unwrap().state.name(),
            "awaiting_name"
        );

        let view = voting
            .advance("tg-1", ConversationEvent::Cancelled)
            .await
            .unwrap();
        assert_eq!(view.state, ConversationState::Idle);
        assert_eq!(voting.queued_identities(), 0);
    }
}
