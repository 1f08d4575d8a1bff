//! The vote transaction coordinator: one atomic accept-or-reject decision per submission.

use chrono::{DateTime, Utc};
use mongodb::{bson::doc, ClientSession};
use thiserror::Error;

use crate::{
    error::{Error, Result},
    events::Notification,
    model::{
        api::submission::{BallotSubmission, Choice, ValidSubmission},
        common::vote::{verification_hash, Rejection},
        db::{
            ballot::Ballot, election_unit::ElectionUnit, eligible_voter::EligibleVoter,
            setting::Setting, voter::Voter,
        },
        mongodb::{
            errors::is_duplicate_key_error, u32_id_filter, Coll, Counter, TransactionBody,
            BALLOT_ID_COUNTER, VOTER_ID_COUNTER,
        },
    },
    serializer::IdentityTurn,
};

use super::{registry::mark_in_session, status::read_status, Voting};

/// Why a submission did not produce a ballot.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The submission was malformed; nothing was attempted.
    #[error("{0}")]
    Invalid(String),
    /// The coordinator refused the ballot; nothing was written.
    #[error("{0}")]
    Rejected(Rejection),
    /// The store could not be reached or stayed contended; nothing was written.
    #[error(transparent)]
    Storage(#[from] Error),
}

/// Decide on one ballot and, if it is accepted, record it.
///
/// Every check reads inside the transaction, so the decision and the writes it leads to commit
/// together or not at all.
struct CastBallot<'a> {
    settings: Coll<Setting>,
    units: Coll<ElectionUnit>,
    voters: Coll<Voter>,
    ballots: Coll<Ballot>,
    registry: Coll<EligibleVoter>,
    counters: Coll<Counter>,
    secret: &'a [u8],
    submission: &'a ValidSubmission,
    now: DateTime<Utc>,
}

impl CastBallot<'_> {
    /// Find the voter by external identity, creating them if this is their first ballot.
    async fn voter(&self, session: &mut ClientSession) -> Result<Voter> {
        let filter = doc! {"external_id": self.submission.external_voter_id.as_str()};
        if let Some(voter) = self
            .voters
            .find_one_with_session(filter, None, session)
            .await?
        {
            return Ok(voter);
        }

        let id = Counter::next_with_session(&self.counters, VOTER_ID_COUNTER, session).await?;
        let voter = Voter::new(
            id,
            &self.submission.external_voter_id,
            &self.submission.full_name,
            &self.submission.nickname,
        );
        self.voters
            .insert_one_with_session(&voter, None, session)
            .await?;
        debug!("Created voter {id}");
        Ok(voter)
    }
}

#[rocket::async_trait]
impl TransactionBody for CastBallot<'_> {
    type Output = Ballot;
    type Rejection = Rejection;

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let submission = self.submission;

        // 1. Voting must be open.
        let status = read_status(&self.settings, session).await?;
        if !status.accepts_ballots(self.now) {
            return Ok(Err(Rejection::VotingNotActive));
        }

        // 2. The unit must exist and be open.
        let unit = match self
            .units
            .find_one_with_session(u32_id_filter(submission.unit_id), None, session)
            .await?
        {
            Some(unit) if unit.is_open(self.now) => unit,
            _ => return Ok(Err(Rejection::InvalidShift)),
        };

        // 3. A named candidate must be standing in that unit.
        if let Choice::Candidate(candidate_id) = submission.choice {
            if unit.active_candidate(candidate_id).is_none() {
                return Ok(Err(Rejection::InvalidCandidate));
            }
        }

        // 4. Find or create the voter.
        let voter = self.voter(session).await?;

        // 5. One live ballot per voter and unit.
        let live = doc! {
            "voter_id": voter.id,
            "election_unit_id": unit.id,
            "is_cancelled": false,
        };
        if self
            .ballots
            .find_one_with_session(live, None, session)
            .await?
            .is_some()
        {
            return Ok(Err(Rejection::AlreadyVoted));
        }

        // 6. Record the ballot and count it.
        let id = Counter::next_with_session(&self.counters, BALLOT_ID_COUNTER, session).await?;
        let ballot = Ballot {
            id,
            voter_id: voter.id,
            election_unit_id: unit.id,
            candidate_id: submission.choice.candidate_id(),
            vote_type: submission.choice.vote_type(),
            verification_hash: verification_hash(
                self.secret,
                voter.id,
                unit.id,
                submission.choice.candidate_id(),
                submission.choice.vote_type(),
                self.now,
            ),
            created_at: self.now,
            is_cancelled: false,
            cancellation_reason: None,
            cancelled_at: None,
            cancelled_by_admin_id: None,
        };
        if let Err(rejection) = insert_live_ballot(&self.ballots, &ballot, session).await? {
            return Ok(Err(rejection));
        }

        if let Some(candidate_id) = ballot.counted_candidate() {
            let filter = doc! {
                "_id": unit.id,
                "candidates.id": candidate_id,
            };
            let update = doc! {
                "$inc": { "candidates.$.vote_count": 1 }
            };
            self.units
                .update_one_with_session(filter, update, None, session)
                .await?;
        }

        if mark_in_session(&self.registry, &voter.normalized_name, self.now, session).await? {
            debug!("Marked registry entry of voter {} as voted", voter.id);
        }

        Ok(Ok(ballot))
    }
}

/// Insert a new live ballot, mapping a clash on the one-live-ballot index to
/// [`Rejection::AlreadyVoted`].
async fn insert_live_ballot(
    ballots: &Coll<Ballot>,
    ballot: &Ballot,
    session: &mut ClientSession,
) -> Result<std::result::Result<(), Rejection>> {
    match ballots.insert_one_with_session(ballot, None, session).await {
        Ok(_) => Ok(Ok(())),
        Err(err) if is_duplicate_key_error(&err) => Ok(Err(Rejection::AlreadyVoted)),
        Err(err) => Err(err.into()),
    }
}

impl Voting {
    /// Validate and cast a ballot, returning its verification hash.
    pub async fn cast_ballot(
        &self,
        submission: BallotSubmission,
    ) -> std::result::Result<String, SubmissionError> {
        let submission = submission.validate().map_err(SubmissionError::Invalid)?;
        let turn = self
            .serializer
            .identity(&submission.external_voter_id)
            .await;
        self.cast_in_turn(&turn, &submission).await
    }

    /// Cast a validated ballot while already holding its identity's turn.
    pub(super) async fn cast_in_turn(
        &self,
        turn: &IdentityTurn<'_>,
        submission: &ValidSubmission,
    ) -> std::result::Result<String, SubmissionError> {
        let now = Utc::now();
        let body = CastBallot {
            settings: self.coll(),
            units: self.coll(),
            voters: self.coll(),
            ballots: self.coll(),
            registry: self.coll(),
            counters: self.coll(),
            secret: &self.ballot_secret,
            submission,
            now,
        };

        match self.serializer.cast(turn, self.transactor.run(&body)).await? {
            Ok(ballot) => {
                info!(
                    "Accepted ballot {} for election unit {}",
                    ballot.id, ballot.election_unit_id
                );
                self.notifier.publish(Notification::BallotAccepted {
                    election_unit_id: ballot.election_unit_id,
                    vote_type: ballot.vote_type,
                    at: now,
                });
                Ok(ballot.verification_hash)
            }
            Err(rejection) => {
                info!(
                    "Rejected ballot for election unit {}: {rejection}",
                    submission.unit_id
                );
                Err(SubmissionError::Rejected(rejection))
            }
        }
    }
}
