//! Administrative cancellation of ballots.
//!
//! A cancelled ballot stays in the ledger, stops counting towards its candidate, and frees its
//! voter to vote again in that unit.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, Document},
    ClientSession,
};
use rocket::futures::TryStreamExt;

use crate::{
    error::{Error, Result},
    events::Notification,
    model::{
        api::cancellation::{validate_reason, CancellationReport, VoterReference},
        common::{names, AdminId, BallotId},
        db::{
            ballot::Ballot, election_unit::ElectionUnit, eligible_voter::EligibleVoter,
            voter::Voter,
        },
        mongodb::{u32_id_filter, Coll, TransactionBody},
    },
};

use super::{registry::unmark_in_session, Voting};

/// Why nothing was cancelled.
#[derive(Debug)]
enum Refusal {
    NotFound(String),
    AlreadyCancelled(BallotId),
}

impl From<Refusal> for Error {
    fn from(refusal: Refusal) -> Self {
        match refusal {
            Refusal::NotFound(what) => Error::not_found(what),
            Refusal::AlreadyCancelled(id) => {
                Error::conflict(format!("Ballot {id} is already cancelled"))
            }
        }
    }
}

#[derive(Debug)]
enum Target<'a> {
    Ballot(BallotId),
    Voter(&'a VoterReference),
}

struct Cancel<'a> {
    ballots: Coll<Ballot>,
    voters: Coll<Voter>,
    units: Coll<ElectionUnit>,
    registry: Coll<EligibleVoter>,
    target: Target<'a>,
    reason: &'a str,
    admin_id: AdminId,
    now: DateTime<Utc>,
}

impl Cancel<'_> {
    /// The live ballots to cancel, and the voters who cast them.
    async fn targets(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<(Vec<Ballot>, Vec<Voter>), Refusal>> {
        match self.target {
            Target::Ballot(id) => {
                let ballot = match self
                    .ballots
                    .find_one_with_session(u32_id_filter(id), None, session)
                    .await?
                {
                    Some(ballot) if ballot.is_cancelled => {
                        return Ok(Err(Refusal::AlreadyCancelled(id)))
                    }
                    Some(ballot) => ballot,
                    None => return Ok(Err(Refusal::NotFound(format!("Ballot {id}")))),
                };
                let voters = self
                    .voters
                    .find_one_with_session(u32_id_filter(ballot.voter_id), None, session)
                    .await?
                    .into_iter()
                    .collect();
                Ok(Ok((vec![ballot], voters)))
            }
            Target::Voter(reference) => {
                let filter = match reference {
                    VoterReference::ExternalId(id) => doc! {"external_id": id.as_str()},
                    VoterReference::FullName(name) => {
                        doc! {"normalized_name": names::normalize(name)}
                    }
                };
                let voters: Vec<Voter> = self
                    .voters
                    .find_with_session(filter, None, session)
                    .await?
                    .stream(session)
                    .try_collect()
                    .await?;
                if voters.is_empty() {
                    return Ok(Err(Refusal::NotFound(format!("Voter {reference:?}"))));
                }

                let voter_ids: Vec<_> = voters.iter().map(|voter| voter.id).collect();
                let live = doc! {
                    "voter_id": { "$in": voter_ids },
                    "is_cancelled": false,
                };
                let ballots: Vec<Ballot> = self
                    .ballots
                    .find_with_session(live, None, session)
                    .await?
                    .stream(session)
                    .try_collect()
                    .await?;
                if ballots.is_empty() {
                    return Ok(Err(Refusal::NotFound(format!(
                        "Live ballots of voter {reference:?}"
                    ))));
                }
                Ok(Ok((ballots, voters)))
            }
        }
    }

    async fn cancel(&self, ballot: &Ballot, session: &mut ClientSession) -> Result<()> {
        let filter = doc! {
            "_id": ballot.id,
            "is_cancelled": false,
        };
        let update = doc! {
            "$set": {
                "is_cancelled": true,
                "cancellation_reason": self.reason,
                "cancelled_at": mongodb::bson::DateTime::from(self.now),
                "cancelled_by_admin_id": self.admin_id,
            }
        };
        self.ballots
            .update_one_with_session(filter, update, None, session)
            .await?;

        if let Some(candidate_id) = ballot.counted_candidate() {
            let filter = counted_candidate_filter(ballot.election_unit_id, candidate_id);
            let update = doc! {
                "$inc": { "candidates.$.vote_count": -1 }
            };
            let result = self
                .units
                .update_one_with_session(filter, update, None, session)
                .await?;
            if result.matched_count == 0 {
                warn!(
                    "Counter of candidate {candidate_id} in election unit {} was already zero",
                    ballot.election_unit_id
                );
            }
        }
        Ok(())
    }
}

/// Matches a unit only while the candidate's counter is positive, so it can never go negative.
fn counted_candidate_filter(unit_id: u32, candidate_id: u32) -> Document {
    doc! {
        "_id": unit_id,
        "candidates": {
            "$elemMatch": { "id": candidate_id, "vote_count": { "$gt": 0 } }
        },
    }
}

#[rocket::async_trait]
impl TransactionBody for Cancel<'_> {
    type Output = (Vec<Ballot>, bool);
    type Rejection = Refusal;

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let (ballots, voters) = match self.targets(session).await? {
            Ok(targets) => targets,
            Err(refusal) => return Ok(Err(refusal)),
        };

        for ballot in &ballots {
            self.cancel(ballot, session).await?;
        }

        let names: BTreeSet<&str> = voters
            .iter()
            .map(|voter| voter.normalized_name.as_str())
            .collect();
        let mut unmarked = false;
        for name in names {
            unmarked |= unmark_in_session(&self.registry, name, session).await?;
        }
        Ok(Ok((ballots, unmarked)))
    }
}

impl Voting {
    /// Cancel one ballot by its ID.
    pub async fn cancel_ballot(
        &self,
        ballot_id: BallotId,
        reason: &str,
        admin_id: AdminId,
    ) -> Result<CancellationReport> {
        self.cancel(Target::Ballot(ballot_id), reason, admin_id)
            .await
    }

    /// Cancel every live ballot of the referenced voter, in every unit.
    pub async fn cancel_for_voter(
        &self,
        reference: VoterReference,
        reason: String,
        admin_id: AdminId,
    ) -> Result<CancellationReport> {
        self.cancel(Target::Voter(&reference), &reason, admin_id)
            .await
    }

    async fn cancel(
        &self,
        target: Target<'_>,
        reason: &str,
        admin_id: AdminId,
    ) -> Result<CancellationReport> {
        let reason = validate_reason(reason).map_err(Error::bad_request)?;
        let now = Utc::now();
        let body = Cancel {
            ballots: self.coll(),
            voters: self.coll(),
            units: self.coll(),
            registry: self.coll(),
            target,
            reason: &reason,
            admin_id,
            now,
        };

        let (ballots, registry_unmarked) =
            self.serializer.write(self.transactor.run(&body)).await??;

        for ballot in &ballots {
            info!(
                "Admin {admin_id} cancelled ballot {} in election unit {}: {reason}",
                ballot.id, ballot.election_unit_id
            );
            self.notifier.publish(Notification::BallotCancelled {
                ballot_id: ballot.id,
                election_unit_id: ballot.election_unit_id,
                at: now,
            });
        }
        Ok(CancellationReport {
            cancelled_ballot_ids: ballots.iter().map(|ballot| ballot.id).collect(),
            registry_unmarked,
        })
    }
}
