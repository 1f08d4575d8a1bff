//! Read access to the ballot ledger.

use std::collections::HashMap;

use mongodb::{
    bson::{doc, from_document, Document},
    options::FindOptions,
    ClientSession,
};
use rocket::futures::TryStreamExt;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    model::{
        api::{
            ballot::{BallotDescription, BallotFilter},
            pagination::{Paginated, Pagination},
        },
        common::{vote::VoteType, CandidateId, UnitId},
        db::{ballot::Ballot, election_unit::ElectionUnit},
        mongodb::{u32_id_filter, Coll},
    },
};

use super::Voting;

/// Live ballots in one unit, counted straight from the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct LedgerCounts {
    pub by_candidate: HashMap<CandidateId, u32>,
    pub against_all: u32,
    pub abstain: u32,
}

impl LedgerCounts {
    pub fn total(&self) -> u32 {
        self.by_candidate.values().sum::<u32>() + self.against_all + self.abstain
    }
}

#[derive(Debug, Deserialize)]
struct CountKey {
    vote_type: VoteType,
    #[serde(default)]
    candidate_id: Option<CandidateId>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    #[serde(rename = "_id")]
    key: CountKey,
    count: u32,
}

fn count_pipeline(unit_id: UnitId) -> Vec<Document> {
    vec![
        doc! {
            "$match": {
                "election_unit_id": unit_id,
                "is_cancelled": false,
            }
        },
        doc! {
            "$group": {
                "_id": {
                    "vote_type": "$vote_type",
                    "candidate_id": "$candidate_id",
                },
                "count": { "$sum": 1 },
            }
        },
    ]
}

fn fold_counts(rows: Vec<Document>) -> Result<LedgerCounts> {
    let mut counts = LedgerCounts::default();
    for row in rows {
        let row: CountRow = from_document(row)?;
        match (row.key.vote_type, row.key.candidate_id) {
            (VoteType::Candidate, Some(id)) => {
                *counts.by_candidate.entry(id).or_default() += row.count;
            }
            (VoteType::AgainstAll, _) => counts.against_all += row.count,
            (VoteType::Abstain, _) => counts.abstain += row.count,
            (VoteType::Candidate, None) => {
                warn!("Found {} candidate ballots without a candidate", row.count);
            }
        }
    }
    Ok(counts)
}

/// Count the live ballots of a unit, as part of a transaction.
pub(super) async fn live_counts_in_session(
    ballots: &Coll<Ballot>,
    unit_id: UnitId,
    session: &mut ClientSession,
) -> Result<LedgerCounts> {
    let rows: Vec<Document> = ballots
        .aggregate_with_session(count_pipeline(unit_id), None, session)
        .await?
        .stream(session)
        .try_collect()
        .await?;
    fold_counts(rows)
}

impl Voting {
    /// One page of a unit's ballots, newest first.
    pub async fn list_ballots(
        &self,
        unit_id: UnitId,
        filter: BallotFilter,
        pagination: Pagination,
    ) -> Result<Paginated<BallotDescription>> {
        let exists = self
            .coll::<ElectionUnit>()
            .find_one(u32_id_filter(unit_id), None)
            .await?
            .is_some();
        if !exists {
            return Err(Error::not_found(format!("Election unit {unit_id}")));
        }

        let mut query = doc! {"election_unit_id": unit_id};
        if let Some(cancelled) = filter.cancelled {
            query.insert("is_cancelled", cancelled);
        }
        let ballots = self.coll::<Ballot>();
        let total = ballots.count_documents(query.clone(), None).await?;
        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1, "_id": -1})
            .skip(pagination.skip())
            .limit(pagination.page_size() as i64)
            .build();
        let items = ballots
            .find(query, options)
            .await?
            .map_ok(BallotDescription::from)
            .try_collect()
            .await?;
        Ok(Paginated {
            items,
            pagination: pagination.result(total as usize),
        })
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::Bson;

    use crate::model::api::submission::{BallotSubmission, Choice};
    use crate::model::api::unit::UnitSpec;

    use super::*;

    fn row(vote_type: &str, candidate_id: Option<u32>, count: i32) -> Document {
        let candidate_id = candidate_id.map_or(Bson::Null, Bson::from);
        doc! {
            "_id": { "vote_type": vote_type, "candidate_id": candidate_id },
            "count": count,
        }
    }

    #[test]
    fn counts_are_folded_by_vote_type() {
        let counts = fold_counts(vec![
            row("candidate", Some(1), 3),
            row("candidate", Some(2), 1),
            row("against_all", None, 2),
            row("abstain", None, 4),
            row("candidate", None, 5),
        ])
        .unwrap();
        assert_eq!(counts.by_candidate.get(&1), Some(&3));
        assert_eq!(counts.by_candidate.get(&2), Some(&1));
        assert_eq!(counts.against_all, 2);
        assert_eq!(counts.abstain, 4);
        assert_eq!(counts.total(), 10);
    }

    #[test]
    fn unknown_vote_types_are_errors() {
        assert!(fold_counts(vec![row("spoiled", None, 1)]).is_err());
    }

    #[backend_test(active)]
    async fn ballots_are_listed_newest_first(voting: Voting) {
        let unit = voting
            .create_unit(&UnitSpec {
                name: "Morning".to_string(),
                starts_at: None,
                ends_at: None,
            })
            .await
            .unwrap();
        voting.set_unit_active(unit.id, true).await.unwrap();
        for voter in ["tg-1", "tg-2", "tg-3"] {
            let submission = BallotSubmission::example(voter, unit.id, Choice::Abstain);
            voting.cast_ballot(submission).await.unwrap();
        }

        let page = voting
            .list_ballots(unit.id, BallotFilter::default(), Pagination::new(1, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 3);
        let ids: Vec<_> = page.items.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 2]);

        let cancelled = BallotFilter {
            cancelled: Some(true),
        };
        let page = voting
            .list_ballots(unit.id, cancelled, Pagination::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());

        assert!(voting
            .list_ballots(unit.id + 1, BallotFilter::default(), Pagination::default())
            .await
            .is_err());
    }
}
