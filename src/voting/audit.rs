//! Consistency checks between the candidates' running counters and the ledger.

use mongodb::{bson::doc, options::FindOptions, ClientSession};
use rocket::futures::TryStreamExt;

use crate::{
    error::{Error, Result},
    model::{
        api::tally::{AuditReport, CandidateTally, UnitTally},
        common::UnitId,
        db::{ballot::Ballot, election_unit::ElectionUnit},
        mongodb::{u32_id_filter, Coll, TransactionBody},
    },
};

use super::{
    ledger::{live_counts_in_session, LedgerCounts},
    Voting,
};

/// Compare a unit's counters with what its ledger says.
fn tally(unit: &ElectionUnit, counts: &LedgerCounts) -> UnitTally {
    let candidates: Vec<CandidateTally> = unit
        .candidates
        .iter()
        .map(|candidate| {
            let ledger_count = counts
                .by_candidate
                .get(&candidate.id)
                .copied()
                .unwrap_or(0);
            CandidateTally {
                candidate_id: candidate.id,
                name: candidate.name.clone(),
                vote_count: candidate.vote_count,
                ledger_count,
                consistent: candidate.vote_count == ledger_count,
            }
        })
        .collect();

    let unknown_candidate_ballots = counts
        .by_candidate
        .iter()
        .filter(|(id, _)| unit.candidate(**id).is_none())
        .map(|(_, count)| count)
        .sum();

    let consistent =
        unknown_candidate_ballots == 0 && candidates.iter().all(|candidate| candidate.consistent);
    UnitTally {
        unit_id: unit.id,
        unit_name: unit.name.clone(),
        candidates,
        against_all: counts.against_all,
        abstain: counts.abstain,
        unknown_candidate_ballots,
        total_active_ballots: counts.total(),
        consistent,
    }
}

/// Read units and their ledger counts from one consistent snapshot.
struct ReadTallies {
    units: Coll<ElectionUnit>,
    ballots: Coll<Ballot>,
    /// Every unit if not given.
    unit_id: Option<UnitId>,
}

#[rocket::async_trait]
impl TransactionBody for ReadTallies {
    type Output = Vec<UnitTally>;
    type Rejection = ();

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let filter = self.unit_id.map(u32_id_filter);
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let units: Vec<ElectionUnit> = self
            .units
            .find_with_session(filter, options, session)
            .await?
            .stream(session)
            .try_collect()
            .await?;
        if self.unit_id.is_some() && units.is_empty() {
            return Ok(Err(()));
        }

        let mut tallies = Vec::with_capacity(units.len());
        for unit in &units {
            let counts = live_counts_in_session(&self.ballots, unit.id, session).await?;
            tallies.push(tally(unit, &counts));
        }
        Ok(Ok(tallies))
    }
}

impl Voting {
    /// Recount one unit from its ledger.
    pub async fn unit_tally(&self, unit_id: UnitId) -> Result<UnitTally> {
        let body = ReadTallies {
            units: self.coll(),
            ballots: self.coll(),
            unit_id: Some(unit_id),
        };
        let mut tallies = self
            .transactor
            .run(&body)
            .await?
            .map_err(|()| Error::not_found(format!("Election unit {unit_id}")))?;
        tallies
            .pop()
            .ok_or_else(|| Error::not_found(format!("Election unit {unit_id}")))
    }

    /// Recount every unit, reporting those whose counters have drifted.
    pub async fn audit(&self) -> Result<AuditReport> {
        let body = ReadTallies {
            units: self.coll(),
            ballots: self.coll(),
            unit_id: None,
        };
        let tallies = match self.transactor.run(&body).await? {
            Ok(tallies) => tallies,
            Err(()) => Vec::new(),
        };
        let units_checked = tallies.len();
        let drift: Vec<UnitTally> = tallies
            .into_iter()
            .filter(|tally| !tally.consistent)
            .collect();
        if drift.is_empty() {
            info!("Audit of {units_checked} election units found no drift");
        } else {
            warn!(
                "Audit found drift in {} of {units_checked} election units",
                drift.len()
            );
        }
        Ok(AuditReport {
            consistent: drift.is_empty(),
            units_checked,
            drift,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::model::api::{
        submission::{BallotSubmission, Choice},
        unit::{CandidateSpec, UnitSpec},
    };

    use super::*;

    #[test]
    fn matching_counters_are_consistent() {
        let mut unit = ElectionUnit::example();
        unit.candidates[0].vote_count = 2;
        let counts = LedgerCounts {
            by_candidate: HashMap::from([(1, 2)]),
            against_all: 1,
            abstain: 3,
        };
        let tally = tally(&unit, &counts);
        assert!(tally.consistent);
        assert_eq!(tally.total_active_ballots, 6);
        assert_eq!(tally.candidates.len(), 3);
        assert_eq!(tally.candidates[1].ledger_count, 0);
    }

    #[test]
    fn drift_is_reported() {
        let mut unit = ElectionUnit::example();
        unit.candidates[1].vote_count = 1;
        let tally = tally(&unit, &LedgerCounts::default());
        assert!(!tally.consistent);
        assert!(!tally.candidates[1].consistent);
        assert!(tally.candidates[0].consistent);

        let counts = LedgerCounts {
            by_candidate: HashMap::from([(42, 1)]),
            ..LedgerCounts::default()
        };
        let tally = super::tally(&ElectionUnit::example(), &counts);
        assert_eq!(tally.unknown_candidate_ballots, 1);
        assert!(!tally.consistent);
    }

    #[backend_test(active)]
    async fn audit_detects_tampering(voting: Voting, units: Coll<ElectionUnit>) {
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
        for (voter, choice) in [
            ("tg-1", Choice::Candidate(candidate.id)),
            ("tg-2", Choice::Candidate(candidate.id)),
            ("tg-3", Choice::Abstain),
        ] {
            let submission = BallotSubmission::example(voter, unit.id, choice);
            voting.cast_ballot(submission).await.unwrap();
        }

        let tally = voting.unit_tally(unit.id).await.unwrap();
        assert!(tally.consistent);
        assert_eq!(tally.candidates[0].ledger_count, 2);
        assert_eq!(tally.abstain, 1);
        assert_eq!(tally.total_active_ballots, 3);
        assert!(voting.audit().await.unwrap().consistent);

        units
            .update_one(
                u32_id_filter(unit.id),
                doc! {"$set": {"candidates.0.vote_count": 5}},
                None,
            )
            .await
            .unwrap();
        let report = voting.audit().await.unwrap();
        assert!(!report.consistent);
        assert_eq!(report.units_checked, 1);
        assert_eq!(report.drift[0].candidates[0].vote_count, 5);

        assert!(voting.unit_tally(unit.id + 1).await.is_err());
    }
}
