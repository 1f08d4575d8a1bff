//! Election units and their nested candidates.

use chrono::Utc;
use mongodb::{bson::doc, options::FindOptions, ClientSession};
use rocket::futures::TryStreamExt;

use crate::{
    error::{Error, Result},
    model::{
        api::unit::{CandidateDescription, CandidateSpec, PublicUnit, UnitDescription, UnitSpec},
        common::{CandidateId, UnitId},
        db::election_unit::{Candidate, ElectionUnit},
        mongodb::{
            u32_id_filter, Coll, Counter, TransactionBody, CANDIDATE_ID_COUNTER, UNIT_ID_COUNTER,
        },
    },
};

use super::Voting;

struct CreateUnit<'a> {
    units: Coll<ElectionUnit>,
    counters: Coll<Counter>,
    spec: &'a UnitSpec,
}

#[rocket::async_trait]
impl TransactionBody for CreateUnit<'_> {
    type Output = ElectionUnit;
    type Rejection = std::convert::Infallible;

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let id = Counter::next_with_session(&self.counters, UNIT_ID_COUNTER, session).await?;
        let unit = ElectionUnit::new(id, &self.spec.name, self.spec.starts_at, self.spec.ends_at);
        self.units
            .insert_one_with_session(&unit, None, session)
            .await?;
        Ok(Ok(unit))
    }
}

struct AddCandidate<'a> {
    units: Coll<ElectionUnit>,
    counters: Coll<Counter>,
    unit_id: UnitId,
    spec: &'a CandidateSpec,
}

#[rocket::async_trait]
impl TransactionBody for AddCandidate<'_> {
    type Output = Candidate;
    type Rejection = ();

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let exists = self
            .units
            .find_one_with_session(u32_id_filter(self.unit_id), None, session)
            .await?
            .is_some();
        if !exists {
            return Ok(Err(()));
        }

        let id = Counter::next_with_session(&self.counters, CANDIDATE_ID_COUNTER, session).await?;
        let candidate = Candidate::new(id, &self.spec.name);
        let update = doc! {
            "$push": { "candidates": mongodb::bson::to_bson(&candidate)? }
        };
        self.units
            .update_one_with_session(u32_id_filter(self.unit_id), update, None, session)
            .await?;
        Ok(Ok(candidate))
    }
}

impl Voting {
    /// Create a unit. New units are inactive.
    pub async fn create_unit(&self, spec: &UnitSpec) -> Result<UnitDescription> {
        spec.validate().map_err(Error::bad_request)?;
        let body = CreateUnit {
            units: self.coll(),
            counters: self.coll(),
            spec,
        };
        let unit = match self.serializer.write(self.transactor.run(&body)).await? {
            Ok(unit) => unit,
            Err(never) => match never {},
        };
        info!("Created election unit {} '{}'", unit.id, unit.name);
        Ok(unit.into())
    }

    pub async fn set_unit_active(&self, unit_id: UnitId, active: bool) -> Result<()> {
        let update = doc! {
            "$set": { "active": active }
        };
        let units = self.coll::<ElectionUnit>();
        let result = self
            .serializer
            .write(units.update_one(u32_id_filter(unit_id), update, None))
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("Election unit {unit_id}")));
        }
        info!("Election unit {unit_id} active: {active}");
        Ok(())
    }

    /// Add a candidate to a unit. New candidates are standing and have no votes.
    pub async fn add_candidate(
        &self,
        unit_id: UnitId,
        spec: &CandidateSpec,
    ) -> Result<CandidateDescription> {
        if spec.name.trim().is_empty() {
            return Err(Error::bad_request("Candidate name must not be empty".to_string()));
        }
        let body = AddCandidate {
            units: self.coll(),
            counters: self.coll(),
            unit_id,
            spec,
        };
        let candidate = self
            .serializer
            .write(self.transactor.run(&body))
            .await?
            .map_err(|()| Error::not_found(format!("Election unit {unit_id}")))?;
        info!("Added candidate {} to election unit {unit_id}", candidate.id);
        Ok(candidate.into())
    }

    pub async fn set_candidate_active(
        &self,
        unit_id: UnitId,
        candidate_id: CandidateId,
        active: bool,
    ) -> Result<()> {
        let filter = doc! {
            "_id": unit_id,
            "candidates.id": candidate_id,
        };
        let update = doc! {
            "$set": { "candidates.$.active": active }
        };
        let units = self.coll::<ElectionUnit>();
        let result = self
            .serializer
            .write(units.update_one(filter, update, None))
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!(
                "Candidate {candidate_id} in election unit {unit_id}"
            )));
        }
        Ok(())
    }

    pub async fn unit(&self, unit_id: UnitId) -> Result<UnitDescription> {
        self.coll::<ElectionUnit>()
            .find_one(u32_id_filter(unit_id), None)
            .await?
            .map(UnitDescription::from)
            .ok_or_else(|| Error::not_found(format!("Election unit {unit_id}")))
    }

    /// Every unit, with running totals.
    pub async fn list_units(&self) -> Result<Vec<UnitDescription>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let units = self
            .coll::<ElectionUnit>()
            .find(None, options)
            .await?
            .map_ok(UnitDescription::from)
            .try_collect()
            .await?;
        Ok(units)
    }

    /// Units that accept ballots right now, as shown to voters.
    pub async fn open_units(&self) -> Result<Vec<PublicUnit>> {
        let now = Utc::now();
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let units: Vec<ElectionUnit> = self
            .coll::<ElectionUnit>()
            .find(doc! {"active": true}, options)
            .await?
            .try_collect()
            .await?;
        Ok(units
            .into_iter()
            .filter(|unit| unit.is_open(now))
            .map(PublicUnit::from)
            .collect())
    }
}
