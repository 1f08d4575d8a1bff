use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    ballot::Ballot, conversation::Conversation, eligible_voter::EligibleVoter,
    election_unit::ElectionUnit, setting::Setting, voter::Voter,
};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for Voter {
    const NAME: &'static str = "voters";
}

impl MongoCollection for EligibleVoter {
    const NAME: &'static str = "eligible_voters";
}

impl MongoCollection for ElectionUnit {
    const NAME: &'static str = "election_units";
}

impl MongoCollection for Ballot {
    const NAME: &'static str = "ballots";
}

impl MongoCollection for Setting {
    const NAME: &'static str = "settings";
}

impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

impl MongoCollection for Conversation {
    const NAME: &'static str = "conversations";
}

/// Name of the index that allows at most one live ballot per voter and unit.
pub const ONE_LIVE_BALLOT_INDEX: &str = "one_live_ballot_per_voter_and_unit";

/// Ensure that all the required indexes exist on the given database.
///
/// The partial unique index on ballots is part of the storage contract: it is the
/// last line of defence against double voting, even if every check above it raced.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Voter collection.
    let external_id_index = IndexModel::builder()
        .keys(doc! {"external_id": 1})
        .options(unique.clone())
        .build();
    let voter_name_index = IndexModel::builder()
        .keys(doc! {"normalized_name": 1})
        .build();
    let voters = Coll::<Voter>::from_db(db);
    voters.create_index(external_id_index, None).await?;
    voters.create_index(voter_name_index, None).await?;

    // Ballot collection.
    let live_ballot_options = IndexOptions::builder()
        .name(ONE_LIVE_BALLOT_INDEX.to_string())
        .unique(true)
        .partial_filter_expression(doc! {"is_cancelled": false})
        .build();
    let live_ballot_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_unit_id": 1})
        .options(live_ballot_options)
        .build();
    let tally_index = IndexModel::builder()
        .keys(doc! {"election_unit_id": 1, "is_cancelled": 1, "candidate_id": 1})
        .build();
    let ballots = Coll::<Ballot>::from_db(db);
    ballots.create_index(live_ballot_index, None).await?;
    ballots.create_index(tally_index, None).await?;

    Ok(())
}
