use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
    ClientSession,
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

pub const VOTER_ID_COUNTER: &str = "voter_id";
pub const UNIT_ID_COUNTER: &str = "election_unit_id";
pub const CANDIDATE_ID_COUNTER: &str = "candidate_id";
pub const BALLOT_ID_COUNTER: &str = "ballot_id";

const ALL_COUNTERS: [&str; 4] = [
    VOTER_ID_COUNTER,
    UNIT_ID_COUNTER,
    CANDIDATE_ID_COUNTER,
    BALLOT_ID_COUNTER,
];

/// A counter object used to implement auto-increment integer IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    /// The most recently issued value; zero if none has been issued yet.
    pub last: u32,
}

impl Counter {
    /// Atomically issue the next value of the named counter.
    pub async fn next(counters: &Coll<Counter>, name: &str) -> Result<u32> {
        let counter = counters
            .find_one_and_update(doc! {"_id": name}, Self::increment(), Self::after())
            .await?;
        Self::issued(counter, name)
    }

    /// Atomically issue the next value of the named counter as part of a transaction.
    ///
    /// The counter document must already exist, since documents cannot be created implicitly
    /// inside every transaction; see [`ensure_counters_exist`].
    pub async fn next_with_session(
        counters: &Coll<Counter>,
        name: &str,
        session: &mut ClientSession,
    ) -> Result<u32> {
        let counter = counters
            .find_one_and_update_with_session(
                doc! {"_id": name},
                Self::increment(),
                Self::after(),
                session,
            )
            .await?;
        Self::issued(counter, name)
    }

    fn increment() -> mongodb::bson::Document {
        doc! {
            "$inc": { "last": 1 }
        }
    }

    fn after() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    fn issued(counter: Option<Counter>, name: &str) -> Result<u32> {
        counter.map(|c| c.last).ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                format!("Failed to find counter '{name}'"),
            )
        })
    }
}

/// Ensure every ID counter exists, without resetting any that already do.
///
/// This operation is idempotent.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> std::result::Result<(), DbError> {
    let upsert = UpdateOptions::builder().upsert(true).build();
    for name in ALL_COUNTERS {
        let update = doc! {
            "$setOnInsert": { "last": 0 }
        };
        counters
            .update_one(doc! {"_id": name}, update, upsert.clone())
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[backend_test]
    async fn counters_issue_sequential_ids(counters: Coll<Counter>) {
        // The fairing already created the counters; doing it again must not reset them.
        let first = Counter::next(&counters, BALLOT_ID_COUNTER).await.unwrap();
        ensure_counters_exist(&counters).await.unwrap();
        let second = Counter::next(&counters, BALLOT_ID_COUNTER).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);

        // Counters are independent.
        let unit = Counter::next(&counters, UNIT_ID_COUNTER).await.unwrap();
        assert_eq!(unit, 1);

        // Unknown counters are an error, not a silent zero.
        assert!(Counter::next(&counters, "nonsense").await.is_err());
    }
}
