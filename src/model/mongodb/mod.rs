mod bson;
mod collection;
mod counter;
pub mod errors;
mod transaction;

pub use self::bson::{optional_chrono_datetime, u32_id_filter};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection, ONE_LIVE_BALLOT_INDEX};
pub use counter::{
    ensure_counters_exist, Counter, BALLOT_ID_COUNTER, CANDIDATE_ID_COUNTER, UNIT_ID_COUNTER,
    VOTER_ID_COUNTER,
};
pub use transaction::{RetryPolicy, TransactionBody, Transactor};
