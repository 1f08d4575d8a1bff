//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - datetimes are serialised in MongoDB's own format;
//! - field names are snake_case, matching the indexes in [`crate::model::mongodb`].

pub mod ballot;
pub mod conversation;
pub mod election_unit;
pub mod eligible_voter;
pub mod setting;
pub mod voter;
