//! API-friendly (e.g. JSON-serialisable) types, exchanged with the conversational front-end
//! and administrators.

pub mod auth;
pub mod ballot;
pub mod cancellation;
pub mod conversation;
pub mod pagination;
pub mod registry;
pub mod status;
pub mod submission;
pub mod tally;
pub mod unit;
