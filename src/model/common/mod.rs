//! Types shared between the database and API representations.

pub mod conversation;
pub mod names;
pub mod status;
pub mod vote;

pub type VoterId = u32;
pub type UnitId = u32;
pub type CandidateId = u32;
pub type BallotId = u32;
pub type AdminId = u32;
