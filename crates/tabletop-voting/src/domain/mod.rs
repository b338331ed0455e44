//! Domain model for absentee votes.

pub mod aggregates;
pub mod commands;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod quorum;
