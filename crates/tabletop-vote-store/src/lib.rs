//! Tabletop vote store: keyed storage for absentee votes.

pub mod in_memory_vote_ledger;

pub use in_memory_vote_ledger::InMemoryVoteLedger;
