//! Tabletop: absentee voting bounded context.
//!
//! When a player drops out of a live session, the remaining participants vote
//! to skip the absent character's turn or hand the character to an AI
//! stand-in. This crate owns the vote lifecycle: ledger contract, quorum
//! rules, expiry, and the hand-off to the session's turn order.

pub mod application;
pub mod domain;
