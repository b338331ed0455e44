//! Live tabletop sessions.
//!
//! Tracks who is connected, which character acts next in the current round,
//! and which absent characters are being played by an AI stand-in. The
//! registry implements the session ports the voting core depends on.

pub mod application;
pub mod domain;
