//! Application layer for live sessions.

pub mod broadcast;
pub mod registry;
