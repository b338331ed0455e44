//! Route modules.

pub mod health;
pub mod session;
pub mod voting;
