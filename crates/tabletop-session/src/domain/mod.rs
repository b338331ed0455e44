//! Domain layer for live sessions.

pub mod live_session;
