//! Requests that change session or vote state.

use uuid::Uuid;

/// A request entering the system, identified for log correlation.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Dotted name logged with the command, such as `voting.cast_absentee_ballot`.
    fn command_type(&self) -> &'static str;

    /// Ties every event and log line the command produces back to it.
    fn correlation_id(&self) -> Uuid;
}
