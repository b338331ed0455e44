//! Application services for the absentee voting context.

pub mod coordinator;
pub mod expiry;
pub mod locks;
pub mod mediator;
pub mod query_handlers;
pub mod settings;
