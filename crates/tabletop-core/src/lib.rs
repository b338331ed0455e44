//! Tabletop Core: shared domain abstractions.
//!
//! This crate defines the traits and types every bounded context depends on,
//! including the ports through which the voting core reaches the live
//! session. It contains no infrastructure code.

pub mod aggregate;
pub mod broadcast;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod session;
