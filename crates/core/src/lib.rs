//! Domain logic for the asset loan workflow.
//!
//! Everything in this crate is pure: no I/O, no database handles. The db
//! layer re-reads persisted state inside a transaction and delegates every
//! transition decision to the functions here, so the rules are unit-testable
//! without a running PostgreSQL instance.

pub mod audit;
pub mod error;
pub mod gate;
pub mod roles;
pub mod types;
pub mod workflow;
