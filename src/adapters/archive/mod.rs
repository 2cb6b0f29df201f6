//! Turn archive adapters.
//!
//! Implementations of the [`crate::ports::TurnArchive`] port: PostgreSQL for
//! deployments with analytics, in-memory for tests and archive-less runs.

mod in_memory;
mod postgres_archive;

pub use in_memory::{FailingTurnArchive, InMemoryTurnArchive};
pub use postgres_archive::PostgresTurnArchive;
