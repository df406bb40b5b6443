//! Migration workflow
//!
//! The team runs ANALYZE, PLAN and EXECUTE in order, then a bounded
//! VALIDATE/FIX loop, recording every turn in the session transcript.

pub mod history;
pub mod migration;
pub mod team;

#[cfg(feature = "database")]
pub use history::DbTranscript;
pub use history::{to_messages, MemoryTranscript, Transcript, TurnRecord, USER_ROLE};
pub use migration::{MigrationPhase, MigrationState, MigrationTransition};
pub use team::{MigrationReport, MigrationTeam};
