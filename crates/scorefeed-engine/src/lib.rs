//! Standings computation engine.
//!
//! Given the per-judge score ledger for a session and one incoming
//! submission, computes the next standings snapshot: per-team totals,
//! dense 1..N ranks, rank deltas, and trends. Pure data transformation;
//! no I/O and no shared state.

pub mod engine;
pub mod ledger;

pub use engine::StandingsEngine;
pub use ledger::ScoreLedger;
