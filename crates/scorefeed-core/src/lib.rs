//! Core domain types for the scorefeed live scoreboard pipeline.
//!
//! This crate provides fundamental types used throughout the system:
//! - `SessionId`, `TeamId`, `JudgeId`: identifiers for live sessions and participants
//! - `ScoreSubmission`: one judge's criterion-level scores for one team
//! - `TeamStanding`, `SessionSnapshot`: derived standings state sent to viewers
//! - `ScoringModel`: data-driven category weighting policy

pub mod error;
pub mod scoring;
pub mod types;
pub mod wire;

pub use error::{Result, ScoreError};
pub use wire::{ScoreboardApiResponse, ScoreboardMessage};
pub use scoring::{ScoringCategory, ScoringModel};
pub use types::{
    DisplayMode, JudgeId, ScoreSubmission, SessionId, SessionMeta, SessionSnapshot,
    SessionStatistics, SessionStatus, TeamId, TeamStanding, Trend,
};
