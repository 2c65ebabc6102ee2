//! Error taxonomy for score submission and session lifecycle.

use crate::types::{SessionId, SessionStatus, TeamId};
use thiserror::Error;

/// Errors raised along the submission path.
///
/// Every variant is all-or-nothing: when a submission is rejected the
/// session snapshot it targeted is left untouched.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Submission references a team outside the session roster.
    #[error("unknown team {team} in session {session}")]
    UnknownTeam { session: SessionId, team: TeamId },

    /// Malformed score payload (missing criterion, negative or out-of-range value).
    #[error("invalid score: {0}")]
    InvalidScore(String),

    /// Submission or subscription against a finalized session.
    #[error("session {0} has ended")]
    SessionEnded(SessionId),

    /// Session id does not exist in the store.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Session exists but is not accepting scores (scheduled or paused).
    #[error("session {session} is not active (status: {status})")]
    SessionNotActive {
        session: SessionId,
        status: SessionStatus,
    },
}

/// Result type alias for scoreboard operations.
pub type Result<T> = std::result::Result<T, ScoreError>;
