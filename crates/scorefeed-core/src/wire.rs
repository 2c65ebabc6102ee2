//! Wire protocol shared by the scoreboard server and viewer clients.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    SessionId, SessionSnapshot, SessionStatistics, SessionStatus, TeamId, TeamStanding, Trend,
};

/// Push-channel message (tagged enum for type safety on both ends).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreboardMessage {
    /// Full current state. Sent on connect, on lag re-sync, and as the
    /// last data message before `session_ended`.
    ScoreboardUpdate {
        snapshot: SessionSnapshot,
        statistics: SessionStatistics,
    },
    /// One team's score changed.
    ScoreUpdate {
        session: SessionId,
        revision: u64,
        team: TeamId,
        total: Decimal,
        breakdown: BTreeMap<String, Decimal>,
        judges_completed: u32,
    },
    /// One team's rank changed.
    RankChange {
        session: SessionId,
        revision: u64,
        team: TeamId,
        from: u32,
        to: u32,
        delta: i32,
        trend: Trend,
    },
    /// Header statistics changed.
    StatsUpdate {
        session: SessionId,
        revision: u64,
        statistics: SessionStatistics,
    },
    /// Terminal message; the channel closes after it.
    SessionEnded { session: SessionId, revision: u64 },
}

impl ScoreboardMessage {
    /// Revision the message was emitted at.
    pub fn revision(&self) -> u64 {
        match self {
            Self::ScoreboardUpdate { snapshot, .. } => snapshot.revision,
            Self::ScoreUpdate { revision, .. }
            | Self::RankChange { revision, .. }
            | Self::StatsUpdate { revision, .. }
            | Self::SessionEnded { revision, .. } => *revision,
        }
    }
}

/// Response body of `GET /scoreboard/{session_id}/api`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreboardApiResponse {
    pub standings: Vec<TeamStanding>,
    pub statistics: SessionStatistics,
    pub status: SessionStatus,
    pub revision: u64,
}

impl ScoreboardApiResponse {
    /// Build from a snapshot; without `detailed=1` the per-criterion
    /// breakdown is stripped to keep kiosk payloads small.
    pub fn from_snapshot(snapshot: SessionSnapshot, detailed: bool) -> Self {
        let statistics = snapshot.statistics();
        let mut standings = snapshot.standings;
        if !detailed {
            for standing in &mut standings {
                standing.breakdown.clear();
            }
        }
        Self {
            standings,
            statistics,
            status: snapshot.meta.status,
            revision: snapshot.revision,
        }
    }
}
