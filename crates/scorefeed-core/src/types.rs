//! Domain types for sessions, submissions, and standings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique identifier for a live scoreboard session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Team identifier, assigned at registration time by the admin side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TeamId(u32);

impl TeamId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn inner(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Judge identifier (login name on the scoring side).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudgeId(String);

impl JudgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JudgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display mode hint carried by a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Full desktop scoreboard.
    #[default]
    Standard,
    /// Compact phone layout.
    Mobile,
    /// TV kiosk rotation.
    Tv,
}

impl DisplayMode {
    /// Parse the `mode` query parameter; unknown values fall back to standard.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("mobile") => Self::Mobile,
            Some("tv") => Self::Tv,
            _ => Self::Standard,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Mobile => write!(f, "mobile"),
            Self::Tv => write!(f, "tv"),
        }
    }
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Active,
    Paused,
    Ended,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Rank movement direction derived from the rank delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Steady,
}

impl Trend {
    /// Delta is `previous_rank - current_rank`; positive means moved up.
    pub fn from_delta(delta: i32) -> Self {
        match delta.cmp(&0) {
            std::cmp::Ordering::Greater => Self::Up,
            std::cmp::Ordering::Less => Self::Down,
            std::cmp::Ordering::Equal => Self::Steady,
        }
    }
}

/// One judge's criterion-level scores for one team in one session.
///
/// Immutable once accepted. A resubmission by the same judge supersedes
/// the earlier one; it never mutates it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub session: SessionId,
    pub team: TeamId,
    pub judge: JudgeId,
    /// Criterion name -> numeric score, in criterion order.
    pub scores: BTreeMap<String, Decimal>,
    pub submitted_at: DateTime<Utc>,
}

impl ScoreSubmission {
    pub fn new(
        session: SessionId,
        team: TeamId,
        judge: JudgeId,
        scores: BTreeMap<String, Decimal>,
    ) -> Self {
        Self {
            session,
            team,
            judge,
            scores,
            submitted_at: Utc::now(),
        }
    }
}

/// Derived per-team aggregate for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team: TeamId,
    pub name: String,
    pub school: String,
    /// Weighted total across all categories. Non-negative.
    pub total: Decimal,
    /// Per-criterion aggregated score breakdown.
    pub breakdown: BTreeMap<String, Decimal>,
    /// 1-based dense rank within the session.
    pub rank: u32,
    /// Rank in the previously emitted snapshot.
    pub previous_rank: u32,
    /// `previous_rank - current_rank`; positive = moved up.
    pub rank_delta: i32,
    pub trend: Trend,
    /// Distinct judges that have submitted for this team.
    pub judges_completed: u32,
    pub finalized: bool,
    pub last_updated: DateTime<Utc>,
}

impl TeamStanding {
    /// Fresh standing for a roster entry with no scores yet.
    pub fn for_roster_entry(
        team: TeamId,
        name: impl Into<String>,
        school: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            team,
            name: name.into(),
            school: school.into(),
            total: Decimal::ZERO,
            breakdown: BTreeMap::new(),
            rank: 0,
            previous_rank: 0,
            rank_delta: 0,
            trend: Trend::Steady,
            judges_completed: 0,
            finalized: false,
            last_updated: registered_at,
        }
    }
}

/// Session metadata travelling with every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: SessionId,
    pub name: String,
    pub competition: String,
    pub category: String,
    pub status: SessionStatus,
    /// Currently connected viewers (filled in by the broadcaster at send time).
    pub viewer_count: u32,
    /// Distinct judges that have submitted at least one score.
    pub judges_active: u32,
}

/// The full ordered standings for one session at one point in time.
///
/// This is the unit of transmission to viewers; standings are sorted by
/// rank ascending. The revision increases by one per accepted submission
/// so clients can discard stale data after a reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub meta: SessionMeta,
    pub standings: Vec<TeamStanding>,
    pub revision: u64,
    pub taken_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Look up a team's standing.
    pub fn standing(&self, team: TeamId) -> Option<&TeamStanding> {
        self.standings.iter().find(|s| s.team == team)
    }

    /// Derive display statistics from the current standings.
    pub fn statistics(&self) -> SessionStatistics {
        let high_score = self
            .standings
            .iter()
            .map(|s| s.total)
            .max()
            .unwrap_or(Decimal::ZERO);
        let teams = self.standings.len() as u32;
        let average_score = if teams == 0 {
            Decimal::ZERO
        } else {
            let sum: Decimal = self.standings.iter().map(|s| s.total).sum();
            (sum / Decimal::from(teams)).round_dp(2)
        };

        SessionStatistics {
            high_score,
            average_score,
            teams,
            judges_active: self.meta.judges_active,
            last_update_ms: self.taken_at.timestamp_millis(),
        }
    }
}

/// Aggregate statistics shown in the scoreboard header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub high_score: Decimal,
    pub average_score: Decimal,
    pub teams: u32,
    pub judges_active: u32,
    pub last_update_ms: i64,
}
