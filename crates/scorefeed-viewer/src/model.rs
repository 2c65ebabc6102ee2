//! Local scoreboard state and incremental reconciliation.
//!
//! The model holds the viewer's last-known standings and reduces incoming
//! push messages (or polled snapshots) to minimal render operations, so a
//! display only repaints the teams that actually changed. Messages older
//! than the current revision are discarded; re-delivery after a reconnect
//! is therefore harmless.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use scorefeed_core::{
    ScoreboardApiResponse, ScoreboardMessage, SessionId, SessionSnapshot, SessionStatistics,
    SessionStatus, TeamId, TeamStanding, Trend,
};
use tracing::{debug, trace};

/// Duration of the score roll-up animation.
pub const SCORE_ANIMATION_MS: u64 = 800;

/// Where the client currently gets its data from, shown to the user as a
/// connection banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    /// Push feed established, updates stream in live.
    Live,
    /// Push feed lost, retrying with backoff.
    Reconnecting { attempt: u32 },
    /// Push retries exhausted, refreshing over HTTP instead.
    Polling,
    /// Session over, board frozen.
    Ended,
}

/// One visible scoreboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRow {
    pub team: TeamId,
    pub name: String,
    pub school: String,
    pub rank: u32,
    pub total: Decimal,
    pub trend: Trend,
    pub judges_completed: u32,
    pub breakdown: BTreeMap<String, Decimal>,
}

impl From<&TeamStanding> for TeamRow {
    fn from(standing: &TeamStanding) -> Self {
        Self {
            team: standing.team,
            name: standing.name.clone(),
            school: standing.school.clone(),
            rank: standing.rank,
            total: standing.total,
            trend: standing.trend,
            judges_completed: standing.judges_completed,
            breakdown: standing.breakdown.clone(),
        }
    }
}

/// Minimal repaint instruction for a render surface.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    /// Replace the whole visible list (connect, re-sync, poll refresh).
    ReplaceAll { rows: Vec<TeamRow> },
    /// Animate one team's score from its previous value.
    UpdateScore {
        team: TeamId,
        from: Decimal,
        to: Decimal,
        animate_ms: u64,
    },
    /// Move one team's row and show its rank-change indicator.
    MoveRank {
        team: TeamId,
        from: u32,
        to: u32,
        trend: Trend,
    },
    /// Refresh the header statistics.
    UpdateStats { statistics: SessionStatistics },
    /// Freeze the board; the session is over.
    Finalize,
}

/// An update deferred while a user interaction is active. Push messages
/// and polled snapshots queue through the same gate so neither transport
/// can clobber interaction-local state.
#[derive(Debug)]
enum PendingUpdate {
    Push(ScoreboardMessage),
    Poll(ScoreboardApiResponse),
}

/// Viewer-local scoreboard state.
#[derive(Debug)]
pub struct ScoreboardModel {
    session: SessionId,
    revision: u64,
    rows: Vec<TeamRow>,
    /// Nesting depth of active user interactions.
    interaction_depth: u32,
    /// Updates deferred while an interaction is active.
    queued: Vec<PendingUpdate>,
    ended: bool,
}

impl ScoreboardModel {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            revision: 0,
            rows: Vec::new(),
            interaction_depth: 0,
            queued: Vec::new(),
            ended: false,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rows(&self) -> &[TeamRow] {
        &self.rows
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Reduce one push message to render operations.
    ///
    /// While a user interaction is active the message is queued instead,
    /// and flushed by [`end_interaction`](Self::end_interaction); incoming
    /// updates never clobber interaction-local state.
    pub fn ingest(&mut self, message: ScoreboardMessage) -> Vec<RenderOp> {
        if self.ended {
            return Vec::new();
        }

        if self.interaction_depth > 0 {
            trace!(session = %self.session, "Interaction active, queueing update");
            self.queued.push(PendingUpdate::Push(message));
            return Vec::new();
        }

        self.apply(message)
    }

    /// Reduce a polled full snapshot to render operations.
    ///
    /// Idempotent: a response at or below the current revision is a no-op,
    /// so overlapping polls and push re-syncs cannot go backwards. Queued
    /// behind active interactions the same way push messages are.
    pub fn ingest_poll(&mut self, response: ScoreboardApiResponse) -> Vec<RenderOp> {
        if self.ended {
            return Vec::new();
        }

        if self.interaction_depth > 0 {
            trace!(session = %self.session, "Interaction active, queueing poll");
            self.queued.push(PendingUpdate::Poll(response));
            return Vec::new();
        }

        self.apply_poll(response)
    }

    /// Mark the start of a user interaction (detail expansion, manual
    /// refresh). Nested interactions are counted.
    pub fn begin_interaction(&mut self) {
        self.interaction_depth += 1;
    }

    /// Settle a user interaction; returns the render operations for every
    /// update queued while it was active, in arrival order.
    pub fn end_interaction(&mut self) -> Vec<RenderOp> {
        self.interaction_depth = self.interaction_depth.saturating_sub(1);
        if self.interaction_depth > 0 {
            return Vec::new();
        }

        let queued = std::mem::take(&mut self.queued);
        queued
            .into_iter()
            .flat_map(|pending| match pending {
                PendingUpdate::Push(message) => self.apply(message),
                PendingUpdate::Poll(response) => self.apply_poll(response),
            })
            .collect()
    }

    fn apply_poll(&mut self, response: ScoreboardApiResponse) -> Vec<RenderOp> {
        if self.ended || response.revision <= self.revision {
            return Vec::new();
        }

        self.revision = response.revision;
        self.rows = response.standings.iter().map(TeamRow::from).collect();
        self.rows.sort_by_key(|r| r.rank);

        let mut ops = vec![
            RenderOp::ReplaceAll {
                rows: self.rows.clone(),
            },
            RenderOp::UpdateStats {
                statistics: response.statistics,
            },
        ];

        if response.status == SessionStatus::Ended {
            self.ended = true;
            ops.push(RenderOp::Finalize);
        }

        ops
    }

    fn apply(&mut self, message: ScoreboardMessage) -> Vec<RenderOp> {
        // A queued terminal message freezes everything behind it.
        if self.ended {
            return Vec::new();
        }

        // At-least-once delivery: drop anything older than what we show.
        if message.revision() < self.revision {
            debug!(
                session = %self.session,
                have = self.revision,
                got = message.revision(),
                "Discarding stale message"
            );
            return Vec::new();
        }

        match message {
            ScoreboardMessage::ScoreboardUpdate {
                snapshot,
                statistics,
            } => self.apply_full(snapshot, statistics),
            ScoreboardMessage::ScoreUpdate {
                revision,
                team,
                total,
                breakdown,
                judges_completed,
                ..
            } => {
                self.revision = revision;
                let Some(row) = self.rows.iter_mut().find(|r| r.team == team) else {
                    return Vec::new();
                };
                let from = row.total;
                row.total = total;
                row.breakdown = breakdown;
                row.judges_completed = judges_completed;
                vec![RenderOp::UpdateScore {
                    team,
                    from,
                    to: total,
                    animate_ms: SCORE_ANIMATION_MS,
                }]
            }
            ScoreboardMessage::RankChange {
                revision,
                team,
                from,
                to,
                trend,
                ..
            } => {
                self.revision = revision;
                let Some(row) = self.rows.iter_mut().find(|r| r.team == team) else {
                    return Vec::new();
                };
                row.rank = to;
                row.trend = trend;
                // Visible list stays sorted by rank after every update.
                self.rows.sort_by_key(|r| r.rank);
                vec![RenderOp::MoveRank {
                    team,
                    from,
                    to,
                    trend,
                }]
            }
            ScoreboardMessage::StatsUpdate {
                revision,
                statistics,
                ..
            } => {
                self.revision = revision;
                vec![RenderOp::UpdateStats { statistics }]
            }
            ScoreboardMessage::SessionEnded { revision, .. } => {
                self.revision = revision;
                self.ended = true;
                vec![RenderOp::Finalize]
            }
        }
    }

    fn apply_full(
        &mut self,
        snapshot: SessionSnapshot,
        statistics: SessionStatistics,
    ) -> Vec<RenderOp> {
        self.revision = snapshot.revision;
        self.rows = snapshot.standings.iter().map(TeamRow::from).collect();
        self.rows.sort_by_key(|r| r.rank);

        let mut ops = vec![
            RenderOp::ReplaceAll {
                rows: self.rows.clone(),
            },
            RenderOp::UpdateStats { statistics },
        ];

        if snapshot.meta.status == SessionStatus::Ended {
            self.ended = true;
            ops.push(RenderOp::Finalize);
        }

        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use scorefeed_core::SessionMeta;

    fn snapshot(revision: u64, totals: &[(u32, Decimal, u32)]) -> SessionSnapshot {
        let now = Utc::now();
        SessionSnapshot {
            meta: SessionMeta {
                id: SessionId::from("s1"),
                name: "Finals".to_string(),
                competition: "Regional".to_string(),
                category: "inventor".to_string(),
                status: SessionStatus::Active,
                viewer_count: 3,
                judges_active: 1,
            },
            standings: totals
                .iter()
                .map(|(team, total, rank)| {
                    let mut s = TeamStanding::for_roster_entry(
                        TeamId::new(*team),
                        format!("Team {team}"),
                        "School",
                        now,
                    );
                    s.total = *total;
                    s.rank = *rank;
                    s.previous_rank = *rank;
                    s
                })
                .collect(),
            revision,
            taken_at: now,
        }
    }

    fn full_update(revision: u64, totals: &[(u32, Decimal, u32)]) -> ScoreboardMessage {
        let snap = snapshot(revision, totals);
        let statistics = snap.statistics();
        ScoreboardMessage::ScoreboardUpdate {
            snapshot: snap,
            statistics,
        }
    }

    fn seeded_model() -> ScoreboardModel {
        let mut model = ScoreboardModel::new(SessionId::from("s1"));
        model.ingest(full_update(1, &[(1, dec!(50), 1), (2, dec!(0), 2)]));
        model
    }

    #[test]
    fn test_full_update_replaces_rows() {
        let mut model = ScoreboardModel::new(SessionId::from("s1"));
        let ops = model.ingest(full_update(1, &[(2, dec!(75), 1), (1, dec!(50), 2)]));

        assert!(matches!(ops[0], RenderOp::ReplaceAll { .. }));
        assert_eq!(model.revision(), 1);
        assert_eq!(model.rows()[0].team, TeamId::new(2));
    }

    #[test]
    fn test_score_update_animates_from_previous_value() {
        let mut model = seeded_model();

        let ops = model.ingest(ScoreboardMessage::ScoreUpdate {
            session: SessionId::from("s1"),
            revision: 2,
            team: TeamId::new(1),
            total: dec!(60),
            breakdown: BTreeMap::new(),
            judges_completed: 1,
        });

        assert_eq!(
            ops,
            vec![RenderOp::UpdateScore {
                team: TeamId::new(1),
                from: dec!(50),
                to: dec!(60),
                animate_ms: SCORE_ANIMATION_MS,
            }]
        );
        assert_eq!(model.rows()[0].total, dec!(60));
    }

    #[test]
    fn test_rank_change_resorts_rows() {
        let mut model = seeded_model();

        model.ingest(ScoreboardMessage::RankChange {
            session: SessionId::from("s1"),
            revision: 2,
            team: TeamId::new(2),
            from: 2,
            to: 1,
            delta: 1,
            trend: Trend::Up,
        });
        model.ingest(ScoreboardMessage::RankChange {
            session: SessionId::from("s1"),
            revision: 2,
            team: TeamId::new(1),
            from: 1,
            to: 2,
            delta: -1,
            trend: Trend::Down,
        });

        let ranks: Vec<(u32, u32)> = model
            .rows()
            .iter()
            .map(|r| (r.team.inner(), r.rank))
            .collect();
        assert_eq!(ranks, vec![(2, 1), (1, 2)]);
    }

    #[test]
    fn test_stale_message_discarded() {
        let mut model = seeded_model();
        let before = model.rows().to_vec();

        let ops = model.ingest(ScoreboardMessage::ScoreUpdate {
            session: SessionId::from("s1"),
            revision: 0,
            team: TeamId::new(1),
            total: dec!(999),
            breakdown: BTreeMap::new(),
            judges_completed: 1,
        });

        assert!(ops.is_empty());
        assert_eq!(model.rows(), &before[..]);
    }

    #[test]
    fn test_interaction_queues_updates_then_flushes() {
        let mut model = seeded_model();

        model.begin_interaction();
        let during = model.ingest(ScoreboardMessage::ScoreUpdate {
            session: SessionId::from("s1"),
            revision: 2,
            team: TeamId::new(1),
            total: dec!(70),
            breakdown: BTreeMap::new(),
            judges_completed: 1,
        });
        assert!(during.is_empty(), "updates must not land mid-interaction");
        assert_eq!(model.rows()[0].total, dec!(50), "state untouched");

        let flushed = model.end_interaction();
        assert_eq!(flushed.len(), 1);
        assert_eq!(model.rows()[0].total, dec!(70));
    }

    #[test]
    fn test_poll_queues_during_interaction() {
        let mut model = seeded_model();

        model.begin_interaction();
        model.ingest(full_update(2, &[(1, dec!(60), 1), (2, dec!(0), 2)]));

        // A polled refresh must respect the interaction gate like push does.
        let response = ScoreboardApiResponse::from_snapshot(
            snapshot(3, &[(1, dec!(70), 1), (2, dec!(0), 2)]),
            true,
        );
        let during = model.ingest_poll(response);
        assert!(during.is_empty(), "poll must not land mid-interaction");
        assert_eq!(model.rows()[0].total, dec!(50), "state untouched");
        assert_eq!(model.revision(), 1);

        // Flush applies push then poll, in arrival order.
        let flushed = model.end_interaction();
        assert!(!flushed.is_empty());
        assert_eq!(model.revision(), 3);
        assert_eq!(model.rows()[0].total, dec!(70));
    }

    #[test]
    fn test_nested_interactions_flush_once() {
        let mut model = seeded_model();

        model.begin_interaction();
        model.begin_interaction();
        model.ingest(full_update(2, &[(1, dec!(80), 1), (2, dec!(0), 2)]));

        assert!(model.end_interaction().is_empty());
        let flushed = model.end_interaction();
        assert!(!flushed.is_empty());
        assert_eq!(model.revision(), 2);
    }

    #[test]
    fn test_session_ended_freezes_model() {
        let mut model = seeded_model();

        let ops = model.ingest(ScoreboardMessage::SessionEnded {
            session: SessionId::from("s1"),
            revision: 3,
        });
        assert_eq!(ops, vec![RenderOp::Finalize]);
        assert!(model.is_ended());

        // Nothing renders after the terminal message.
        let after = model.ingest(full_update(4, &[(1, dec!(99), 1)]));
        assert!(after.is_empty());
    }

    #[test]
    fn test_poll_is_idempotent() {
        let mut model = seeded_model();

        let response =
            ScoreboardApiResponse::from_snapshot(snapshot(1, &[(1, dec!(50), 1)]), true);
        assert!(model.ingest_poll(response).is_empty(), "same revision no-op");

        let newer = ScoreboardApiResponse::from_snapshot(
            snapshot(5, &[(2, dec!(90), 1), (1, dec!(50), 2)]),
            true,
        );
        let ops = model.ingest_poll(newer);
        assert!(matches!(ops[0], RenderOp::ReplaceAll { .. }));
        assert_eq!(model.revision(), 5);
    }

    #[test]
    fn test_poll_detects_session_end() {
        let mut model = seeded_model();

        let mut ended = snapshot(6, &[(1, dec!(50), 1)]);
        ended.meta.status = SessionStatus::Ended;
        let ops = model.ingest_poll(ScoreboardApiResponse::from_snapshot(ended, true));

        assert!(ops.contains(&RenderOp::Finalize));
        assert!(model.is_ended());
    }
}
