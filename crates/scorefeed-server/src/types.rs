//! Server-side wire helpers: diffing and REST payloads.
//!
//! The message types themselves live in `scorefeed_core::wire` so viewer
//! clients can parse them without pulling in the server stack.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scorefeed_core::{JudgeId, SessionId, SessionSnapshot, SessionStatus, TeamId};

pub use scorefeed_core::wire::{ScoreboardApiResponse, ScoreboardMessage};

/// One row of `GET /scoreboard/api/active-sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    pub competition: String,
    pub status: SessionStatus,
    pub viewer_count: u32,
}

/// Judge submission payload (`POST /scoreboard/{session_id}/scores`).
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionPayload {
    pub team: TeamId,
    pub judge: JudgeId,
    pub scores: BTreeMap<String, Decimal>,
}

/// Acknowledgement returned for an accepted submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionAccepted {
    pub session: SessionId,
    pub team: TeamId,
    pub revision: u64,
}

/// Compute the per-team diff messages between two consecutive snapshots.
///
/// Emits a `score_update` for each team whose total or breakdown changed,
/// a `rank_change` for each team whose rank moved, and a `stats_update`
/// when the header statistics differ. Consumers render full current state,
/// so no event log is kept; a subscriber that misses these re-syncs from a
/// full `scoreboard_update`.
pub fn diff_messages(
    previous: &SessionSnapshot,
    current: &SessionSnapshot,
) -> Vec<ScoreboardMessage> {
    let session = current.meta.id.clone();
    let revision = current.revision;
    let mut messages = Vec::new();

    for standing in &current.standings {
        let before = previous.standing(standing.team);

        let score_changed = before.map_or(true, |b| {
            b.total != standing.total || b.breakdown != standing.breakdown
        });
        if score_changed {
            messages.push(ScoreboardMessage::ScoreUpdate {
                session: session.clone(),
                revision,
                team: standing.team,
                total: standing.total,
                breakdown: standing.breakdown.clone(),
                judges_completed: standing.judges_completed,
            });
        }
    }

    for standing in &current.standings {
        let previous_rank = previous.standing(standing.team).map(|b| b.rank);
        if previous_rank != Some(standing.rank) {
            messages.push(ScoreboardMessage::RankChange {
                session: session.clone(),
                revision,
                team: standing.team,
                from: previous_rank.unwrap_or(standing.rank),
                to: standing.rank,
                delta: standing.rank_delta,
                trend: standing.trend,
            });
        }
    }

    let stats = current.statistics();
    if previous.statistics() != stats {
        messages.push(ScoreboardMessage::StatsUpdate {
            session,
            revision,
            statistics: stats,
        });
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use scorefeed_core::{SessionMeta, TeamStanding};

    fn snapshot(totals: &[(u32, Decimal, u32)], revision: u64) -> SessionSnapshot {
        let now = Utc::now();
        let standings = totals
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
            .collect();

        SessionSnapshot {
            meta: SessionMeta {
                id: SessionId::from("s1"),
                name: "Finals".to_string(),
                competition: "Regional".to_string(),
                category: "junior".to_string(),
                status: SessionStatus::Active,
                viewer_count: 0,
                judges_active: 1,
            },
            standings,
            revision,
            taken_at: now,
        }
    }

    #[test]
    fn test_diff_emits_only_changed_teams() {
        let previous = snapshot(&[(1, dec!(50), 1), (2, dec!(0), 2)], 1);
        let current = snapshot(&[(2, dec!(75), 1), (1, dec!(50), 2)], 2);

        let messages = diff_messages(&previous, &current);

        let score_updates: Vec<_> = messages
            .iter()
            .filter(|m| matches!(m, ScoreboardMessage::ScoreUpdate { .. }))
            .collect();
        assert_eq!(score_updates.len(), 1, "only team 2's score changed");

        let rank_changes: Vec<_> = messages
            .iter()
            .filter(|m| matches!(m, ScoreboardMessage::RankChange { .. }))
            .collect();
        assert_eq!(rank_changes.len(), 2, "both teams moved rank");
    }

    #[test]
    fn test_diff_identical_snapshots_is_empty() {
        let a = snapshot(&[(1, dec!(50), 1)], 1);
        assert!(diff_messages(&a, &a).is_empty());
    }

    #[test]
    fn test_diff_rank_change_carries_delta() {
        let mut previous = snapshot(&[(1, dec!(50), 1), (2, dec!(0), 2)], 1);
        previous.standings[1].previous_rank = 2;

        let mut current = snapshot(&[(2, dec!(75), 1), (1, dec!(50), 2)], 2);
        current.standings[0].previous_rank = 2;
        current.standings[0].rank_delta = 1;
        current.standings[1].previous_rank = 1;
        current.standings[1].rank_delta = -1;

        let messages = diff_messages(&previous, &current);
        let change = messages
            .iter()
            .find_map(|m| match m {
                ScoreboardMessage::RankChange {
                    team, from, to, delta, ..
                } if *team == TeamId::new(2) => Some((*from, *to, *delta)),
                _ => None,
            })
            .unwrap();
        assert_eq!(change, (2, 1, 1));
    }

    #[test]
    fn test_api_response_strips_breakdown_unless_detailed() {
        let mut snap = snapshot(&[(1, dec!(50), 1)], 1);
        snap.standings[0]
            .breakdown
            .insert("mission".to_string(), dec!(50));

        let plain = ScoreboardApiResponse::from_snapshot(snap.clone(), false);
        assert!(plain.standings[0].breakdown.is_empty());

        let detailed = ScoreboardApiResponse::from_snapshot(snap, true);
        assert_eq!(detailed.standings[0].breakdown["mission"], dec!(50));
    }
}
