//! Standings recomputation.

use chrono::Utc;
use scorefeed_core::{
    Result, ScoreError, ScoreSubmission, ScoringModel, SessionSnapshot, Trend,
};
use tracing::debug;

use crate::ledger::ScoreLedger;

/// Recomputes standings snapshots from incoming submissions.
///
/// The engine is category-agnostic: the weighting policy lives entirely in
/// the injected [`ScoringModel`]. It assumes submissions were validated
/// upstream and only guards the roster-membership invariant itself.
#[derive(Debug, Clone)]
pub struct StandingsEngine {
    model: ScoringModel,
}

impl StandingsEngine {
    pub fn new(model: ScoringModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    /// Apply one submission, producing the next snapshot and ledger.
    ///
    /// Inputs are never mutated; callers diff the returned snapshot against
    /// the previous one for partial broadcasts. Ranks in the output are a
    /// dense permutation of 1..N, ties broken by earlier last-updated
    /// timestamp, then team id.
    pub fn recompute(
        &self,
        snapshot: &SessionSnapshot,
        ledger: &ScoreLedger,
        submission: ScoreSubmission,
    ) -> Result<(SessionSnapshot, ScoreLedger)> {
        if snapshot.standing(submission.team).is_none() {
            return Err(ScoreError::UnknownTeam {
                session: snapshot.meta.id.clone(),
                team: submission.team,
            });
        }

        let team = submission.team;
        let submitted_at = submission.submitted_at;

        let mut next_ledger = ledger.clone();
        next_ledger.record(submission);

        let mut next = snapshot.clone();
        {
            // Roster membership was checked above.
            let standing = next
                .standings
                .iter_mut()
                .find(|s| s.team == team)
                .ok_or_else(|| ScoreError::UnknownTeam {
                    session: snapshot.meta.id.clone(),
                    team,
                })?;

            standing.breakdown = next_ledger.aggregate(team);
            standing.total = self.model.weighted_total(&standing.breakdown);
            standing.judges_completed = next_ledger.judges_completed(team);
            standing.last_updated = submitted_at;
        }

        rerank(&mut next, snapshot);

        next.meta.judges_active = next_ledger.judges_active();
        next.revision = snapshot.revision + 1;
        next.taken_at = Utc::now();

        debug!(
            session = %next.meta.id,
            team = %team,
            revision = next.revision,
            "Standings recomputed"
        );

        Ok((next, next_ledger))
    }
}

/// Re-sort the roster and recompute ranks, deltas and trends against the
/// ranks held in `previous`.
fn rerank(next: &mut SessionSnapshot, previous: &SessionSnapshot) {
    next.standings.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then(a.last_updated.cmp(&b.last_updated))
            .then(a.team.cmp(&b.team))
    });

    for (idx, standing) in next.standings.iter_mut().enumerate() {
        let rank = idx as u32 + 1;
        let previous_rank = previous
            .standing(standing.team)
            .map(|s| s.rank)
            .unwrap_or(rank);

        standing.previous_rank = previous_rank;
        standing.rank = rank;
        standing.rank_delta = previous_rank as i32 - rank as i32;
        standing.trend = Trend::from_delta(standing.rank_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use scorefeed_core::{
        JudgeId, ScoringCategory, SessionId, SessionMeta, SessionStatus, TeamId, TeamStanding,
    };
    use std::collections::BTreeMap;

    fn model() -> ScoringModel {
        ScoringModel::new(vec![ScoringCategory {
            name: "mission".to_string(),
            multiplier: Decimal::ONE,
            criteria: vec!["mission".to_string()],
            max_score: None,
        }])
    }

    /// Three-team session, nobody has scored yet. Ranks seeded 1..3 in
    /// roster order the way the store does at session creation.
    fn initial_snapshot() -> SessionSnapshot {
        let base = Utc::now();
        let standings = (1..=3)
            .map(|i| {
                let mut s = TeamStanding::for_roster_entry(
                    TeamId::new(i),
                    format!("Team {i}"),
                    "School",
                    base + chrono::Duration::milliseconds(i as i64),
                );
                s.rank = i;
                s.previous_rank = i;
                s
            })
            .collect();

        SessionSnapshot {
            meta: SessionMeta {
                id: SessionId::from("s1"),
                name: "Finals".to_string(),
                competition: "Regional".to_string(),
                category: "spike".to_string(),
                status: SessionStatus::Active,
                viewer_count: 0,
                judges_active: 0,
            },
            standings,
            revision: 0,
            taken_at: base,
        }
    }

    fn submission(team: u32, judge: &str, score: Decimal) -> ScoreSubmission {
        ScoreSubmission::new(
            SessionId::from("s1"),
            TeamId::new(team),
            JudgeId::new(judge),
            [("mission".to_string(), score)].into_iter().collect(),
        )
    }

    fn ranks(snapshot: &SessionSnapshot) -> Vec<(u32, u32)> {
        snapshot
            .standings
            .iter()
            .map(|s| (s.team.inner(), s.rank))
            .collect()
    }

    #[test]
    fn test_unknown_team_rejected_without_mutation() {
        let engine = StandingsEngine::new(model());
        let snapshot = initial_snapshot();
        let ledger = ScoreLedger::new();

        let err = engine
            .recompute(&snapshot, &ledger, submission(99, "a", dec!(10)))
            .unwrap_err();

        assert!(matches!(err, ScoreError::UnknownTeam { .. }));
        assert_eq!(snapshot.revision, 0);
        assert_eq!(ledger, ScoreLedger::new());
    }

    #[test]
    fn test_scenario_first_scores() {
        let engine = StandingsEngine::new(model());
        let snapshot = initial_snapshot();
        let ledger = ScoreLedger::new();

        // Team 1 scores 50: rank 1; teams 2 and 3 tie at 0 in roster order.
        let (snap, ledger) = engine
            .recompute(&snapshot, &ledger, submission(1, "a", dec!(50)))
            .unwrap();
        assert_eq!(ranks(&snap), vec![(1, 1), (2, 2), (3, 3)]);
        assert_eq!(snap.revision, 1);

        // Team 2 scores 75 and takes the lead; team 1's delta is -1.
        let (snap, _) = engine
            .recompute(&snap, &ledger, submission(2, "a", dec!(75)))
            .unwrap();
        assert_eq!(ranks(&snap), vec![(2, 1), (1, 2), (3, 3)]);

        let team1 = snap.standing(TeamId::new(1)).unwrap();
        assert_eq!(team1.rank_delta, -1);
        assert_eq!(team1.trend, Trend::Down);

        let team2 = snap.standing(TeamId::new(2)).unwrap();
        assert_eq!(team2.rank_delta, 1);
        assert_eq!(team2.trend, Trend::Up);
    }

    #[test]
    fn test_resubmission_is_idempotent_for_judge_count() {
        let engine = StandingsEngine::new(model());
        let snapshot = initial_snapshot();
        let ledger = ScoreLedger::new();

        let (snap, ledger) = engine
            .recompute(&snapshot, &ledger, submission(1, "a", dec!(50)))
            .unwrap();
        let (snap, _) = engine
            .recompute(&snap, &ledger, submission(1, "a", dec!(60)))
            .unwrap();

        let team1 = snap.standing(TeamId::new(1)).unwrap();
        assert_eq!(team1.total, dec!(60));
        assert_eq!(team1.judges_completed, 1);
        assert_eq!(snap.meta.judges_active, 1);
    }

    #[test]
    fn test_ranks_are_dense_permutation() {
        let engine = StandingsEngine::new(model());
        let mut snap = initial_snapshot();
        let mut ledger = ScoreLedger::new();

        for (team, judge, score) in [
            (1, "a", dec!(50)),
            (2, "a", dec!(75)),
            (3, "b", dec!(75)),
            (1, "b", dec!(90)),
            (2, "b", dec!(10)),
        ] {
            let (s, l) = engine
                .recompute(&snap, &ledger, submission(team, judge, score))
                .unwrap();
            snap = s;
            ledger = l;

            let mut seen: Vec<u32> = snap.standings.iter().map(|s| s.rank).collect();
            seen.sort_unstable();
            assert_eq!(seen, vec![1, 2, 3], "ranks must be dense 1..N");
        }
    }

    #[test]
    fn test_tie_break_by_earlier_update() {
        let engine = StandingsEngine::new(model());
        let snapshot = initial_snapshot();
        let ledger = ScoreLedger::new();

        // Team 2 reaches 75 first, then team 1 ties it. Team 2 keeps the
        // higher rank because its last update is older.
        let mut first = submission(2, "a", dec!(75));
        first.submitted_at = Utc::now();
        let mut second = submission(1, "a", dec!(75));
        second.submitted_at = first.submitted_at + chrono::Duration::milliseconds(500);

        let (snap, ledger) = engine.recompute(&snapshot, &ledger, first).unwrap();
        let (snap, _) = engine.recompute(&snap, &ledger, second).unwrap();

        assert_eq!(ranks(&snap), vec![(2, 1), (1, 2), (3, 3)]);
    }

    #[test]
    fn test_delta_invariant_holds_for_all_teams() {
        let engine = StandingsEngine::new(model());
        let mut snap = initial_snapshot();
        let mut ledger = ScoreLedger::new();

        for (team, score) in [(3, dec!(40)), (1, dec!(20)), (2, dec!(60))] {
            let previous = snap.clone();
            let (s, l) = engine
                .recompute(&snap, &ledger, submission(team, "a", score))
                .unwrap();
            snap = s;
            ledger = l;

            for standing in &snap.standings {
                let prev_rank = previous.standing(standing.team).unwrap().rank;
                assert_eq!(standing.previous_rank, prev_rank);
                assert_eq!(
                    standing.rank_delta,
                    prev_rank as i32 - standing.rank as i32
                );
            }
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let engine = StandingsEngine::new(model());

        let run = |seq: &[(u32, &str, Decimal)]| {
            let mut snap = initial_snapshot();
            // Pin roster timestamps so both runs start identical.
            for (i, s) in snap.standings.iter_mut().enumerate() {
                s.last_updated = chrono::DateTime::from_timestamp(1_700_000_000 + i as i64, 0)
                    .unwrap();
            }
            let mut ledger = ScoreLedger::new();
            for (team, judge, score) in seq {
                let mut sub = submission(*team, judge, *score);
                sub.submitted_at =
                    chrono::DateTime::from_timestamp(1_700_000_100 + *team as i64, 0).unwrap();
                let (s, l) = engine.recompute(&snap, &ledger, sub).unwrap();
                snap = s;
                ledger = l;
            }
            ranks(&snap)
        };

        let seq = [(1, "a", dec!(50)), (2, "a", dec!(50)), (3, "a", dec!(50))];
        assert_eq!(run(&seq), run(&seq));
    }
}
