//! Per-judge score ledger.
//!
//! The ledger keeps the last accepted submission per (team, judge). It is
//! the source of truth for aggregation: a judge resubmitting overwrites
//! their earlier entry instead of double-counting.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use scorefeed_core::{JudgeId, ScoreSubmission, TeamId};

/// Last-write-wins submission ledger for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreLedger {
    entries: BTreeMap<TeamId, BTreeMap<JudgeId, ScoreSubmission>>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submission, superseding any earlier one from the same judge.
    pub fn record(&mut self, submission: ScoreSubmission) {
        self.entries
            .entry(submission.team)
            .or_default()
            .insert(submission.judge.clone(), submission);
    }

    /// Number of distinct judges that have submitted for a team.
    pub fn judges_completed(&self, team: TeamId) -> u32 {
        self.entries.get(&team).map_or(0, |m| m.len() as u32)
    }

    /// Number of distinct judges that have submitted anywhere in the session.
    pub fn judges_active(&self) -> u32 {
        let mut judges: Vec<&JudgeId> = self
            .entries
            .values()
            .flat_map(|m| m.keys())
            .collect();
        judges.sort();
        judges.dedup();
        judges.len() as u32
    }

    /// Aggregate a team's per-criterion breakdown across judges.
    ///
    /// Each criterion's score is the mean of the values submitted by the
    /// judges that scored it, rounded to two decimal places.
    pub fn aggregate(&self, team: TeamId) -> BTreeMap<String, Decimal> {
        let Some(submissions) = self.entries.get(&team) else {
            return BTreeMap::new();
        };

        let mut sums: BTreeMap<String, (Decimal, u32)> = BTreeMap::new();
        for submission in submissions.values() {
            for (criterion, score) in &submission.scores {
                let entry = sums.entry(criterion.clone()).or_insert((Decimal::ZERO, 0));
                entry.0 += *score;
                entry.1 += 1;
            }
        }

        sums.into_iter()
            .map(|(criterion, (sum, count))| {
                (criterion, (sum / Decimal::from(count)).round_dp(2))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use scorefeed_core::SessionId;

    fn submission(judge: &str, scores: &[(&str, Decimal)]) -> ScoreSubmission {
        ScoreSubmission::new(
            SessionId::from("s1"),
            TeamId::new(1),
            JudgeId::new(judge),
            scores
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        )
    }

    #[test]
    fn test_record_counts_distinct_judges() {
        let mut ledger = ScoreLedger::new();
        ledger.record(submission("a", &[("mission", dec!(50))]));
        ledger.record(submission("b", &[("mission", dec!(60))]));

        assert_eq!(ledger.judges_completed(TeamId::new(1)), 2);
        assert_eq!(ledger.judges_active(), 2);
    }

    #[test]
    fn test_resubmission_overwrites() {
        let mut ledger = ScoreLedger::new();
        ledger.record(submission("a", &[("mission", dec!(50))]));
        ledger.record(submission("a", &[("mission", dec!(60))]));

        assert_eq!(ledger.judges_completed(TeamId::new(1)), 1);
        let breakdown = ledger.aggregate(TeamId::new(1));
        assert_eq!(breakdown["mission"], dec!(60));
    }

    #[test]
    fn test_aggregate_means_across_judges() {
        let mut ledger = ScoreLedger::new();
        ledger.record(submission("a", &[("mission", dec!(50))]));
        ledger.record(submission("b", &[("mission", dec!(61))]));

        let breakdown = ledger.aggregate(TeamId::new(1));
        assert_eq!(breakdown["mission"], dec!(55.50));
    }

    #[test]
    fn test_aggregate_unknown_team_is_empty() {
        let ledger = ScoreLedger::new();
        assert!(ledger.aggregate(TeamId::new(9)).is_empty());
    }
}
