//! Data-driven scoring model.
//!
//! A session's scoring rules are configured per competition category, not
//! hardcoded: each category names its criteria and carries a multiplier
//! applied to the category subtotal (e.g. a "game challenge" category may
//! weigh x3 against unweighted categories).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};
use crate::types::ScoreSubmission;

/// One scoring category: a named group of criteria with a weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringCategory {
    pub name: String,
    /// Multiplier applied to the category subtotal. Default 1.
    #[serde(default = "default_multiplier")]
    pub multiplier: Decimal,
    /// Criterion names in presentation order.
    pub criteria: Vec<String>,
    /// Per-criterion maximum score, if the rules cap it.
    #[serde(default)]
    pub max_score: Option<Decimal>,
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

/// The weighting policy for one session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringModel {
    pub categories: Vec<ScoringCategory>,
}

impl ScoringModel {
    pub fn new(categories: Vec<ScoringCategory>) -> Self {
        Self { categories }
    }

    /// All criterion names across categories, in category order.
    pub fn criteria(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|c| c.criteria.iter().map(String::as_str))
    }

    /// Validate a submission against the model.
    ///
    /// Rejects missing criteria, unknown criteria, negative scores, and
    /// scores above the category cap. Must run before the standings engine
    /// sees the submission; the engine assumes validated input.
    pub fn validate(&self, submission: &ScoreSubmission) -> Result<()> {
        for category in &self.categories {
            for criterion in &category.criteria {
                let score = submission.scores.get(criterion).ok_or_else(|| {
                    ScoreError::InvalidScore(format!("missing criterion '{criterion}'"))
                })?;

                if score.is_sign_negative() {
                    return Err(ScoreError::InvalidScore(format!(
                        "negative score {score} for '{criterion}'"
                    )));
                }

                if let Some(max) = category.max_score {
                    if *score > max {
                        return Err(ScoreError::InvalidScore(format!(
                            "score {score} for '{criterion}' exceeds maximum {max}"
                        )));
                    }
                }
            }
        }

        for name in submission.scores.keys() {
            if !self.criteria().any(|c| c == name) {
                return Err(ScoreError::InvalidScore(format!(
                    "unknown criterion '{name}'"
                )));
            }
        }

        Ok(())
    }

    /// Weighted total for an aggregated per-criterion breakdown.
    ///
    /// Each category's criteria are summed first, the subtotal is scaled by
    /// the category multiplier, and the scaled subtotals are added.
    pub fn weighted_total(&self, breakdown: &BTreeMap<String, Decimal>) -> Decimal {
        self.categories
            .iter()
            .map(|category| {
                let subtotal: Decimal = category
                    .criteria
                    .iter()
                    .filter_map(|c| breakdown.get(c))
                    .copied()
                    .sum();
                subtotal * category.multiplier
            })
            .sum()
    }
}
