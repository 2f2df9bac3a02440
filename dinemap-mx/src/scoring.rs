//! Market potential scoring
//!
//! Turns per-category research sub-scores (0-100 each) into a single
//! weighted market potential score. Category weights are integer
//! percentages loaded from the settings table so product can retune the
//! mix without a deploy; the only hard rule is that they sum to 100.

use dinemap_common::{Error, Result};
use std::collections::BTreeMap;

/// Default category weights, used when the settings table has none
pub const DEFAULT_WEIGHTS: [(&str, i64); 6] = [
    ("dining_scene", 25),
    ("population", 20),
    ("competition", 15),
    ("college_presence", 15),
    ("income_level", 15),
    ("tourism", 10),
];

/// Validated category weight set summing to exactly 100
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    weights: BTreeMap<String, i64>,
}

impl ScoringWeights {
    /// Build from a raw weight map, rejecting sets that do not sum to 100
    /// or contain negative weights
    pub fn from_map(weights: BTreeMap<String, i64>) -> Result<Self> {
        if let Some((category, weight)) = weights.iter().find(|(_, w)| **w < 0) {
            return Err(Error::Config(format!(
                "Scoring weight '{}' is negative: {}",
                category, weight
            )));
        }

        let total: i64 = weights.values().sum();
        if total != 100 {
            return Err(Error::Config(format!(
                "Scoring weights must sum to 100, got {}",
                total
            )));
        }

        Ok(Self { weights })
    }

    pub fn default_set() -> Self {
        let weights = DEFAULT_WEIGHTS
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        Self { weights }
    }

    /// Categories in this weight set, in stable order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(|k| k.as_str())
    }

    /// Weighted market potential score in 0..=100
    ///
    /// Per category: sub-score times weight, summed, divided by 100 with
    /// round-to-nearest. A category missing from `sub_scores` counts as 0
    /// (incomplete research drags the score down, there is no
    /// renormalization). Out-of-range sub-scores are clamped so the
    /// output bound holds even against bad stored data.
    pub fn weighted_score(&self, sub_scores: &BTreeMap<String, i64>) -> i64 {
        let total: i64 = self
            .weights
            .iter()
            .map(|(category, weight)| {
                let score = sub_scores.get(category).copied().unwrap_or(0).clamp(0, 100);
                weight * score
            })
            .sum();

        (total + 50) / 100
    }
}

/// Outcome of one place-count validation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedCount {
    pub success: bool,
    pub count: i64,
}

impl ValidatedCount {
    pub fn failed() -> Self {
        Self {
            success: false,
            count: 0,
        }
    }

    /// Rehydrate from a nullable database column (NULL = never validated)
    pub fn from_column(column: Option<i64>) -> Self {
        match column {
            Some(count) => Self {
                success: true,
                count,
            },
            None => Self::failed(),
        }
    }
}

/// Pick between an AI-estimated count and a validator result
///
/// The validated count wins only when the validation call succeeded AND
/// found at least one place; a successful lookup returning zero usually
/// means the place index has no coverage there, not that the town has no
/// restaurants. Applied independently per metric.
pub fn reconcile_count(ai_estimate: i64, validated: &ValidatedCount) -> i64 {
    if validated.success && validated.count > 0 {
        validated.count
    } else {
        ai_estimate
    }
}

// ============================================================================
// Tests
// ============================================================================
