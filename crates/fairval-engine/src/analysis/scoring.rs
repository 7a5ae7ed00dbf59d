//! Composite fundamental score on a 0-100 scale
//!
//! | Factor | 0 at | 100 at |
//! |--------|------|--------|
//! | ROE (%) | 0 | 20 |
//! | Operating margin (%) | 0 | 20 |
//! | Debt ratio (%) | 200 | 0 |
//! | Sales growth (%) | -10 | 20 |
//!
//! Values outside a range clamp to its ends. Missing factors drop out and
//! their weight is spread proportionally over the factors that remain.

use serde::{Deserialize, Serialize};

use crate::config::ScoreWeights;
use crate::model::{FundamentalSnapshot, finite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Roe,
    OpMargin,
    DebtRatio,
    SalesGrowth,
}

impl Factor {
    pub const ALL: [Self; 4] = [Self::Roe, Self::OpMargin, Self::DebtRatio, Self::SalesGrowth];

    /// Input value at which the sub-score is 0 and 100 respectively
    const fn range(self) -> (f64, f64) {
        match self {
            Self::Roe => (0.0, 20.0),
            Self::OpMargin => (0.0, 20.0),
            Self::DebtRatio => (200.0, 0.0),
            Self::SalesGrowth => (-10.0, 20.0),
        }
    }

    fn input(self, fundamentals: &FundamentalSnapshot) -> Option<f64> {
        finite(match self {
            Self::Roe => fundamentals.roe,
            Self::OpMargin => fundamentals.op_margin,
            Self::DebtRatio => fundamentals.debt_ratio,
            Self::SalesGrowth => fundamentals.sales_growth,
        })
    }

    fn weight(self, weights: &ScoreWeights) -> f64 {
        match self {
            Self::Roe => weights.roe,
            Self::OpMargin => weights.op_margin,
            Self::DebtRatio => weights.debt_ratio,
            Self::SalesGrowth => weights.sales_growth,
        }
    }

    /// Map an input onto 0-100
    pub fn sub_score(self, value: f64) -> f64 {
        let (zero_at, full_at) = self.range();
        ((value - zero_at) / (full_at - zero_at) * 100.0).clamp(0.0, 100.0)
    }
}

/// One factor's contribution to the composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub score: f64,
    /// Weight after redistribution over available factors
    pub weight: f64,
}

/// Composite score and its breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalScore {
    pub total: f64,
    pub factors: Vec<FactorScore>,
}

/// Score the available fundamentals; `None` when no factor has an input.
pub fn score(fundamentals: &FundamentalSnapshot, weights: &ScoreWeights) -> Option<FundamentalScore> {
    let available: Vec<(Factor, f64, f64)> = Factor::ALL
        .into_iter()
        .filter_map(|factor| {
            factor
                .input(fundamentals)
                .map(|value| (factor, factor.sub_score(value), factor.weight(weights)))
        })
        .filter(|(_, _, weight)| *weight > 0.0)
        .collect();

    let weight_sum: f64 = available.iter().map(|(_, _, weight)| weight).sum();
    if available.is_empty() || weight_sum <= 0.0 {
        return None;
    }

    let factors: Vec<FactorScore> = available
        .into_iter()
        .map(|(factor, score, weight)| FactorScore {
            factor,
            score,
            weight: weight / weight_sum,
        })
        .collect();
    let total = factors.iter().map(|f| f.score * f.weight).sum();

    Some(FundamentalScore { total, factors })
}
