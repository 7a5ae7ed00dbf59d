//! Fair-value estimation
//!
//! Blends an earnings-based estimate (EPS × target PER) with a book-based
//! estimate (BPS × target PBR). The target PER is the sector average when a
//! peer comparison exists and the configured default otherwise.

use serde::{Deserialize, Serialize};

use crate::config::ValuationConfig;
use crate::model::{FundamentalSnapshot, finite};

/// A fair-value estimate and the parts it was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairValue {
    pub value: f64,
    pub earnings_based: Option<f64>,
    pub book_based: Option<f64>,
    pub target_per: f64,
    pub target_pbr: f64,
}

/// Estimate fair value per share.
///
/// Returns `None` when neither EPS nor BPS yields a positive estimate.
pub fn estimate(
    fundamentals: &FundamentalSnapshot,
    sector_avg_per: Option<f64>,
    config: &ValuationConfig,
) -> Option<FairValue> {
    let target_per = finite(sector_avg_per)
        .filter(|per| *per > 0.0)
        .unwrap_or(config.default_target_per);
    let target_pbr = config.target_pbr;

    let earnings_based = positive(fundamentals.eps.map(|eps| eps * target_per));
    let book_based = positive(fundamentals.bps.map(|bps| bps * target_pbr));

    let value = match (earnings_based, book_based) {
        (Some(earnings), Some(book)) => {
            config.earnings_weight * earnings + (1.0 - config.earnings_weight) * book
        }
        (Some(earnings), None) => earnings,
        (None, Some(book)) => book,
        (None, None) => return None,
    };

    Some(FairValue {
        value,
        earnings_based,
        book_based,
        target_per,
        target_pbr,
    })
}

/// Signed `(fair_value - price) / price * 100`.
///
/// `None` when either side is missing or the price is zero.
pub fn undervaluation_pct(fair_value: Option<f64>, price: Option<f64>) -> Option<f64> {
    let fair_value = finite(fair_value)?;
    let price = finite(price)?;
    if price == 0.0 {
        return None;
    }
    Some((fair_value - price) / price * 100.0)
}

fn positive(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v > 0.0)
}
