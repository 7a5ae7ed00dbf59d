//! Analysis result types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::scoring::{self, FundamentalScore};
use crate::analysis::valuation::{self, FairValue};
use crate::analysis::{Snapshot, SourceStatus, peers};
use crate::config::EngineConfig;
use crate::model::{CompanyIdentity, FundamentalSnapshot, PeerSummary, PricePoint};
use crate::sources::SourceKind;

/// Outcome of one analysis request.
///
/// Every value field is independently optional; `None` means the value
/// could not be derived from the data available on the basis date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub identity: CompanyIdentity,
    pub price: Option<f64>,
    pub fair_value: Option<f64>,
    pub undervaluation_pct: Option<f64>,
    pub score_total: Option<f64>,
    pub basis_date: Option<NaiveDate>,
    pub history: Vec<PricePoint>,
    pub fundamentals: FundamentalSnapshot,
    pub peer_summary: PeerSummary,
    /// How the fair value was built
    pub valuation: Option<FairValue>,
    /// Per-factor breakdown of `score_total`
    pub score: Option<FundamentalScore>,
    pub sources: Vec<SourceStatus>,
    pub warnings: Vec<String>,
}

impl AnalysisResult {
    /// Status of one provider
    pub fn source(&self, kind: SourceKind) -> Option<&SourceStatus> {
        self.sources.iter().find(|status| status.source == kind)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the analysis stages over a snapshot and shape the result.
pub fn assemble(identity: CompanyIdentity, snapshot: Snapshot, config: &EngineConfig) -> AnalysisResult {
    let Snapshot {
        basis_date,
        price,
        history,
        mut fundamentals,
        sector,
        sources,
        mut warnings,
    } = snapshot;

    let peer_summary = peers::compare(&identity.code, fundamentals.per, sector.as_ref());
    if !peer_summary.has_comparison() {
        skipped(&mut warnings, "peer comparison", "no sector peer with a valid PER");
    } else if peer_summary.target_value.is_none() {
        skipped(&mut warnings, "relative PER", "target PER unavailable");
    }

    let fair = valuation::estimate(&fundamentals, peer_summary.sector_avg, &config.valuation);
    if fair.is_none() {
        skipped(&mut warnings, "fair value", "no positive EPS or BPS");
    }

    let fair_value = fair.map(|fair| fair.value);
    let undervaluation_pct = valuation::undervaluation_pct(fair_value, price);
    if fair_value.is_some() && undervaluation_pct.is_none() {
        skipped(&mut warnings, "undervaluation", "current price unavailable");
    }

    let score = scoring::score(&fundamentals, &config.scoring);
    if score.is_none() {
        skipped(&mut warnings, "fundamental score", "no scoring inputs");
    }

    fundamentals.as_of = basis_date;

    AnalysisResult {
        identity,
        price,
        fair_value,
        undervaluation_pct,
        score_total: score.as_ref().map(|score| score.total),
        basis_date,
        history,
        fundamentals,
        peer_summary,
        valuation: fair,
        score,
        sources,
        warnings,
    }
}

fn skipped(warnings: &mut Vec<String>, what: &str, reason: &str) {
    debug!("Skipping {}: {}", what, reason);
    warnings.push(format!("{what} unavailable: {reason}"));
}
