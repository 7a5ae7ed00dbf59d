//! Domain types shared by the resolver, sources and analysis stages.
//!
//! Every value a provider may omit is an `Option`. `None` always means
//! "unavailable" and is never folded into zero.

use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const CODE_LEN: usize = 6;

/// Canonical six-digit listing code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockCode(String);

/// Rejected code input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("code must not be empty")]
    Empty,
    #[error("code '{0}' must contain only digits")]
    NotNumeric(String),
    #[error("code '{0}' is longer than {max} digits", max = CODE_LEN)]
    TooLong(String),
}

impl StockCode {
    /// Parse and normalize a listing code.
    ///
    /// Accepts an optional `A` prefix and left-pads short numeric input,
    /// so `"5930"`, `"A005930"` and `" 005930 "` all become `"005930"`.
    pub fn parse(input: &str) -> Result<Self, CodeError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix('A')
            .or_else(|| trimmed.strip_prefix('a'))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(CodeError::Empty);
        }
        if !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(CodeError::NotNumeric(trimmed.to_string()));
        }
        if digits.len() > CODE_LEN {
            return Err(CodeError::TooLong(trimmed.to_string()));
        }

        Ok(Self(format!("{digits:0>width$}", width = CODE_LEN)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StockCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for StockCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StockCode> for String {
    fn from(value: StockCode) -> Self {
        value.0
    }
}

/// A resolved security. Immutable once produced by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    /// The trimmed query that resolved to this security
    pub query: String,
    pub code: StockCode,
    pub name: String,
    pub sector_code: String,
    pub sector_name: String,
}

/// One trading day of price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
    /// Fair-value estimate known on that day, if the provider kept one
    #[serde(default)]
    pub fair_value_est: Option<f64>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            price,
            fair_value_est: None,
        }
    }

    pub fn with_fair_value(mut self, fair_value: f64) -> Self {
        self.fair_value_est = Some(fair_value);
        self
    }
}

/// Statement-derived ratios and per-share figures.
///
/// Percentages (`roe`, `op_margin`, `debt_ratio`, `sales_growth`) are in
/// percent units, e.g. `12.0` for 12%.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub roe: Option<f64>,
    #[serde(default)]
    pub op_margin: Option<f64>,
    #[serde(default)]
    pub debt_ratio: Option<f64>,
    #[serde(default)]
    pub sales_growth: Option<f64>,
    #[serde(default, alias = "PER")]
    pub per: Option<f64>,
    #[serde(default, alias = "PBR")]
    pub pbr: Option<f64>,
    #[serde(default, alias = "EPS")]
    pub eps: Option<f64>,
    #[serde(default, alias = "BPS")]
    pub bps: Option<f64>,
}

impl FundamentalSnapshot {
    /// Drop non-finite values so they read as unavailable.
    pub fn sanitized(self) -> Self {
        Self {
            as_of: self.as_of,
            roe: finite(self.roe),
            op_margin: finite(self.op_margin),
            debt_ratio: finite(self.debt_ratio),
            sales_growth: finite(self.sales_growth),
            per: finite(self.per),
            pbr: finite(self.pbr),
            eps: finite(self.eps),
            bps: finite(self.bps),
        }
    }

    /// True when no ratio or per-share value is present.
    pub fn is_empty(&self) -> bool {
        [
            self.roe,
            self.op_margin,
            self.debt_ratio,
            self.sales_growth,
            self.per,
            self.pbr,
            self.eps,
            self.bps,
        ]
        .iter()
        .all(Option::is_none)
    }
}

pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Outcome of benchmarking the target's PER against its sector.
///
/// When `peer_count_used` is zero no other field is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub sector_name: Option<String>,
    pub sector_avg: Option<f64>,
    pub target_value: Option<f64>,
    /// Target PER divided by the sector average
    pub relative: Option<f64>,
    /// Positive when the target trades below the sector average
    pub discount_pct: Option<f64>,
    pub peer_count_used: usize,
}

impl PeerSummary {
    /// The "no comparison possible" state.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn has_comparison(&self) -> bool {
        self.peer_count_used > 0
    }
}
