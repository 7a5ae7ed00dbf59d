//! Merges provider outcomes into one snapshot aligned to a single basis date

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SourceError;
use crate::model::{FundamentalSnapshot, PricePoint, finite};
use crate::sources::{SectorData, SourceKind, SourcePayload};

/// How current a provider's data is relative to the request date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFreshness {
    Current,
    Stale,
    Unavailable,
}

/// Per-provider outcome recorded on the result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source: SourceKind,
    pub freshness: DataFreshness,
    /// Provider-native as-of date of the data used
    pub as_of: Option<NaiveDate>,
    pub error: Option<String>,
}

impl SourceStatus {
    pub fn is_available(&self) -> bool {
        self.freshness != DataFreshness::Unavailable
    }
}

/// Merged view of all provider data for one request
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub basis_date: Option<NaiveDate>,
    /// Close on the basis date
    pub price: Option<f64>,
    pub history: Vec<PricePoint>,
    pub fundamentals: FundamentalSnapshot,
    pub sector: Option<SectorData>,
    pub sources: Vec<SourceStatus>,
    pub warnings: Vec<String>,
}

/// Provider outcomes after retries, one per kind
#[derive(Debug, Clone)]
pub struct SourceOutcomes {
    pub filings: Result<SourcePayload, SourceError>,
    pub market: Result<SourcePayload, SourceError>,
    pub sector: Result<SourcePayload, SourceError>,
}

pub struct Aggregator {
    as_of: NaiveDate,
    staleness_tolerance_days: i64,
}

impl Aggregator {
    pub fn new(as_of: NaiveDate, staleness_tolerance_days: i64) -> Self {
        Self {
            as_of,
            staleness_tolerance_days,
        }
    }

    /// Merge the outcomes. Never fails: a failed provider leaves its part
    /// of the snapshot empty and is recorded in `sources`.
    pub fn aggregate(&self, outcomes: SourceOutcomes) -> Snapshot {
        let mut sources = Vec::with_capacity(SourceKind::ALL.len());
        let mut warnings = Vec::new();

        let mut fundamentals = FundamentalSnapshot::default();
        let mut history = Vec::new();
        let mut sector = None;

        for (kind, outcome) in [
            (SourceKind::Filings, outcomes.filings),
            (SourceKind::Market, outcomes.market),
            (SourceKind::Sector, outcomes.sector),
        ] {
            let payload = outcome.and_then(|payload| {
                if payload.kind() == kind {
                    Ok(payload)
                } else {
                    Err(SourceError::malformed(
                        kind,
                        format!("provider returned {} data", payload.kind()),
                    ))
                }
            });

            match payload {
                Ok(payload) => {
                    let native_as_of = payload.as_of();
                    let freshness = self.freshness(kind, native_as_of, &mut warnings);
                    sources.push(SourceStatus {
                        source: kind,
                        freshness,
                        as_of: native_as_of,
                        error: None,
                    });

                    match payload {
                        SourcePayload::Filings(snapshot) => fundamentals = snapshot.sanitized(),
                        SourcePayload::Market(data) => history = data.prices,
                        SourcePayload::Sector(data) => sector = Some(data),
                    }
                }
                Err(err) => {
                    warn!("{}", err);
                    warnings.push(format!("{kind} data unavailable: {}", err.message));
                    sources.push(SourceStatus {
                        source: kind,
                        freshness: DataFreshness::Unavailable,
                        as_of: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let history = self.clean_history(history);
        let latest_close = history.last().map(|point| (point.date, point.price));

        let basis_date = latest_close
            .map(|(date, _)| date)
            .or(fundamentals.as_of.filter(|date| *date <= self.as_of));
        let price = latest_close.map(|(_, price)| price);

        derive_multiples(&mut fundamentals, price);

        match basis_date {
            Some(date) => info!("Basis date {}", date),
            None => warnings.push("basis date unknown: no prices and no dated filing".to_string()),
        }

        Snapshot {
            basis_date,
            price,
            history,
            fundamentals,
            sector,
            sources,
            warnings,
        }
    }

    fn freshness(
        &self,
        kind: SourceKind,
        native_as_of: Option<NaiveDate>,
        warnings: &mut Vec<String>,
    ) -> DataFreshness {
        let Some(date) = native_as_of else {
            return DataFreshness::Current;
        };

        let age = (self.as_of - date).num_days();
        if age > self.staleness_tolerance_days {
            warn!("{} data from {} is {} days old", kind, date, age);
            warnings.push(format!("{kind} data is stale: dated {date}, {age} days before {}", self.as_of));
            DataFreshness::Stale
        } else {
            DataFreshness::Current
        }
    }

    /// Sorted, one point per date (last wins), cut at `as_of`, positive
    /// finite closes only.
    fn clean_history(&self, prices: Vec<PricePoint>) -> Vec<PricePoint> {
        let mut by_date: BTreeMap<NaiveDate, PricePoint> = BTreeMap::new();
        for mut point in prices {
            if point.date > self.as_of || !(point.price.is_finite() && point.price > 0.0) {
                continue;
            }
            point.fair_value_est = finite(point.fair_value_est);
            by_date.insert(point.date, point);
        }
        by_date.into_values().collect()
    }
}

/// Fill PER and PBR from price and per-share figures when the filing lacks them.
fn derive_multiples(fundamentals: &mut FundamentalSnapshot, price: Option<f64>) {
    let Some(price) = price else {
        return;
    };
    let positive = |value: Option<f64>| value.filter(|v| *v > 0.0);

    if fundamentals.per.is_none() {
        fundamentals.per = positive(fundamentals.eps).map(|eps| price / eps);
    }
    if fundamentals.pbr.is_none() {
        fundamentals.pbr = positive(fundamentals.bps).map(|bps| price / bps);
    }
}
