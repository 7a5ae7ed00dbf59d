//! Data providers behind a uniform fetch contract
//!
//! Three provider kinds feed an analysis:
//!
//! | Kind | Keyed by | Payload |
//! |------|----------|---------|
//! | [`SourceKind::Filings`] | listing code | latest filed statement at or before the as-of date |
//! | [`SourceKind::Market`] | listing code | daily closes up to the as-of date, with any stored fair-value series |
//! | [`SourceKind::Sector`] | sector code | PER of every company in the sector |
//!
//! Any implementation can back any kind: [`StaticSource`] for in-memory
//! data, [`FileSource`] for a local JSON data set and [`HttpSource`] for a
//! remote JSON service.

pub mod file;
pub mod http;
pub mod memory;

pub use file::FileSource;
pub use http::HttpSource;
pub use memory::StaticSource;

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::model::{CompanyIdentity, FundamentalSnapshot, PricePoint, StockCode};

/// Provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Filings,
    Market,
    Sector,
}

impl SourceKind {
    pub const ALL: [Self; 3] = [Self::Filings, Self::Market, Self::Sector];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filings => "filings",
            Self::Market => "market",
            Self::Sector => "sector",
        }
    }

    /// Path segment used by file and HTTP layouts
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Filings => "filings",
            Self::Market => "market",
            Self::Sector => "sectors",
        }
    }

    /// The identity field this kind is keyed by
    pub fn lookup_key(self, identity: &CompanyIdentity) -> &str {
        match self {
            Self::Filings | Self::Market => identity.code.as_str(),
            Self::Sector => &identity.sector_code,
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price history returned by a market provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub prices: Vec<PricePoint>,
}

/// One sector member's valuation multiple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMultiple {
    pub code: StockCode,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "PER")]
    pub per: Option<f64>,
}

/// Sector aggregate returned by a sector provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorData {
    #[serde(default)]
    pub sector_name: Option<String>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub peers: Vec<PeerMultiple>,
}

/// Partial data produced by one provider.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Filings(FundamentalSnapshot),
    Market(MarketData),
    Sector(SectorData),
}

impl SourcePayload {
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Filings(_) => SourceKind::Filings,
            Self::Market(_) => SourceKind::Market,
            Self::Sector(_) => SourceKind::Sector,
        }
    }

    /// The provider-native as-of date of this payload
    pub fn as_of(&self) -> Option<NaiveDate> {
        match self {
            Self::Filings(snapshot) => snapshot.as_of,
            Self::Market(data) => data.prices.iter().map(|p| p.date).max(),
            Self::Sector(data) => data.as_of,
        }
    }
}

/// Provider contract.
///
/// `fetch` returns whatever the provider knows about the identity as of the
/// given date, or a [`SourceError`] naming the provider. Implementations must
/// be `Send + Sync`; the engine shares them across concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which slot of the analysis this provider fills
    fn kind(&self) -> SourceKind;

    /// Fetch partial data for `identity` as of `as_of`
    async fn fetch(
        &self,
        identity: &CompanyIdentity,
        as_of: NaiveDate,
    ) -> Result<SourcePayload, SourceError>;
}

/// Decode a provider response body and cut it to `as_of`.
///
/// Filings bodies are a list of snapshots, market bodies a list of price
/// points, sector bodies a single [`SectorData`] object.
pub(crate) fn decode_payload(
    kind: SourceKind,
    body: &str,
    as_of: NaiveDate,
) -> Result<SourcePayload, SourceError> {
    let malformed = |e: serde_json::Error| SourceError::malformed(kind, e.to_string());

    match kind {
        SourceKind::Filings => {
            let filings: Vec<FundamentalSnapshot> = serde_json::from_str(body).map_err(malformed)?;
            select_filing(filings, as_of)
        }
        SourceKind::Market => {
            let prices: Vec<PricePoint> = serde_json::from_str(body).map_err(malformed)?;
            prices_until(prices, as_of)
        }
        SourceKind::Sector => {
            let data: SectorData = serde_json::from_str(body).map_err(malformed)?;
            sector_as_of(data, as_of)
        }
    }
}

/// Most recent filing dated at or before `as_of`.
pub(crate) fn select_filing(
    filings: Vec<FundamentalSnapshot>,
    as_of: NaiveDate,
) -> Result<SourcePayload, SourceError> {
    filings
        .into_iter()
        .filter(|filing| filing.as_of.is_some_and(|date| date <= as_of))
        .max_by_key(|filing| filing.as_of)
        .map(|filing| SourcePayload::Filings(filing.sanitized()))
        .ok_or_else(|| {
            SourceError::no_data(SourceKind::Filings, format!("no filing on or before {as_of}"))
        })
}

/// Price points dated at or before `as_of`.
pub(crate) fn prices_until(
    prices: Vec<PricePoint>,
    as_of: NaiveDate,
) -> Result<SourcePayload, SourceError> {
    let prices: Vec<PricePoint> = prices.into_iter().filter(|p| p.date <= as_of).collect();
    if prices.is_empty() {
        return Err(SourceError::no_data(
            SourceKind::Market,
            format!("no prices on or before {as_of}"),
        ));
    }
    Ok(SourcePayload::Market(MarketData { prices }))
}

/// Sector data usable as of `as_of`.
pub(crate) fn sector_as_of(
    data: SectorData,
    as_of: NaiveDate,
) -> Result<SourcePayload, SourceError> {
    match data.as_of {
        Some(date) if date > as_of => Err(SourceError::no_data(
            SourceKind::Sector,
            format!("sector data dated {date} is after {as_of}"),
        )),
        _ => Ok(SourcePayload::Sector(data)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_lookup_key() {
        let identity = CompanyIdentity {
            query: "삼성전자".to_string(),
            code: StockCode::parse("005930").expect("code"),
            name: "삼성전자".to_string(),
            sector_code: "013".to_string(),
            sector_name: "전기전자".to_string(),
        };

        assert_eq!(SourceKind::Filings.lookup_key(&identity), "005930");
        assert_eq!(SourceKind::Market.lookup_key(&identity), "005930");
        assert_eq!(SourceKind::Sector.lookup_key(&identity), "013");
    }

    #[test]
    fn test_select_latest_filing_before_as_of() {
        let body = r#"[
            {"as_of": "2023-03-15", "EPS": 8000},
            {"as_of": "2024-03-15", "EPS": 2100},
            {"as_of": "2024-05-15", "EPS": 1500}
        ]"#;

        let payload = decode_payload(SourceKind::Filings, body, date(2024, 3, 29)).expect("decode");
        let SourcePayload::Filings(snapshot) = payload else {
            panic!("expected filings payload");
        };
        assert_eq!(snapshot.as_of, Some(date(2024, 3, 15)));
        assert_eq!(snapshot.eps, Some(2100.0));
    }

    #[test]
    fn test_no_filing_before_as_of() {
        let body = r#"[{"as_of": "2024-05-15", "EPS": 1500}]"#;
        let err = decode_payload(SourceKind::Filings, body, date(2024, 3, 29)).expect_err("no data");
        assert_eq!(err.kind, SourceErrorKind::NoData);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_prices_cut_at_as_of() {
        let body = r#"[
            {"date": "2024-03-28", "price": 69000},
            {"date": "2024-03-29", "price": 70000, "fair_value_est": 71000},
            {"date": "2024-04-01", "price": 72000}
        ]"#;

        let payload = decode_payload(SourceKind::Market, body, date(2024, 3, 29)).expect("decode");
        assert_eq!(payload.as_of(), Some(date(2024, 3, 29)));
        let SourcePayload::Market(data) = payload else {
            panic!("expected market payload");
        };
        assert_eq!(data.prices.len(), 2);
        assert_eq!(data.prices[1].fair_value_est, Some(71000.0));
    }

    #[test]
    fn test_sector_from_the_future_is_rejected() {
        let body = r#"{"sector_name": "전기전자", "as_of": "2024-06-30", "peers": []}"#;
        let err = decode_payload(SourceKind::Sector, body, date(2024, 3, 29)).expect_err("future");
        assert_eq!(err.kind, SourceErrorKind::NoData);

        let body = r#"{"sector_name": "전기전자", "peers": [{"code": "000660", "PER": 15.2}]}"#;
        let payload = decode_payload(SourceKind::Sector, body, date(2024, 3, 29)).expect("decode");
        let SourcePayload::Sector(data) = payload else {
            panic!("expected sector payload");
        };
        assert_eq!(data.peers[0].per, Some(15.2));
    }

    #[test]
    fn test_malformed_body() {
        let err = decode_payload(SourceKind::Market, "{not json", date(2024, 3, 29))
            .expect_err("malformed");
        assert_eq!(err.kind, SourceErrorKind::Malformed);
        assert_eq!(err.provider, SourceKind::Market);
    }
}
