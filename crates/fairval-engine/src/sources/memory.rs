//! In-memory provider

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{SectorData, SourceAdapter, SourceKind, SourcePayload};
use super::{prices_until, sector_as_of, select_filing};
use crate::error::{SourceError, SourceErrorKind};
use crate::model::{CompanyIdentity, FundamentalSnapshot, PricePoint};

/// Provider serving data held in memory.
///
/// Applies the same as-of rules as the file and HTTP providers. Useful for
/// embedding a fixed data set and as a stand-in provider in tests.
#[derive(Debug)]
pub struct StaticSource {
    kind: SourceKind,
    filings: HashMap<String, Vec<FundamentalSnapshot>>,
    prices: HashMap<String, Vec<PricePoint>>,
    sectors: HashMap<String, SectorData>,
    failure: Option<SourceErrorKind>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticSource {
    fn empty(kind: SourceKind) -> Self {
        Self {
            kind,
            filings: HashMap::new(),
            prices: HashMap::new(),
            sectors: HashMap::new(),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// An empty filings provider
    pub fn filings() -> Self {
        Self::empty(SourceKind::Filings)
    }

    /// An empty market provider
    pub fn market() -> Self {
        Self::empty(SourceKind::Market)
    }

    /// An empty sector provider
    pub fn sector() -> Self {
        Self::empty(SourceKind::Sector)
    }

    /// Add a filed statement for a listing code
    pub fn with_filing(mut self, code: &str, filing: FundamentalSnapshot) -> Self {
        self.filings.entry(code.to_string()).or_default().push(filing);
        self
    }

    /// Set the price history of a listing code
    pub fn with_prices(mut self, code: &str, prices: Vec<PricePoint>) -> Self {
        self.prices.insert(code.to_string(), prices);
        self
    }

    /// Set the peer data of a sector code
    pub fn with_sector(mut self, sector_code: &str, data: SectorData) -> Self {
        self.sectors.insert(sector_code.to_string(), data);
        self
    }

    /// Fail every call with the given error kind
    pub fn failing(mut self, kind: SourceErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Wait before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `fetch` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(
        &self,
        identity: &CompanyIdentity,
        as_of: NaiveDate,
    ) -> Result<SourcePayload, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(kind) = self.failure {
            return Err(SourceError::new(self.kind, kind, "configured failure"));
        }

        let key = self.kind.lookup_key(identity);
        match self.kind {
            SourceKind::Filings => {
                let filings = self
                    .filings
                    .get(key)
                    .ok_or_else(|| SourceError::unknown_code(self.kind, key))?;
                select_filing(filings.clone(), as_of)
            }
            SourceKind::Market => {
                let prices = self
                    .prices
                    .get(key)
                    .ok_or_else(|| SourceError::unknown_code(self.kind, key))?;
                prices_until(prices.clone(), as_of)
            }
            SourceKind::Sector => {
                let data = self.sectors.get(key).ok_or_else(|| {
                    SourceError::no_data(self.kind, format!("no peer data for sector '{key}'"))
                })?;
                sector_as_of(data.clone(), as_of)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StockCode;

    fn identity() -> CompanyIdentity {
        CompanyIdentity {
            query: "005930".to_string(),
            code: StockCode::parse("005930").expect("code"),
            name: "삼성전자".to_string(),
            sector_code: "013".to_string(),
            sector_name: "전기전자".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[tokio::test]
    async fn test_serves_market_data() {
        let source = StaticSource::market().with_prices(
            "005930",
            vec![
                PricePoint::new(date(2024, 3, 28), 69000.0),
                PricePoint::new(date(2024, 3, 29), 70000.0),
            ],
        );

        let payload = source.fetch(&identity(), date(2024, 3, 29)).await.expect("fetch");
        assert_eq!(payload.kind(), SourceKind::Market);
        assert_eq!(payload.as_of(), Some(date(2024, 3, 29)));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_code() {
        let source = StaticSource::filings();
        let err = source
            .fetch(&identity(), date(2024, 3, 29))
            .await
            .expect_err("unknown");
        assert_eq!(err.kind, SourceErrorKind::UnknownCode);
    }

    #[tokio::test]
    async fn test_sector_keyed_by_sector_code() {
        let source = StaticSource::sector().with_sector(
            "013",
            SectorData {
                sector_name: Some("전기전자".to_string()),
                ..Default::default()
            },
        );

        let payload = source.fetch(&identity(), date(2024, 3, 29)).await.expect("fetch");
        assert!(matches!(payload, SourcePayload::Sector(data) if data.peers.is_empty()));
    }

    #[tokio::test]
    async fn test_configured_failure() {
        let source = StaticSource::market().failing(SourceErrorKind::Upstream);
        let err = source
            .fetch(&identity(), date(2024, 3, 29))
            .await
            .expect_err("failing");
        assert_eq!(err.provider, SourceKind::Market);
        assert!(err.is_transient());
    }
}
