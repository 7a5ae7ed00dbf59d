//! Company analysis engine

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::analysis::{Aggregator, SourceOutcomes};
use crate::cache::{CacheKey, SourceCache};
use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result, SourceError};
use crate::model::CompanyIdentity;
use crate::resolver::{IdentifierResolver, SecurityDirectory};
use crate::retry::RetryPolicy;
use crate::sources::{FileSource, HttpSource, SourceAdapter, SourceKind, SourcePayload};

use super::result::{AnalysisResult, assemble};

/// One provider per kind
#[derive(Clone)]
pub struct SourceSet {
    pub filings: Arc<dyn SourceAdapter>,
    pub market: Arc<dyn SourceAdapter>,
    pub sector: Arc<dyn SourceAdapter>,
}

impl SourceSet {
    pub fn new(
        filings: Arc<dyn SourceAdapter>,
        market: Arc<dyn SourceAdapter>,
        sector: Arc<dyn SourceAdapter>,
    ) -> Self {
        Self {
            filings,
            market,
            sector,
        }
    }

    /// File-backed providers reading `<root>/{filings,market,sectors}/<key>.json`
    pub fn from_data_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(
            Arc::new(FileSource::new(SourceKind::Filings, root)),
            Arc::new(FileSource::new(SourceKind::Market, root)),
            Arc::new(FileSource::new(SourceKind::Sector, root)),
        )
    }

    /// HTTP providers sharing one base URL
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpSource::new(SourceKind::Filings, base_url)?),
            Arc::new(HttpSource::new(SourceKind::Market, base_url)?),
            Arc::new(HttpSource::new(SourceKind::Sector, base_url)?),
        ))
    }

    pub fn get(&self, kind: SourceKind) -> &Arc<dyn SourceAdapter> {
        match kind {
            SourceKind::Filings => &self.filings,
            SourceKind::Market => &self.market,
            SourceKind::Sector => &self.sector,
        }
    }

    fn validate(&self) -> Result<()> {
        for kind in SourceKind::ALL {
            let actual = self.get(kind).kind();
            if actual != kind {
                return Err(AnalysisError::Config(format!(
                    "{kind} slot holds a {actual} provider"
                )));
            }
        }
        Ok(())
    }
}

/// Resolves a query, gathers provider data concurrently and assembles the
/// valuation result.
///
/// Safe to share across tasks; concurrent requests for the same security
/// and date share provider calls through the source cache.
pub struct AnalysisEngine {
    config: EngineConfig,
    resolver: IdentifierResolver,
    sources: SourceSet,
    cache: SourceCache,
    retry: RetryPolicy,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig, directory: SecurityDirectory, sources: SourceSet) -> Result<Self> {
        config.validate()?;
        sources.validate()?;

        Ok(Self {
            resolver: IdentifierResolver::new(directory, config.resolver_cache_ttl),
            cache: SourceCache::new(config.source_cache_ttl),
            retry: RetryPolicy::from_config(&config),
            sources,
            config,
        })
    }

    /// Replace the retry policy derived from the configuration
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Resolve a query without fetching any data
    pub fn resolve(&self, query: &str) -> Result<CompanyIdentity> {
        self.resolver.resolve(query)
    }

    /// Analyze one company.
    ///
    /// # Errors
    ///
    /// Only identifier resolution fails a request. Provider failures are
    /// reported in [`AnalysisResult::sources`] and leave dependent fields
    /// unavailable.
    #[instrument(skip(self))]
    pub async fn analyze(&self, query: &str) -> Result<AnalysisResult> {
        let identity = self.resolver.resolve(query)?;
        let as_of = self.config.effective_as_of();
        info!("Analyzing {} ({}) as of {}", identity.name, identity.code, as_of);

        let (filings, market, sector) = tokio::join!(
            self.fetch(SourceKind::Filings, &identity, as_of),
            self.fetch(SourceKind::Market, &identity, as_of),
            self.fetch(SourceKind::Sector, &identity, as_of),
        );

        let snapshot = Aggregator::new(as_of, self.config.staleness_tolerance_days).aggregate(
            SourceOutcomes {
                filings,
                market,
                sector,
            },
        );

        Ok(assemble(identity, snapshot, &self.config))
    }

    async fn fetch(
        &self,
        kind: SourceKind,
        identity: &CompanyIdentity,
        as_of: NaiveDate,
    ) -> std::result::Result<SourcePayload, SourceError> {
        let key = CacheKey::new(kind, identity.code.clone(), as_of);
        let adapter = Arc::clone(self.sources.get(kind));
        let retry = self.retry.clone();
        let identity = identity.clone();

        self.cache
            .get_or_fetch(key, move || async move {
                retry
                    .execute(kind, || adapter.fetch(&identity, as_of))
                    .await
            })
            .await
    }
}
