//! Provider backed by a remote JSON service
//!
//! Requests `GET {base_url}/{segment}/{key}?as_of=YYYY-MM-DD` and expects the
//! same bodies as the file layout. Status codes are classified so that only
//! transient failures get retried:
//!
//! | Response | Error kind |
//! |----------|------------|
//! | connect error | `Network` |
//! | client timeout | `Timeout` |
//! | 404 | `UnknownCode` (`NoData` for sectors) |
//! | 429 | `RateLimited` |
//! | 5xx | `Upstream` |
//! | other 4xx | `Rejected` |

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use super::{SourceAdapter, SourceKind, SourcePayload, decode_payload};
use crate::error::{AnalysisError, Result, SourceError, SourceErrorKind};
use crate::model::CompanyIdentity;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Default request budget per client
const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// HTTP JSON provider for one kind.
#[derive(Debug, Clone)]
pub struct HttpSource {
    kind: SourceKind,
    client: Client,
    base_url: Url,
    rate_limiter: SharedRateLimiter,
}

impl HttpSource {
    /// Create a provider with the default rate limit
    pub fn new(kind: SourceKind, base_url: &str) -> Result<Self> {
        Self::with_rate_limit(kind, base_url, DEFAULT_REQUESTS_PER_SECOND)
    }

    /// Create a provider allowing at most `requests_per_second` calls
    pub fn with_rate_limit(kind: SourceKind, base_url: &str, requests_per_second: u32) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AnalysisError::Config(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AnalysisError::Config(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }

        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            kind,
            client: Client::new(),
            base_url,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    fn endpoint(&self, key: &str, as_of: NaiveDate) -> std::result::Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                SourceError::new(self.kind, SourceErrorKind::Rejected, "base URL cannot carry a path")
            })?
            .pop_if_empty()
            .push(self.kind.segment())
            .push(key);
        url.query_pairs_mut()
            .append_pair("as_of", &as_of.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    fn transport_error(&self, error: &reqwest::Error) -> SourceError {
        let kind = if error.is_timeout() {
            SourceErrorKind::Timeout
        } else if error.is_decode() {
            SourceErrorKind::Malformed
        } else {
            SourceErrorKind::Network
        };
        SourceError::new(self.kind, kind, error.to_string())
    }

    fn status_error(&self, status: StatusCode, key: &str) -> SourceError {
        match status {
            StatusCode::NOT_FOUND if self.kind == SourceKind::Sector => {
                SourceError::no_data(self.kind, format!("no peer data for sector '{key}'"))
            }
            StatusCode::NOT_FOUND => SourceError::unknown_code(self.kind, key),
            StatusCode::TOO_MANY_REQUESTS => SourceError::new(
                self.kind,
                SourceErrorKind::RateLimited,
                "provider rate limit exceeded",
            ),
            status if status.is_server_error() => SourceError::new(
                self.kind,
                SourceErrorKind::Upstream,
                format!("HTTP error: {status}"),
            ),
            status => SourceError::new(
                self.kind,
                SourceErrorKind::Rejected,
                format!("HTTP error: {status}"),
            ),
        }
    }
}

#[async_trait]
impl SourceAdapter for HttpSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(
        &self,
        identity: &CompanyIdentity,
        as_of: NaiveDate,
    ) -> std::result::Result<SourcePayload, SourceError> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let key = self.kind.lookup_key(identity);
        let url = self.endpoint(key, as_of)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(status, key));
        }

        let body = response.text().await.map_err(|e| self.transport_error(&e))?;
        decode_payload(self.kind, &body, as_of)
    }
}
