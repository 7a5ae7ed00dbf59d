//! Company valuation engine
//!
//! This crate turns a free-form company query into a valuation snapshot:
//!
//! - Identifier resolution by listing code or company name
//! - Concurrent fetches from filings, market and sector providers, with
//!   per-attempt timeouts, retries on transient failures and a shared
//!   single-flight cache
//! - Aggregation onto a single basis date, tolerating failed providers
//! - Fair value from EPS and BPS, a 0-100 fundamental score and a
//!   sector-relative PER comparison
//!
//! # Architecture
//!
//! ```text
//! IdentifierResolver → {filings, market, sector} SourceAdapter (concurrent)
//!     → Aggregator → {peers, valuation, scoring} → AnalysisResult
//! ```
//!
//! Only resolution can fail a request. Every other failure leaves the
//! affected fields `None` and is recorded on the result.
//!
//! # Example
//!
//! ```rust,ignore
//! use fairval_engine::{AnalysisEngine, EngineConfig, SecurityDirectory, SourceSet};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let directory = SecurityDirectory::load("data/directory.json").await?;
//!     let engine = AnalysisEngine::new(
//!         EngineConfig::default(),
//!         directory,
//!         SourceSet::from_data_dir("data"),
//!     )?;
//!
//!     let result = engine.analyze("005930").await?;
//!     println!("{:?}", result.fair_value);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod resolver;
pub mod retry;
pub mod sources;

pub use analysis::{DataFreshness, FairValue, FundamentalScore, SourceStatus};
pub use cache::SourceCache;
pub use config::{EngineConfig, ScoreWeights, ValuationConfig};
pub use engine::{AnalysisEngine, AnalysisResult, SourceSet};
pub use error::{AnalysisError, Result, SourceError, SourceErrorKind};
pub use model::{CompanyIdentity, FundamentalSnapshot, PeerSummary, PricePoint, StockCode};
pub use resolver::{DirectoryEntry, IdentifierResolver, SecurityDirectory};
pub use retry::RetryPolicy;
pub use sources::{FileSource, HttpSource, SourceAdapter, SourceKind, StaticSource};
