//! Analysis stages run on an aggregated snapshot
//!
//! All stages are pure functions over borrowed inputs. They return `None`
//! instead of failing when their inputs do not allow a computation.

pub mod aggregator;
pub mod peers;
pub mod scoring;
pub mod valuation;

pub use aggregator::{Aggregator, DataFreshness, Snapshot, SourceOutcomes, SourceStatus};
pub use scoring::{Factor, FactorScore, FundamentalScore};
pub use valuation::FairValue;
