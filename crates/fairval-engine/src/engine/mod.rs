//! Analysis engine
//!
//! Coordinates resolution, concurrent provider fetches, aggregation and the
//! analysis stages for one request.

pub mod analysis_engine;
pub mod result;

pub use analysis_engine::{AnalysisEngine, SourceSet};
pub use result::{AnalysisResult, assemble};
