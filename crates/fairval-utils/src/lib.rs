//! Shared utilities for fairval
//!
//! Tracing setup used by the `fairval` binary and by anything embedding the
//! engine that wants the same log output.

pub mod logging;

pub use logging::{LogFormat, init_tracing, init_tracing_json, init_tracing_with};
