//! Configuration for the analysis engine

use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Fair-value model parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Share of the earnings-based estimate in the blend; the book-based
    /// estimate gets the remainder
    pub earnings_weight: f64,

    /// Target PER used when no sector average is available
    pub default_target_per: f64,

    /// Target PBR applied to BPS
    pub target_pbr: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            earnings_weight: 0.5,
            default_target_per: 10.0,
            target_pbr: 1.0,
        }
    }
}

/// Weights of the composite fundamental score. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub roe: f64,
    pub op_margin: f64,
    pub debt_ratio: f64,
    pub sales_growth: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            roe: 0.30,
            op_margin: 0.20,
            debt_ratio: 0.25,
            sales_growth: 0.25,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.roe + self.op_margin + self.debt_ratio + self.sales_growth
    }

    fn all(&self) -> [f64; 4] {
        [self.roe, self.op_margin, self.debt_ratio, self.sales_growth]
    }
}

/// Configuration for the analysis engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a resolved query stays cached
    pub resolver_cache_ttl: Duration,

    /// How long a provider result stays cached
    pub source_cache_ttl: Duration,

    /// Retries after the first attempt, transient failures only
    pub max_retries: u32,

    /// Backoff before the first retry; doubles on each further retry
    pub retry_backoff_base: Duration,

    /// Upper bound on a single backoff
    pub retry_backoff_max: Duration,

    /// Timeout of a single provider attempt
    pub request_timeout: Duration,

    /// Sources older than this relative to the basis date are flagged
    pub staleness_tolerance_days: i64,

    /// Fixed as-of date; today's local date when unset
    pub as_of: Option<NaiveDate>,

    pub valuation: ValuationConfig,

    pub scoring: ScoreWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolver_cache_ttl: Duration::from_secs(300), // 5 minutes
            source_cache_ttl: Duration::from_secs(60),    // 1 minute
            max_retries: 2,
            retry_backoff_base: Duration::from_millis(200),
            retry_backoff_max: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            staleness_tolerance_days: 180,
            as_of: None,
            valuation: ValuationConfig::default(),
            scoring: ScoreWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Apply `FAIRVAL_AS_OF` and `FAIRVAL_TIMEOUT_SECS` from the environment
    pub fn with_env(mut self) -> Result<Self> {
        if let Ok(raw) = std::env::var("FAIRVAL_AS_OF") {
            self.as_of = Some(parse_as_of(&raw)?);
        }
        if let Ok(raw) = std::env::var("FAIRVAL_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                AnalysisError::Config(format!("FAIRVAL_TIMEOUT_SECS '{raw}': {e}"))
            })?;
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(AnalysisError::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry_backoff_base > self.retry_backoff_max {
            return Err(AnalysisError::Config(
                "retry_backoff_base must not exceed retry_backoff_max".to_string(),
            ));
        }

        if self.staleness_tolerance_days < 0 {
            return Err(AnalysisError::Config(
                "staleness_tolerance_days must not be negative".to_string(),
            ));
        }

        let valuation = &self.valuation;
        if !(0.0..=1.0).contains(&valuation.earnings_weight) {
            return Err(AnalysisError::Config(
                "valuation.earnings_weight must be within [0, 1]".to_string(),
            ));
        }
        if !(valuation.default_target_per.is_finite() && valuation.default_target_per > 0.0) {
            return Err(AnalysisError::Config(
                "valuation.default_target_per must be positive".to_string(),
            ));
        }
        if !(valuation.target_pbr.is_finite() && valuation.target_pbr > 0.0) {
            return Err(AnalysisError::Config(
                "valuation.target_pbr must be positive".to_string(),
            ));
        }

        if self
            .scoring
            .all()
            .iter()
            .any(|weight| !(0.0..=1.0).contains(weight))
        {
            return Err(AnalysisError::Config(
                "scoring weights must be within [0, 1]".to_string(),
            ));
        }
        if (self.scoring.total() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AnalysisError::Config(format!(
                "scoring weights must sum to 1, got {}",
                self.scoring.total()
            )));
        }

        Ok(())
    }

    /// The as-of date used for provider requests
    pub fn effective_as_of(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_as_of(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| AnalysisError::Config(format!("invalid as-of date '{raw}': {e}")))
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    resolver_cache_ttl: Option<Duration>,
    source_cache_ttl: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    retry_backoff_max: Option<Duration>,
    request_timeout: Option<Duration>,
    staleness_tolerance_days: Option<i64>,
    as_of: Option<NaiveDate>,
    valuation: Option<ValuationConfig>,
    scoring: Option<ScoreWeights>,
}

impl EngineConfigBuilder {
    pub fn resolver_cache_ttl(mut self, duration: Duration) -> Self {
        self.resolver_cache_ttl = Some(duration);
        self
    }

    pub fn source_cache_ttl(mut self, duration: Duration) -> Self {
        self.source_cache_ttl = Some(duration);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    pub fn retry_backoff_max(mut self, duration: Duration) -> Self {
        self.retry_backoff_max = Some(duration);
        self
    }

    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    pub fn staleness_tolerance_days(mut self, days: i64) -> Self {
        self.staleness_tolerance_days = Some(days);
        self
    }

    /// Pin the as-of date instead of using today
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn valuation(mut self, valuation: ValuationConfig) -> Self {
        self.valuation = Some(valuation);
        self
    }

    pub fn scoring(mut self, weights: ScoreWeights) -> Self {
        self.scoring = Some(weights);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            resolver_cache_ttl: self.resolver_cache_ttl.unwrap_or(defaults.resolver_cache_ttl),
            source_cache_ttl: self.source_cache_ttl.unwrap_or(defaults.source_cache_ttl),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            retry_backoff_max: self.retry_backoff_max.unwrap_or(defaults.retry_backoff_max),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            staleness_tolerance_days: self
                .staleness_tolerance_days
                .unwrap_or(defaults.staleness_tolerance_days),
            as_of: self.as_of.or(defaults.as_of),
            valuation: self.valuation.unwrap_or(defaults.valuation),
            scoring: self.scoring.unwrap_or(defaults.scoring),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!((config.scoring.total() - 1.0).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 29).expect("date");
        let config = EngineConfig::builder()
            .max_retries(1)
            .request_timeout(Duration::from_secs(2))
            .as_of(as_of)
            .build()
            .expect("valid config");

        assert_eq!(config.max_retries, 1);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.effective_as_of(), as_of);
    }

    #[test]
    fn test_validation_rejects_unbalanced_weights() {
        let result = EngineConfig::builder()
            .scoring(ScoreWeights {
                roe: 0.5,
                op_margin: 0.5,
                debt_ratio: 0.5,
                sales_growth: 0.0,
            })
            .build();

        assert!(matches!(result, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_validation_rejects_bad_valuation() {
        let config = EngineConfig {
            valuation: ValuationConfig {
                earnings_weight: 1.5,
                ..ValuationConfig::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            valuation: ValuationConfig {
                target_pbr: 0.0,
                ..ValuationConfig::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = EngineConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_as_of() {
        assert_eq!(
            parse_as_of(" 2024-03-29 ").expect("valid"),
            NaiveDate::from_ymd_opt(2024, 3, 29).expect("date")
        );
        assert!(parse_as_of("29/03/2024").is_err());
    }
}
