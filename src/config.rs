//! Analysis configuration.
//!
//! Everything has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! market = "brazil"
//! lookback_window = 30
//! patterns = ["doji", "engulfing", "morning_star"]
//! min_strength = 0.4
//!
//! [pattern_params.doji]
//! max_body_ratio = 0.05
//!
//! [weights]
//! trend = 0.5
//! momentum = 0.0
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    calendar::{Market, MarketCalendar},
    probability::EstimatorConfig,
    AnalysisError, BuiltinDetector, CatalogBuilder, PatternCatalog, PatternKind, Period, Ratio,
    Result,
};

/// Linear weights of the logistic scoring model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalWeights {
    /// Latest period's `pct_change`, in units of daily volatility
    pub trend: f64,
    /// Mean daily return, in units of daily volatility
    pub drift: f64,
    /// Net pattern bias, already in [-1, 1]
    pub pattern: f64,
    /// Centered RSI plus the ATR-scaled MACD histogram, each in [-1, 1]
    pub momentum: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            trend: 0.25,
            drift: 2.0,
            pattern: 0.75,
            momentum: 0.5,
        }
    }
}

impl SignalWeights {
    /// Weights must be finite and non-negative so the score stays monotonic.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("weights.trend", self.trend),
            ("weights.drift", self.drift),
            ("weights.pattern", self.pattern),
            ("weights.momentum", self.momentum),
        ] {
            if !value.is_finite() {
                return Err(AnalysisError::InvalidValue("weights must be finite"));
            }
            if value < 0.0 {
                return Err(AnalysisError::OutOfRange {
                    field: field.to_string(),
                    value,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
        }
        Ok(())
    }
}

/// Settings for one [`crate::analysis::Analyzer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub market: Market,
    /// Bars of history the estimator requires and measures volatility over
    pub lookback_window: Period,
    /// Trailing bars scanned for patterns
    pub pattern_window: Period,
    /// Matches ending within this many final bars feed the pattern bias
    pub signal_window: Period,
    /// Trend summaries needed before confidence is no longer scaled down
    pub full_confidence_periods: Period,
    /// Catalog names in registration order; empty selects every pattern
    pub patterns: Vec<String>,
    /// Threshold overrides keyed by pattern name, then parameter name
    pub pattern_params: HashMap<String, HashMap<String, f64>>,
    pub min_strength: Option<f64>,
    pub weights: SignalWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let estimator = EstimatorConfig::default();
        Self {
            market: Market::default(),
            lookback_window: estimator.lookback_window,
            pattern_window: Period::new_const(20),
            signal_window: estimator.signal_window,
            full_confidence_periods: estimator.full_confidence_periods,
            patterns: Vec::new(),
            pattern_params: HashMap::new(),
            min_strength: None,
            weights: SignalWeights::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting without building anything.
    pub fn validate(&self) -> Result<()> {
        self.estimator_config().validate()?;
        self.weights.validate()?;
        if let Some(min) = self.min_strength {
            Ratio::new(min)?;
        }
        self.pattern_kinds()?;
        self.params_by_kind()?;
        Ok(())
    }

    pub fn calendar(&self) -> MarketCalendar {
        MarketCalendar::new(self.market)
    }

    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            lookback_window: self.lookback_window,
            signal_window: self.signal_window,
            full_confidence_periods: self.full_confidence_periods,
        }
    }

    /// Selected kinds in registration order.
    pub fn pattern_kinds(&self) -> Result<Vec<PatternKind>> {
        if self.patterns.is_empty() {
            return Ok(PatternKind::ALL.to_vec());
        }
        let mut kinds = Vec::with_capacity(self.patterns.len());
        for name in &self.patterns {
            let kind: PatternKind = name.parse()?;
            if kinds.contains(&kind) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "pattern `{kind}` listed more than once"
                )));
            }
            kinds.push(kind);
        }
        Ok(kinds)
    }

    fn params_by_kind(&self) -> Result<HashMap<PatternKind, &HashMap<String, f64>>> {
        let selected = self.pattern_kinds()?;
        let mut out = HashMap::with_capacity(self.pattern_params.len());
        for (name, params) in &self.pattern_params {
            let kind: PatternKind = name.parse()?;
            if !selected.contains(&kind) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "parameters given for pattern `{kind}`, which is not in the catalog"
                )));
            }
            out.insert(kind, params);
        }
        Ok(out)
    }

    /// Build the pattern catalog described by `patterns`, `pattern_params`
    /// and `min_strength`.
    pub fn build_catalog(&self) -> Result<PatternCatalog> {
        let params = self.params_by_kind()?;
        let mut builder = CatalogBuilder::new();
        for kind in self.pattern_kinds()? {
            let detector = match params.get(&kind) {
                Some(overrides) => BuiltinDetector::from_kind_with_params(kind, overrides)?,
                None => BuiltinDetector::from_kind(kind),
            };
            builder = builder.add_checked(detector)?;
        }
        if let Some(min) = self.min_strength {
            builder = builder.min_strength(min);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.build_catalog().unwrap().len(), PatternKind::ALL.len());
    }

    #[test]
    fn test_full_document() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            market = "brazil"
            lookback_window = 30
            signal_window = 3
            patterns = ["engulfing", "Doji"]
            min_strength = 0.4

            [pattern_params.doji]
            max_body_ratio = 0.05

            [weights]
            pattern = 1.5
            momentum = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.market, Market::Brazil);
        assert_eq!(config.lookback_window.get(), 30);
        assert_eq!(config.pattern_window.get(), 20);
        assert_eq!(config.weights.pattern, 1.5);
        assert_eq!(config.weights.trend, SignalWeights::default().trend);
        assert_eq!(config.weights.momentum, 0.0);

        let catalog = config.build_catalog().unwrap();
        let kinds: Vec<_> = catalog.kinds().collect();
        assert_eq!(kinds, vec![PatternKind::Engulfing, PatternKind::Doji]);
    }

    #[test]
    fn test_unknown_pattern_rejected() {
        let err = AnalysisConfig::from_toml_str(r#"patterns = ["doji", "head_and_shoulders"]"#)
            .unwrap_err();
        assert_eq!(err, AnalysisError::UnknownPattern("head_and_shoulders".to_string()));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let err = AnalysisConfig::from_toml_str(
            r#"
            [pattern_params.hammer]
            wick = 3.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    }

    #[test]
    fn test_out_of_range_parameter_rejected() {
        let err = AnalysisConfig::from_toml_str(
            r#"
            [pattern_params.doji]
            max_body_ratio = 0.9
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::OutOfRange { .. }));
    }

    #[test]
    fn test_params_for_unselected_pattern_rejected() {
        let err = AnalysisConfig::from_toml_str(
            r#"
            patterns = ["doji"]
            [pattern_params.hammer]
            shadow_factor = 3.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("lookback_window = 0"),
            Err(AnalysisError::Config(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("lookback_window = 1"),
            Err(AnalysisError::OutOfRange { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("[weights]\ndrift = -1.0"),
            Err(AnalysisError::OutOfRange { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("[weights]\nmomentum = -0.5"),
            Err(AnalysisError::OutOfRange { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("[weights]\nmomentum = nan"),
            Err(AnalysisError::InvalidValue(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("min_strength = 1.5"),
            Err(AnalysisError::OutOfRange { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("market = \"tokyo\""),
            Err(AnalysisError::Config(_))
        ));
    }
}
