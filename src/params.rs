//! Tunable detector thresholds
//!
//! Each detector publishes the thresholds it accepts through [`ParamMeta`].
//! Overrides coming from configuration are checked against that table:
//! - unknown parameter names fail with [`AnalysisError::InvalidConfig`]
//! - values outside the documented range fail with [`AnalysisError::OutOfRange`]
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use candlecast::prelude::*;
//!
//! for param in DojiDetector::param_meta() {
//!     assert!(param.validate(param.default).is_ok());
//! }
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("max_body_ratio".to_string(), 0.05);
//! let doji = DojiDetector::with_params(&overrides).unwrap();
//! assert_eq!(doji.max_body_ratio.get(), 0.05);
//! ```

use std::collections::HashMap;

use crate::{AnalysisError, PatternKind, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// How a threshold is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Proportion of a bar's range or body, 0.0..=1.0
  Ratio,
  /// Positive multiplier, e.g. "shadow at least 2x the body"
  Factor,
}

/// One overridable threshold of a detector
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Key used in `pattern_params`, e.g. `max_body_ratio`
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted values: (min, max), inclusive
  pub range: (f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// Finite, inside `range`, and positive for factors
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(AnalysisError::InvalidValue("parameter must be finite"));
    }
    let (min, max) = self.range;
    if value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name.to_string(), value, min, max });
    }
    if self.param_type == ParamType::Factor && value <= 0.0 {
      return Err(AnalysisError::InvalidValue("factor must be > 0"));
    }
    Ok(())
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Construction from a threshold override map.
///
/// Detectors with fixed thresholds keep the default methods, so any named
/// override is rejected.
pub trait ParameterizedDetector: Sized + Default {
  /// Pattern this detector recognizes
  fn pattern_kind() -> PatternKind;

  fn param_meta() -> &'static [ParamMeta] {
    &[]
  }

  /// Thresholds absent from `params` keep their defaults.
  fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
    check_param_names(Self::pattern_kind(), Self::param_meta(), params)?;
    Ok(Self::default())
  }
}

// ============================================================
// LOOKUP
// ============================================================

/// Reject overrides that name no known parameter
pub fn check_param_names(
  kind: PatternKind,
  meta: &[ParamMeta],
  params: &HashMap<String, f64>,
) -> Result<()> {
  let mut keys: Vec<&String> = params.keys().collect();
  keys.sort();
  match keys.into_iter().find(|key| !meta.iter().any(|m| m.name == key.as_str())) {
    Some(key) => Err(AnalysisError::InvalidConfig(format!(
      "unknown parameter `{key}` for pattern `{kind}`"
    ))),
    None => Ok(()),
  }
}

/// Look up `key` in `params`, falling back to its documented default
pub fn get_param(meta: &[ParamMeta], params: &HashMap<String, f64>, key: &str) -> Result<f64> {
  let m = meta
    .iter()
    .find(|m| m.name == key)
    .ok_or_else(|| AnalysisError::InvalidConfig(format!("undocumented parameter `{key}`")))?;
  let value = params.get(key).copied().unwrap_or(m.default);
  m.validate(value)?;
  Ok(value)
}

/// [`get_param`] for ratio-typed thresholds
pub fn get_ratio(meta: &[ParamMeta], params: &HashMap<String, f64>, key: &str) -> Result<Ratio> {
  Ratio::new(get_param(meta, params, key)?)
}

// ============================================================
// TESTS
// ============================================================
