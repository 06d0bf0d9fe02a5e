//! Single-bar candlestick pattern detectors
//!
//! Patterns: Doji, Hammer, Shooting Star, Marubozu, Spinning Top
//!
//! Thresholds are proportions of the candle's own body and range. Hammer and
//! Shooting Star follow the classic shape rules (long shadow at least twice the
//! body, opposite shadow no longer than the body) without a trend filter.

use std::collections::HashMap;

use super::helpers::{self, is_body_short, is_doji, is_shadow_long, is_shadow_very_short, safe_ratio};
use crate::{
    params::{check_param_names, get_param, get_ratio, ParamMeta, ParameterizedDetector},
    AnalysisError, Direction, OHLCVExt, PatternDetector, PatternKind, PatternSignal, Ratio,
    Result, OHLCV,
};

impl_with_defaults!(
    DojiDetector,
    HammerDetector,
    ShootingStarDetector,
    MarubozuDetector,
    SpinningTopDetector,
);

// ============================================================
// DOJI
// ============================================================

/// Doji - open and close (almost) equal
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub max_body_ratio: Ratio,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: Ratio::new_const(helpers::DOJI_RATIO),
        }
    }
}

const DOJI_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "max_body_ratio",
    helpers::DOJI_RATIO,
    (0.0, 0.5),
    "Largest body, as a share of the range, still counted as a doji",
)];

impl ParameterizedDetector for DojiDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::Doji
    }

    fn param_meta() -> &'static [ParamMeta] {
        DOJI_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), DOJI_PARAMS, params)?;
        Ok(Self {
            max_body_ratio: get_ratio(DOJI_PARAMS, params, "max_body_ratio")?,
        })
    }
}

impl PatternDetector for DojiDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Doji
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let bar = window.first()?;
        let body = bar.body();
        let range = bar.range();

        if !is_doji(body, range, self.max_body_ratio.get()) {
            return None;
        }

        // Flat bar: a doji by definition but carries no shape information
        let strength = if range > f64::EPSILON {
            let closeness = safe_ratio(body / range, self.max_body_ratio.get(), 0.0).min(1.0);
            0.5 + (1.0 - closeness) * 0.5
        } else {
            0.5
        };

        Some(PatternSignal::new(Direction::Neutral, strength))
    }
}

// ============================================================
// HAMMER / SHOOTING STAR
// ============================================================

const HAMMER_PARAMS: &[ParamMeta] = &[ParamMeta::factor(
    "shadow_factor",
    helpers::SHADOW_LONG_FACTOR,
    (1.0, 10.0),
    "Minimum length of the long shadow as a multiple of the body",
)];

/// Hammer - small body on top, lower shadow at least twice the body
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub shadow_factor: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            shadow_factor: helpers::SHADOW_LONG_FACTOR,
        }
    }
}

impl ParameterizedDetector for HammerDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::Hammer
    }

    fn param_meta() -> &'static [ParamMeta] {
        HAMMER_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), HAMMER_PARAMS, params)?;
        Ok(Self {
            shadow_factor: get_param(HAMMER_PARAMS, params, "shadow_factor")?,
        })
    }
}

impl PatternDetector for HammerDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Hammer
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let bar = window.first()?;
        let body = bar.body();

        if body <= 0.0 {
            return None;
        }
        if !is_shadow_long(bar.lower_shadow(), body, self.shadow_factor) {
            return None;
        }
        if bar.upper_shadow() > body {
            return None;
        }

        let strength = bar.lower_shadow_ratio()?;
        Some(PatternSignal::new(Direction::Bullish, strength))
    }

    fn validate_config(&self) -> Result<()> {
        HAMMER_PARAMS[0].validate(self.shadow_factor)
    }
}

/// Shooting Star - small body at the bottom, upper shadow at least twice the body
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarDetector {
    pub shadow_factor: f64,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            shadow_factor: helpers::SHADOW_LONG_FACTOR,
        }
    }
}

impl ParameterizedDetector for ShootingStarDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::ShootingStar
    }

    fn param_meta() -> &'static [ParamMeta] {
        HAMMER_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), HAMMER_PARAMS, params)?;
        Ok(Self {
            shadow_factor: get_param(HAMMER_PARAMS, params, "shadow_factor")?,
        })
    }
}

impl PatternDetector for ShootingStarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ShootingStar
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let bar = window.first()?;
        let body = bar.body();

        if body <= 0.0 {
            return None;
        }
        if !is_shadow_long(bar.upper_shadow(), body, self.shadow_factor) {
            return None;
        }
        if bar.lower_shadow() > body {
            return None;
        }

        let strength = bar.upper_shadow_ratio()?;
        Some(PatternSignal::new(Direction::Bearish, strength))
    }

    fn validate_config(&self) -> Result<()> {
        HAMMER_PARAMS[0].validate(self.shadow_factor)
    }
}

// ============================================================
// MARUBOZU
// ============================================================

const MARUBOZU_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "max_shadow_ratio",
    helpers::SHADOW_VERYSHORT_RATIO,
    (0.0, 0.3),
    "Longest shadow, as a share of the range, for a shaven candle",
)];

/// Marubozu - body spans (almost) the whole range
#[derive(Debug, Clone, Copy)]
pub struct MarubozuDetector {
    pub max_shadow_ratio: Ratio,
}

impl Default for MarubozuDetector {
    fn default() -> Self {
        Self {
            max_shadow_ratio: Ratio::new_const(helpers::SHADOW_VERYSHORT_RATIO),
        }
    }
}

impl ParameterizedDetector for MarubozuDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::Marubozu
    }

    fn param_meta() -> &'static [ParamMeta] {
        MARUBOZU_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), MARUBOZU_PARAMS, params)?;
        Ok(Self {
            max_shadow_ratio: get_ratio(MARUBOZU_PARAMS, params, "max_shadow_ratio")?,
        })
    }
}

impl PatternDetector for MarubozuDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Marubozu
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let bar = window.first()?;
        let range = bar.range();
        let max = self.max_shadow_ratio.get();

        if bar.body() <= 0.0 {
            return None;
        }
        if !is_shadow_very_short(bar.upper_shadow(), range, max)
            || !is_shadow_very_short(bar.lower_shadow(), range, max)
        {
            return None;
        }

        Some(PatternSignal::new(bar.candle_direction(), bar.body_ratio()?))
    }
}

// ============================================================
// SPINNING TOP
// ============================================================

const SPINNING_TOP_PARAMS: &[ParamMeta] = &[
    ParamMeta::ratio(
        "min_body_ratio",
        helpers::DOJI_RATIO,
        (0.0, 0.5),
        "Body must be larger than this share of the range (smaller is a doji)",
    ),
    ParamMeta::ratio(
        "max_body_ratio",
        helpers::BODY_SHORT_RATIO,
        (0.05, 0.6),
        "Body must not exceed this share of the range",
    ),
];

/// Spinning Top - small body with both shadows longer than the body
#[derive(Debug, Clone, Copy)]
pub struct SpinningTopDetector {
    pub min_body_ratio: Ratio,
    pub max_body_ratio: Ratio,
}

impl Default for SpinningTopDetector {
    fn default() -> Self {
        Self {
            min_body_ratio: Ratio::new_const(helpers::DOJI_RATIO),
            max_body_ratio: Ratio::new_const(helpers::BODY_SHORT_RATIO),
        }
    }
}

impl ParameterizedDetector for SpinningTopDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::SpinningTop
    }

    fn param_meta() -> &'static [ParamMeta] {
        SPINNING_TOP_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), SPINNING_TOP_PARAMS, params)?;
        let detector = Self {
            min_body_ratio: get_ratio(SPINNING_TOP_PARAMS, params, "min_body_ratio")?,
            max_body_ratio: get_ratio(SPINNING_TOP_PARAMS, params, "max_body_ratio")?,
        };
        detector.validate_config()?;
        Ok(detector)
    }
}

impl PatternDetector for SpinningTopDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::SpinningTop
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let bar = window.first()?;
        let body = bar.body();
        let range = bar.range();

        if !is_body_short(body, range, self.max_body_ratio.get()) {
            return None;
        }
        if body / range <= self.min_body_ratio.get() {
            return None;
        }
        let upper = bar.upper_shadow();
        let lower = bar.lower_shadow();
        if upper <= body || lower <= body {
            return None;
        }

        // Symmetric shadows score highest
        let strength = 1.0 - (upper - lower).abs() / range;
        Some(PatternSignal::new(Direction::Neutral, strength))
    }

    fn validate_config(&self) -> Result<()> {
        if self.min_body_ratio.get() >= self.max_body_ratio.get() {
            return Err(AnalysisError::InvalidConfig(
                "spinning_top: min_body_ratio must be below max_body_ratio".to_string(),
            ));
        }
        Ok(())
    }
}
