//! Two-bar candlestick pattern detectors
//!
//! Patterns: Inverted Hammer, Engulfing, Harami, Piercing, Dark Cloud Cover,
//! Inside Bar, Outside Bar

use std::collections::HashMap;

use super::helpers::{self, body_inside, is_body_long, is_shadow_long, safe_ratio};
use crate::{
    params::{check_param_names, get_param, get_ratio, ParamMeta, ParameterizedDetector},
    Direction, OHLCVExt, PatternDetector, PatternKind, PatternSignal, Ratio, Result, OHLCV,
};

impl_with_defaults!(
    InvertedHammerDetector,
    EngulfingDetector,
    HaramiDetector,
    PiercingDetector,
    DarkCloudCoverDetector,
    InsideBarDetector,
    OutsideBarDetector,
);

impl_fixed_params!(
    EngulfingDetector => Engulfing,
    InsideBarDetector => InsideBar,
    OutsideBarDetector => OutsideBar,
);

// ============================================================
// INVERTED HAMMER
// ============================================================

const INVERTED_HAMMER_PARAMS: &[ParamMeta] = &[ParamMeta::factor(
    "shadow_factor",
    helpers::SHADOW_LONG_FACTOR,
    (1.0, 10.0),
    "Minimum upper shadow as a multiple of the body",
)];

/// Inverted Hammer - after a black candle, a small body at the bottom of the
/// range with a long upper shadow, not opening above the prior close
#[derive(Debug, Clone, Copy)]
pub struct InvertedHammerDetector {
    pub shadow_factor: f64,
}

impl Default for InvertedHammerDetector {
    fn default() -> Self {
        Self {
            shadow_factor: helpers::SHADOW_LONG_FACTOR,
        }
    }
}

impl ParameterizedDetector for InvertedHammerDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::InvertedHammer
    }

    fn param_meta() -> &'static [ParamMeta] {
        INVERTED_HAMMER_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), INVERTED_HAMMER_PARAMS, params)?;
        Ok(Self {
            shadow_factor: get_param(INVERTED_HAMMER_PARAMS, params, "shadow_factor")?,
        })
    }
}

impl PatternDetector for InvertedHammerDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::InvertedHammer
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let [prev, curr] = window else {
            return None;
        };

        if !prev.is_bearish() {
            return None;
        }
        let body = curr.body();
        if body <= 0.0 {
            return None;
        }
        if !is_shadow_long(curr.upper_shadow(), body, self.shadow_factor) {
            return None;
        }
        if curr.lower_shadow() > body {
            return None;
        }
        if curr.body_top() > prev.close() {
            return None;
        }

        Some(PatternSignal::new(Direction::Bullish, curr.upper_shadow_ratio()?))
    }

    fn validate_config(&self) -> Result<()> {
        INVERTED_HAMMER_PARAMS[0].validate(self.shadow_factor)
    }
}

// ============================================================
// ENGULFING
// ============================================================

/// Engulfing Pattern (bullish and bearish): the second real body covers the
/// first, opposite color. At most one edge may coincide.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Engulfing
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let [prev, curr] = window else {
            return None;
        };

        let direction = if prev.is_bearish() && curr.is_bullish() {
            Direction::Bullish
        } else if prev.is_bullish() && curr.is_bearish() {
            Direction::Bearish
        } else {
            return None;
        };

        let covers = curr.body_top() >= prev.body_top() && curr.body_bottom() <= prev.body_bottom();
        let strictly_larger = curr.body() > prev.body();
        if !covers || !strictly_larger {
            return None;
        }

        let strength = 0.5 + 0.5 * (1.0 - prev.body() / curr.body());
        Some(PatternSignal::new(direction, strength))
    }
}

// ============================================================
// HARAMI
// ============================================================

const HARAMI_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "min_first_body_ratio",
    helpers::BODY_LONG_RATIO,
    (0.2, 1.0),
    "First candle body as a share of its range",
)];

/// Harami - a smaller body held inside the previous long body
#[derive(Debug, Clone, Copy)]
pub struct HaramiDetector {
    pub min_first_body_ratio: Ratio,
}

impl Default for HaramiDetector {
    fn default() -> Self {
        Self {
            min_first_body_ratio: Ratio::new_const(helpers::BODY_LONG_RATIO),
        }
    }
}

impl ParameterizedDetector for HaramiDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::Harami
    }

    fn param_meta() -> &'static [ParamMeta] {
        HARAMI_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), HARAMI_PARAMS, params)?;
        Ok(Self {
            min_first_body_ratio: get_ratio(HARAMI_PARAMS, params, "min_first_body_ratio")?,
        })
    }
}

impl PatternDetector for HaramiDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Harami
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let [prev, curr] = window else {
            return None;
        };

        let first_direction = prev.candle_direction();
        if first_direction == Direction::Neutral {
            return None;
        }
        if !is_body_long(prev.body(), prev.range(), self.min_first_body_ratio.get()) {
            return None;
        }
        if !body_inside(curr, prev) || curr.body() >= prev.body() {
            return None;
        }

        let strength = 1.0 - curr.body() / prev.body();
        Some(PatternSignal::new(first_direction.opposite(), strength))
    }
}

// ============================================================
// PIERCING / DARK CLOUD COVER
// ============================================================

const PENETRATION_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "penetration",
    helpers::PENETRATION,
    (0.1, 0.9),
    "How deep the second close must reach into the first body",
)];

/// Piercing - a white candle opening below the prior black close and closing
/// past the midpoint of its body
#[derive(Debug, Clone, Copy)]
pub struct PiercingDetector {
    pub penetration: Ratio,
}

impl Default for PiercingDetector {
    fn default() -> Self {
        Self {
            penetration: Ratio::new_const(helpers::PENETRATION),
        }
    }
}

impl ParameterizedDetector for PiercingDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::Piercing
    }

    fn param_meta() -> &'static [ParamMeta] {
        PENETRATION_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), PENETRATION_PARAMS, params)?;
        Ok(Self {
            penetration: get_ratio(PENETRATION_PARAMS, params, "penetration")?,
        })
    }
}

impl PatternDetector for PiercingDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Piercing
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let [prev, curr] = window else {
            return None;
        };

        if !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        if curr.open() >= prev.close() {
            return None;
        }
        let body = prev.body();
        if curr.close() <= prev.close() + body * self.penetration.get() {
            return None;
        }
        // Closing above the prior open would be an engulfing
        if curr.close() >= prev.open() {
            return None;
        }

        let depth = (curr.close() - prev.close()) / body;
        Some(PatternSignal::new(Direction::Bullish, depth))
    }
}

/// Dark Cloud Cover - a black candle opening above the prior white close and
/// closing below the midpoint of its body
#[derive(Debug, Clone, Copy)]
pub struct DarkCloudCoverDetector {
    pub penetration: Ratio,
}

impl Default for DarkCloudCoverDetector {
    fn default() -> Self {
        Self {
            penetration: Ratio::new_const(helpers::PENETRATION),
        }
    }
}

impl ParameterizedDetector for DarkCloudCoverDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::DarkCloudCover
    }

    fn param_meta() -> &'static [ParamMeta] {
        PENETRATION_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), PENETRATION_PARAMS, params)?;
        Ok(Self {
            penetration: get_ratio(PENETRATION_PARAMS, params, "penetration")?,
        })
    }
}

impl PatternDetector for DarkCloudCoverDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::DarkCloudCover
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let [prev, curr] = window else {
            return None;
        };

        if !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        if curr.open() <= prev.close() {
            return None;
        }
        let body = prev.body();
        if curr.close() >= prev.close() - body * self.penetration.get() {
            return None;
        }
        if curr.close() <= prev.open() {
            return None;
        }

        let depth = (prev.close() - curr.close()) / body;
        Some(PatternSignal::new(Direction::Bearish, depth))
    }
}

// ============================================================
// INSIDE / OUTSIDE BAR
// ============================================================

/// Inside Bar - range contained in the previous range
#[derive(Debug, Clone, Copy, Default)]
pub struct InsideBarDetector;

impl PatternDetector for InsideBarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::InsideBar
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let [prev, curr] = window else {
            return None;
        };

        if curr.high() > prev.high() || curr.low() < prev.low() {
            return None;
        }

        // Tighter contraction scores higher
        let strength = 1.0 - safe_ratio(curr.range(), prev.range(), 1.0);
        Some(PatternSignal::new(Direction::Neutral, strength))
    }
}

/// Outside Bar - range covers the previous range; direction follows the candle
#[derive(Debug, Clone, Copy, Default)]
pub struct OutsideBarDetector;

impl PatternDetector for OutsideBarDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::OutsideBar
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let [prev, curr] = window else {
            return None;
        };

        if curr.high() < prev.high() || curr.low() > prev.low() {
            return None;
        }

        let strength = 1.0 - safe_ratio(prev.range(), curr.range(), 1.0);
        Some(PatternSignal::new(curr.candle_direction(), strength))
    }
}
