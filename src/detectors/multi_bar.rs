//! Five-bar continuation patterns
//!
//! Patterns: Rising Three Methods, Falling Three Methods

use std::collections::HashMap;

use super::helpers::{self, is_body_long};
use crate::{
    params::{check_param_names, get_ratio, ParamMeta, ParameterizedDetector},
    Direction, OHLCVExt, PatternDetector, PatternKind, PatternSignal, Ratio, Result, OHLCV,
};

impl_with_defaults!(RisingThreeMethodsDetector, FallingThreeMethodsDetector);

/// Largest pause body as a share of the first body
const PAUSE_BODY_FACTOR: f64 = 0.5;

const THREE_METHODS_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "pause_body_factor",
    PAUSE_BODY_FACTOR,
    (0.1, 1.0),
    "Largest body of the three pause candles as a share of the first body",
)];

/// Long candle, three small candles drifting against it inside its range,
/// then a long candle of the first color closing beyond the first close.
fn three_methods<T: OHLCV>(window: &[T], direction: Direction, pause_factor: f64) -> Option<f64> {
    let [first, pause @ .., last] = window else {
        return None;
    };
    if pause.len() != 3 {
        return None;
    }

    if first.candle_direction() != direction || last.candle_direction() != direction {
        return None;
    }
    let first_body = first.body();
    if !is_body_long(first_body, first.range(), helpers::BODY_LONG_RATIO) {
        return None;
    }
    if !is_body_long(last.body(), last.range(), helpers::BODY_LONG_RATIO) {
        return None;
    }

    for bar in pause {
        if bar.body() > first_body * pause_factor {
            return None;
        }
        if bar.high() > first.high() || bar.low() < first.low() {
            return None;
        }
    }

    // Pause closes drift against the trend
    let sign = direction.sign();
    if pause.windows(2).any(|w| (w[1].close() - w[0].close()) * sign >= 0.0) {
        return None;
    }

    let fourth = &pause[2];
    let gain = (last.close() - first.close()) * sign;
    if (last.open() - fourth.close()) * sign <= 0.0 || gain <= 0.0 {
        return None;
    }

    Some(0.5 + 0.5 * (gain / first_body).min(1.0))
}

// ============================================================
// RISING / FALLING THREE METHODS
// ============================================================

/// Rising Three Methods - bullish continuation
#[derive(Debug, Clone, Copy)]
pub struct RisingThreeMethodsDetector {
    pub pause_body_factor: Ratio,
}

impl Default for RisingThreeMethodsDetector {
    fn default() -> Self {
        Self {
            pause_body_factor: Ratio::new_const(PAUSE_BODY_FACTOR),
        }
    }
}

impl ParameterizedDetector for RisingThreeMethodsDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::RisingThreeMethods
    }

    fn param_meta() -> &'static [ParamMeta] {
        THREE_METHODS_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), THREE_METHODS_PARAMS, params)?;
        Ok(Self {
            pause_body_factor: get_ratio(THREE_METHODS_PARAMS, params, "pause_body_factor")?,
        })
    }
}

impl PatternDetector for RisingThreeMethodsDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::RisingThreeMethods
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let strength = three_methods(window, Direction::Bullish, self.pause_body_factor.get())?;
        Some(PatternSignal::new(Direction::Bullish, strength))
    }
}

/// Falling Three Methods - bearish continuation
#[derive(Debug, Clone, Copy)]
pub struct FallingThreeMethodsDetector {
    pub pause_body_factor: Ratio,
}

impl Default for FallingThreeMethodsDetector {
    fn default() -> Self {
        Self {
            pause_body_factor: Ratio::new_const(PAUSE_BODY_FACTOR),
        }
    }
}

impl ParameterizedDetector for FallingThreeMethodsDetector {
    fn pattern_kind() -> PatternKind {
        PatternKind::FallingThreeMethods
    }

    fn param_meta() -> &'static [ParamMeta] {
        THREE_METHODS_PARAMS
    }

    fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
        check_param_names(Self::pattern_kind(), THREE_METHODS_PARAMS, params)?;
        Ok(Self {
            pause_body_factor: get_ratio(THREE_METHODS_PARAMS, params, "pause_body_factor")?,
        })
    }
}

impl PatternDetector for FallingThreeMethodsDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::FallingThreeMethods
    }

    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
        let strength = three_methods(window, Direction::Bearish, self.pause_body_factor.get())?;
        Some(PatternSignal::new(Direction::Bearish, strength))
    }
}
