//! Three-bar candlestick pattern detectors
//!
//! Patterns: Morning Star, Evening Star, Three White Soldiers, Three Black Crows

use std::collections::HashMap;

use super::helpers::{self, is_body_long, is_body_short, mean_body_ratio};
use crate::{
  params::{check_param_names, get_ratio, ParamMeta, ParameterizedDetector},
  Direction, OHLCVExt, PatternDetector, PatternKind, PatternSignal, Ratio, Result, OHLCV,
};

impl_with_defaults!(
  MorningStarDetector,
  EveningStarDetector,
  ThreeWhiteSoldiersDetector,
  ThreeBlackCrowsDetector,
);

// ============================================================
// MORNING STAR / EVENING STAR
// ============================================================

const STAR_PARAMS: &[ParamMeta] = &[
  ParamMeta::ratio(
    "star_body_factor",
    helpers::STAR_BODY_FACTOR,
    (0.1, 1.0),
    "Largest star body as a share of the first body",
  ),
  ParamMeta::ratio(
    "penetration",
    helpers::PENETRATION,
    (0.1, 1.0),
    "How far the third close must reach back into the first body",
  ),
];

/// Morning Star - long black candle, small star below its close, white candle
/// closing well into the first body
#[derive(Debug, Clone, Copy)]
pub struct MorningStarDetector {
  pub star_body_factor: Ratio,
  pub penetration: Ratio,
}

impl Default for MorningStarDetector {
  fn default() -> Self {
    Self {
      star_body_factor: Ratio::new_const(helpers::STAR_BODY_FACTOR),
      penetration: Ratio::new_const(helpers::PENETRATION),
    }
  }
}

impl ParameterizedDetector for MorningStarDetector {
  fn pattern_kind() -> PatternKind {
    PatternKind::MorningStar
  }

  fn param_meta() -> &'static [ParamMeta] {
    STAR_PARAMS
  }

  fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
    check_param_names(Self::pattern_kind(), STAR_PARAMS, params)?;
    Ok(Self {
      star_body_factor: get_ratio(STAR_PARAMS, params, "star_body_factor")?,
      penetration: get_ratio(STAR_PARAMS, params, "penetration")?,
    })
  }
}

impl PatternDetector for MorningStarDetector {
  fn kind(&self) -> PatternKind {
    PatternKind::MorningStar
  }

  fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
    let [first, star, third] = window else {
      return None;
    };

    if !first.is_bearish() || !third.is_bullish() {
      return None;
    }
    let first_body = first.body();
    if !is_body_long(first_body, first.range(), helpers::BODY_LONG_RATIO) {
      return None;
    }
    if star.body() > first_body * self.star_body_factor.get() {
      return None;
    }
    if star.body_bottom() >= first.close() {
      return None;
    }
    if third.close() <= first.close() + first_body * self.penetration.get() {
      return None;
    }

    let depth = ((third.close() - first.close()) / first_body).min(1.0);
    Some(PatternSignal::new(Direction::Bullish, depth))
  }
}

/// Evening Star - long white candle, small star above its close, black candle
/// closing well into the first body
#[derive(Debug, Clone, Copy)]
pub struct EveningStarDetector {
  pub star_body_factor: Ratio,
  pub penetration: Ratio,
}

impl Default for EveningStarDetector {
  fn default() -> Self {
    Self {
      star_body_factor: Ratio::new_const(helpers::STAR_BODY_FACTOR),
      penetration: Ratio::new_const(helpers::PENETRATION),
    }
  }
}

impl ParameterizedDetector for EveningStarDetector {
  fn pattern_kind() -> PatternKind {
    PatternKind::EveningStar
  }

  fn param_meta() -> &'static [ParamMeta] {
    STAR_PARAMS
  }

  fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
    check_param_names(Self::pattern_kind(), STAR_PARAMS, params)?;
    Ok(Self {
      star_body_factor: get_ratio(STAR_PARAMS, params, "star_body_factor")?,
      penetration: get_ratio(STAR_PARAMS, params, "penetration")?,
    })
  }
}

impl PatternDetector for EveningStarDetector {
  fn kind(&self) -> PatternKind {
    PatternKind::EveningStar
  }

  fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
    let [first, star, third] = window else {
      return None;
    };

    if !first.is_bullish() || !third.is_bearish() {
      return None;
    }
    let first_body = first.body();
    if !is_body_long(first_body, first.range(), helpers::BODY_LONG_RATIO) {
      return None;
    }
    if star.body() > first_body * self.star_body_factor.get() {
      return None;
    }
    if star.body_top() <= first.close() {
      return None;
    }
    if third.close() >= first.close() - first_body * self.penetration.get() {
      return None;
    }

    let depth = ((first.close() - third.close()) / first_body).min(1.0);
    Some(PatternSignal::new(Direction::Bearish, depth))
  }
}

// ============================================================
// THREE WHITE SOLDIERS / THREE BLACK CROWS
// ============================================================

const ADVANCE_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
  "max_shadow_ratio",
  helpers::SHADOW_SHORT_RATIO,
  (0.0, 0.5),
  "Longest closing-side shadow, as a share of the range",
)];

/// Shared shape of soldiers and crows: three candles of one color, each
/// closing further in that direction and opening inside the prior body, with
/// a short shadow on the closing side.
fn steady_advance<T: OHLCV>(window: &[T], direction: Direction, max_shadow: f64) -> Option<f64> {
  let [first, second, third] = window else {
    return None;
  };

  for bar in [first, second, third] {
    if bar.candle_direction() != direction {
      return None;
    }
    // Real bodies, not spinning tops
    if is_body_short(bar.body(), bar.range(), helpers::BODY_SHORT_RATIO) {
      return None;
    }
    let closing_shadow = match direction {
      Direction::Bullish => bar.upper_shadow_ratio()?,
      _ => bar.lower_shadow_ratio()?,
    };
    if closing_shadow > max_shadow {
      return None;
    }
  }

  for (prev, curr) in [(first, second), (second, third)] {
    let advances = match direction {
      Direction::Bullish => curr.close() > prev.close(),
      _ => curr.close() < prev.close(),
    };
    let opens_inside = curr.open() >= prev.body_bottom() && curr.open() <= prev.body_top();
    if !advances || !opens_inside {
      return None;
    }
  }

  Some(mean_body_ratio(window))
}

/// Three White Soldiers - three advancing white candles
#[derive(Debug, Clone, Copy)]
pub struct ThreeWhiteSoldiersDetector {
  pub max_shadow_ratio: Ratio,
}

impl Default for ThreeWhiteSoldiersDetector {
  fn default() -> Self {
    Self {
      max_shadow_ratio: Ratio::new_const(helpers::SHADOW_SHORT_RATIO),
    }
  }
}

impl ParameterizedDetector for ThreeWhiteSoldiersDetector {
  fn pattern_kind() -> PatternKind {
    PatternKind::ThreeWhiteSoldiers
  }

  fn param_meta() -> &'static [ParamMeta] {
    ADVANCE_PARAMS
  }

  fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
    check_param_names(Self::pattern_kind(), ADVANCE_PARAMS, params)?;
    Ok(Self {
      max_shadow_ratio: get_ratio(ADVANCE_PARAMS, params, "max_shadow_ratio")?,
    })
  }
}

impl PatternDetector for ThreeWhiteSoldiersDetector {
  fn kind(&self) -> PatternKind {
    PatternKind::ThreeWhiteSoldiers
  }

  fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
    let strength = steady_advance(window, Direction::Bullish, self.max_shadow_ratio.get())?;
    Some(PatternSignal::new(Direction::Bullish, strength))
  }
}

/// Three Black Crows - three declining black candles
#[derive(Debug, Clone, Copy)]
pub struct ThreeBlackCrowsDetector {
  pub max_shadow_ratio: Ratio,
}

impl Default for ThreeBlackCrowsDetector {
  fn default() -> Self {
    Self {
      max_shadow_ratio: Ratio::new_const(helpers::SHADOW_SHORT_RATIO),
    }
  }
}

impl ParameterizedDetector for ThreeBlackCrowsDetector {
  fn pattern_kind() -> PatternKind {
    PatternKind::ThreeBlackCrows
  }

  fn param_meta() -> &'static [ParamMeta] {
    ADVANCE_PARAMS
  }

  fn with_params(params: &HashMap<String, f64>) -> Result<Self> {
    check_param_names(Self::pattern_kind(), ADVANCE_PARAMS, params)?;
    Ok(Self {
      max_shadow_ratio: get_ratio(ADVANCE_PARAMS, params, "max_shadow_ratio")?,
    })
  }
}

impl PatternDetector for ThreeBlackCrowsDetector {
  fn kind(&self) -> PatternKind {
    PatternKind::ThreeBlackCrows
  }

  fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
    let strength = steady_advance(window, Direction::Bearish, self.max_shadow_ratio.get())?;
    Some(PatternSignal::new(Direction::Bearish, strength))
  }
}
