//! Common helper functions for candlestick pattern detection
//!
//! Every threshold here is a proportion of the candles inside the window, so a
//! predicate's answer never depends on bars outside it.

use crate::{OHLCVExt, OHLCV};

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Body is doji-like: body <= range * DOJI_RATIO
pub const DOJI_RATIO: f64 = 0.1;
/// Body is short: body <= range * BODY_SHORT_RATIO
pub const BODY_SHORT_RATIO: f64 = 0.3;
/// Body is long: body >= range * BODY_LONG_RATIO
pub const BODY_LONG_RATIO: f64 = 0.6;
/// Long shadow: shadow >= body * SHADOW_LONG_FACTOR
pub const SHADOW_LONG_FACTOR: f64 = 2.0;
/// Shadow is very short: shadow <= range * SHADOW_VERYSHORT_RATIO
pub const SHADOW_VERYSHORT_RATIO: f64 = 0.05;
/// Upper shadows of consecutive soldiers/crows stay below this share of range
pub const SHADOW_SHORT_RATIO: f64 = 0.3;
/// Star body must not exceed this share of the first candle's body
pub const STAR_BODY_FACTOR: f64 = 0.5;
/// Piercing / dark cloud: minimum penetration into the prior body
pub const PENETRATION: f64 = 0.5;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// Check if body is doji-like.
/// A zero body is always a doji, including on a flat bar.
#[inline]
pub fn is_doji(body: f64, range: f64, max_ratio: f64) -> bool {
    if body <= 0.0 {
        return true;
    }
    range > 0.0 && body / range <= max_ratio
}

/// Check if body is short relative to its own range
#[inline]
pub fn is_body_short(body: f64, range: f64, max_ratio: f64) -> bool {
    range > 0.0 && body / range <= max_ratio
}

/// Check if body is long relative to its own range
#[inline]
pub fn is_body_long(body: f64, range: f64, min_ratio: f64) -> bool {
    range > 0.0 && body / range >= min_ratio
}

/// Shadow at least `factor` times the body, and non-zero
#[inline]
pub fn is_shadow_long(shadow: f64, body: f64, factor: f64) -> bool {
    shadow > 0.0 && shadow >= body * factor
}

/// Shadow within `max_ratio` of the range
#[inline]
pub fn is_shadow_very_short(shadow: f64, range: f64, max_ratio: f64) -> bool {
    if range > 0.0 {
        shadow / range <= max_ratio
    } else {
        shadow <= 0.0
    }
}

/// `inner`'s real body lies within `outer`'s real body
#[inline]
pub fn body_inside<T: OHLCV>(inner: &T, outer: &T) -> bool {
    inner.body_top() <= outer.body_top() && inner.body_bottom() >= outer.body_bottom()
}

/// `a / b`, or `fallback` when `b` is not meaningfully positive
#[inline]
pub fn safe_ratio(a: f64, b: f64, fallback: f64) -> f64 {
    if b > f64::EPSILON {
        a / b
    } else {
        fallback
    }
}

/// Mean body-to-range ratio of a window, flat bars counting as zero
#[inline]
pub fn mean_body_ratio<T: OHLCV>(bars: &[T]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    bars.iter().map(|b| b.body_ratio().unwrap_or(0.0)).sum::<f64>() / bars.len() as f64
}
