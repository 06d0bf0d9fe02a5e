//! Candlestick pattern detectors
//!
//! Each detector is a pure predicate over a window of consecutive bars.
//!
//! # Pattern Categories
//!
//! - **Single-bar (5)**: Doji, Hammer, Shooting Star, Marubozu, Spinning Top
//! - **Two-bar (7)**: Inverted Hammer, Engulfing, Harami, Piercing, Dark Cloud Cover,
//!   Inside Bar, Outside Bar
//! - **Three-bar (4)**: Morning/Evening Star, Three White Soldiers, Three Black Crows
//! - **Five-bar (2)**: Rising/Falling Three Methods

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

/// Implement [`crate::params::ParameterizedDetector`] for detectors without tunable thresholds.
macro_rules! impl_fixed_params {
  ($($detector:ty => $kind:ident),* $(,)?) => {
    $(impl $crate::params::ParameterizedDetector for $detector {
      fn pattern_kind() -> $crate::PatternKind { $crate::PatternKind::$kind }
    })*
  };
}

pub mod multi_bar;
pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

// Re-export all detectors for convenience
pub use helpers::*;
pub use multi_bar::*;
pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;
