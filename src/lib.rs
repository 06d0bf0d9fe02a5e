//! # candlecast - daily OHLCV analysis
//!
//! Turns a validated series of daily bars into weekly/monthly trend summaries,
//! candlestick pattern matches and a next-session direction estimate.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlecast::prelude::*;
//! use chrono::{Days, NaiveDate};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let bars: Vec<Bar> = (0..30u64)
//!     .map(|i| {
//!         let price = 100.0 + i as f64;
//!         Bar::new(start + Days::new(i), price, price + 1.5, price - 0.5, price + 1.0, 1_000)
//!     })
//!     .collect();
//!
//! let series = BarSeries::new("PETR4", bars)?;
//! let analyzer = Analyzer::from_config(&AnalysisConfig::default())?;
//! let report = analyzer.analyze(&series)?;
//!
//! assert!(report.probability.p_up > 0.5);
//! # Ok::<(), candlecast::AnalysisError>(())
//! ```

use std::{fmt, str::FromStr};

use chrono::NaiveDate;

pub mod analysis;
pub mod calendar;
pub mod config;
pub mod detectors;
pub mod indicators;
pub mod params;
pub mod probability;
pub mod series;
pub mod trend;

pub mod prelude {
    pub use crate::{
        // Orchestration
        analysis::{analyze_parallel, AnalysisFailure, AnalysisReport, Analyzer},
        // Calendar
        calendar::{session_gaps, Market, MarketCalendar, PeriodKind, SessionGap, TradingCalendar},
        // Configuration
        config::{AnalysisConfig, SignalWeights},
        // Detectors
        detectors::*,
        params::{ParamMeta, ParamType, ParameterizedDetector},
        // Estimation
        indicators::{IndicatorConfig, Indicators, VolatilityState},
        probability::{
            EstimatorConfig, FeatureName, FeatureVector, HistoricalAnalogModel, LogisticModel,
            ProbabilityEstimator, ProbabilityModel, ProbabilityReport, Score, SessionState,
        },
        // Data
        series::{Bar, BarSeries},
        trend::{TrendAggregator, TrendSummary},
        // Pattern scanning
        detect,
        trailing_matches,
        AnalysisError,
        BuiltinDetector,
        CatalogBuilder,
        Direction,
        OHLCVExt,
        PatternCatalog,
        PatternDetector,
        PatternKind,
        PatternMatch,
        PatternSignal,
        Period,
        Ratio,
        Result,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised anywhere in the analysis pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid bar at index {index} ({date}): {reason}")]
    InvalidBar {
        index: usize,
        date: NaiveDate,
        reason: &'static str,
    },

    #[error("Insufficient data: need {need} {what}, got {got}")]
    InsufficientData {
        what: &'static str,
        need: usize,
        got: usize,
    },

    #[error("Unknown pattern: {0}")]
    UnknownPattern(String),

    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    Config(String),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// A fraction in `[0, 1]`, used for thresholds and strengths
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Rejects NaN, infinities and anything outside `[0, 1]`
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio".to_string(),
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// A non-zero number of bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Price and volume accessors for anything bar-shaped
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Candle geometry derived from [`OHLCV`], implemented for every bar type
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.body_top()
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.body_bottom() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    #[inline]
    fn upper_shadow_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.upper_shadow() / range)
    }

    #[inline]
    fn lower_shadow_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.lower_shadow() / range)
    }

    /// Direction of a single candle by color
    #[inline]
    fn candle_direction(&self) -> Direction {
        if self.is_bullish() {
            Direction::Bullish
        } else if self.is_bearish() {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    /// First broken price invariant, if any
    fn invariant_violation(&self) -> Option<&'static str> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Some("NaN in OHLC");
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Some("infinite value in OHLC");
        }
        if prices.iter().any(|p| *p <= 0.0) {
            return Some("non-positive price");
        }
        if self.low() > self.high() {
            return Some("low > high");
        }
        if self.low() > self.body_bottom() {
            return Some("low above open/close");
        }
        if self.body_top() > self.high() {
            return Some("open/close above high");
        }
        if self.volume().is_sign_negative() {
            return Some("negative volume");
        }
        None
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

// ============================================================
// PATTERN KINDS
// ============================================================

/// Which way a pattern points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    /// +1 bullish, -1 bearish, 0 neutral
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Neutral => 0.0,
            Direction::Bearish => -1.0,
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Neutral => Direction::Neutral,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

/// Generates the closed [`PatternKind`] enum with its catalog name and window size.
macro_rules! define_pattern_kinds {
    ($($variant:ident => $name:literal, $window:literal;)*) => {
        /// Every pattern the catalog knows about
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(rename_all = "snake_case")]
        pub enum PatternKind {
            $($variant),*
        }

        impl PatternKind {
            /// All kinds in default registration order
            pub const ALL: &'static [PatternKind] = &[$(PatternKind::$variant),*];

            /// Catalog name, as accepted by [`FromStr`]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(PatternKind::$variant => $name),*
                }
            }

            /// Number of consecutive bars the pattern inspects
            pub const fn window(self) -> usize {
                match self {
                    $(PatternKind::$variant => $window),*
                }
            }
        }

        impl FromStr for PatternKind {
            type Err = AnalysisError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok(PatternKind::$variant),)*
                    _ => Err(AnalysisError::UnknownPattern(s.to_string())),
                }
            }
        }
    };
}

define_pattern_kinds! {
    Doji => "doji", 1;
    Hammer => "hammer", 1;
    ShootingStar => "shooting_star", 1;
    Marubozu => "marubozu", 1;
    SpinningTop => "spinning_top", 1;
    InvertedHammer => "inverted_hammer", 2;
    Engulfing => "engulfing", 2;
    Harami => "harami", 2;
    Piercing => "piercing", 2;
    DarkCloudCover => "dark_cloud_cover", 2;
    InsideBar => "inside_bar", 2;
    OutsideBar => "outside_bar", 2;
    MorningStar => "morning_star", 3;
    EveningStar => "evening_star", 3;
    ThreeWhiteSoldiers => "three_white_soldiers", 3;
    ThreeBlackCrows => "three_black_crows", 3;
    RisingThreeMethods => "rising_three_methods", 5;
    FallingThreeMethods => "falling_three_methods", 5;
}

impl PatternKind {
    /// Direction the pattern reports whenever it matches.
    ///
    /// `None` for patterns whose direction follows the candles that formed
    /// them (an engulfing can be either color).
    pub fn typical_direction(self) -> Option<Direction> {
        match self {
            PatternKind::Hammer
            | PatternKind::InvertedHammer
            | PatternKind::Piercing
            | PatternKind::MorningStar
            | PatternKind::ThreeWhiteSoldiers
            | PatternKind::RisingThreeMethods => Some(Direction::Bullish),
            PatternKind::ShootingStar
            | PatternKind::DarkCloudCover
            | PatternKind::EveningStar
            | PatternKind::ThreeBlackCrows
            | PatternKind::FallingThreeMethods => Some(Direction::Bearish),
            PatternKind::Doji | PatternKind::SpinningTop | PatternKind::InsideBar => {
                Some(Direction::Neutral)
            }
            PatternKind::Marubozu
            | PatternKind::Engulfing
            | PatternKind::Harami
            | PatternKind::OutsideBar => None,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// PATTERN MATCH
// ============================================================

/// What a predicate reports for a matching window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSignal {
    pub direction: Direction,
    /// Quality score 0.0..=1.0
    pub strength: f64,
}

impl PatternSignal {
    /// Strength is clamped to [0, 1]; NaN becomes 0
    #[inline]
    pub fn new(direction: Direction, strength: f64) -> Self {
        let strength = if strength.is_nan() {
            0.0
        } else {
            strength.clamp(0.0, 1.0)
        };
        Self {
            direction,
            strength,
        }
    }
}

/// One detected pattern occurrence - Copy, no allocations
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PatternMatch {
    pub pattern: PatternKind,
    /// First bar of the window (position in the series)
    pub window_start_index: usize,
    /// Last bar of the window, inclusive
    pub window_end_index: usize,
    pub direction: Direction,
    /// Quality score 0.0..=1.0
    pub strength: f64,
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// A pure predicate over a fixed-size window of bars
pub trait PatternDetector: Send + Sync {
    fn kind(&self) -> PatternKind;

    /// Window length; defaults to the kind's window
    fn window(&self) -> usize {
        self.kind().window()
    }

    /// `window` holds exactly [`PatternDetector::window`] bars, oldest first
    fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// DETECTOR DISPATCH
// ============================================================

use detectors::*;
use params::ParameterizedDetector;

/// One variant per [`PatternKind`], with the same variant names.
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// Static dispatch over every detector type
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            /// Detector for `kind` with default thresholds
            pub fn from_kind(kind: PatternKind) -> Self {
                match kind {
                    $(PatternKind::$variant => Self::$variant(<$detector>::default())),*
                }
            }

            /// Detector for `kind` with thresholds overridden by `params`
            pub fn from_kind_with_params(
                kind: PatternKind,
                params: &std::collections::HashMap<String, f64>,
            ) -> Result<Self> {
                Ok(match kind {
                    $(PatternKind::$variant => {
                        Self::$variant(<$detector as ParameterizedDetector>::with_params(params)?)
                    }),*
                })
            }

            #[inline]
            pub fn detect<T: OHLCV>(&self, window: &[T]) -> Option<PatternSignal> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, window)),*
                }
            }

            #[inline]
            pub fn kind(&self) -> PatternKind {
                match self {
                    $(Self::$variant(d) => PatternDetector::kind(d)),*
                }
            }

            #[inline]
            pub fn window(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::window(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    // Single bar
    Doji(DojiDetector),
    Hammer(HammerDetector),
    ShootingStar(ShootingStarDetector),
    Marubozu(MarubozuDetector),
    SpinningTop(SpinningTopDetector),

    // Two bar
    InvertedHammer(InvertedHammerDetector),
    Engulfing(EngulfingDetector),
    Harami(HaramiDetector),
    Piercing(PiercingDetector),
    DarkCloudCover(DarkCloudCoverDetector),
    InsideBar(InsideBarDetector),
    OutsideBar(OutsideBarDetector),

    // Three bar
    MorningStar(MorningStarDetector),
    EveningStar(EveningStarDetector),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector),
    ThreeBlackCrows(ThreeBlackCrowsDetector),

    // Five bar
    RisingThreeMethods(RisingThreeMethodsDetector),
    FallingThreeMethods(FallingThreeMethodsDetector),
}

// ============================================================
// PATTERN CATALOG
// ============================================================

/// Ordered set of detectors. Registration order breaks ties between matches
/// that start on the same bar.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    detectors: Vec<BuiltinDetector>,
    min_strength: Option<f64>,
}

impl PatternCatalog {
    /// Every builtin pattern with default thresholds
    pub fn all_defaults() -> Self {
        Self {
            detectors: PatternKind::ALL
                .iter()
                .map(|k| BuiltinDetector::from_kind(*k))
                .collect(),
            min_strength: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Kinds in registration order
    pub fn kinds(&self) -> impl Iterator<Item = PatternKind> + '_ {
        self.detectors.iter().map(BuiltinDetector::kind)
    }

    /// Largest window of any registered detector
    pub fn max_window(&self) -> usize {
        self.detectors.iter().map(BuiltinDetector::window).max().unwrap_or(0)
    }

    /// Scan every window position of `bars`, left to right.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternMatch> {
        self.scan_range(bars, 0..bars.len())
    }

    /// Scan windows lying fully inside `range`. Indices stay relative to `bars`.
    ///
    /// Output is ordered by window start, then by registration order.
    pub fn scan_range<T: OHLCV>(
        &self,
        bars: &[T],
        range: std::ops::Range<usize>,
    ) -> Vec<PatternMatch> {
        let end = range.end.min(bars.len());
        let mut results = Vec::new();

        for start in range.start..end {
            for detector in &self.detectors {
                let size = detector.window();
                if size == 0 || start + size > end {
                    continue;
                }
                if let Some(signal) = detector.detect(&bars[start..start + size]) {
                    let m = PatternMatch {
                        pattern: detector.kind(),
                        window_start_index: start,
                        window_end_index: start + size - 1,
                        direction: signal.direction,
                        strength: signal.strength,
                    };
                    if self.should_include(&m) {
                        results.push(m);
                    }
                }
            }
        }

        tracing::trace!(
            detectors = self.detectors.len(),
            start = range.start,
            end,
            matches = results.len(),
            "pattern scan finished"
        );
        results
    }

    fn should_include(&self, m: &PatternMatch) -> bool {
        match self.min_strength {
            Some(min) => m.strength >= min,
            None => true,
        }
    }

    fn validate(&self) -> Result<()> {
        for d in &self.detectors {
            d.validate_config()?;
        }
        if let Some(min) = self.min_strength {
            Ratio::new(min)?;
        }
        Ok(())
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::all_defaults()
    }
}

/// Scan the whole series against `catalog`.
pub fn detect(series: &series::BarSeries, catalog: &PatternCatalog) -> Vec<PatternMatch> {
    catalog.scan(series.bars())
}

/// Matches of a full scan whose window lies inside the last `n` of `len` bars.
///
/// Same result as scanning only that range, without a second pass.
pub fn trailing_matches(matches: &[PatternMatch], len: usize, n: usize) -> Vec<PatternMatch> {
    let start = len.saturating_sub(n);
    matches
        .iter()
        .filter(|m| m.window_start_index >= start)
        .copied()
        .collect()
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`PatternCatalog`]
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    detectors: Vec<BuiltinDetector>,
    min_strength: Option<f64>,
}

/// `[BuiltinDetector; N]` with default thresholds
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole catalog, in [`PatternKind::ALL`] order
    pub fn with_all_defaults(self) -> Self {
        self.with_single_bar_defaults()
            .with_two_bar_defaults()
            .with_three_bar_defaults()
            .with_multi_bar_defaults()
    }

    /// Add single-bar patterns with defaults (5)
    pub fn with_single_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            Doji,
            Hammer,
            ShootingStar,
            Marubozu,
            SpinningTop,
        ]);
        self
    }

    /// Add two-bar patterns with defaults (7)
    pub fn with_two_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            InvertedHammer,
            Engulfing,
            Harami,
            Piercing,
            DarkCloudCover,
            InsideBar,
            OutsideBar,
        ]);
        self
    }

    /// Add three-bar patterns with defaults (4)
    pub fn with_three_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            MorningStar,
            EveningStar,
            ThreeWhiteSoldiers,
            ThreeBlackCrows,
        ]);
        self
    }

    /// Add five-bar patterns with defaults (2)
    pub fn with_multi_bar_defaults(mut self) -> Self {
        self.detectors
            .extend(builtin_defaults![RisingThreeMethods, FallingThreeMethods]);
        self
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Like [`CatalogBuilder::add`] but validates thresholds first
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.detectors.push(detector);
        Ok(self)
    }

    /// Add a pattern by catalog name, e.g. `"morning_star"`
    pub fn add_named(self, name: &str) -> Result<Self> {
        let kind: PatternKind = name.parse()?;
        Ok(self.add(BuiltinDetector::from_kind(kind)))
    }

    /// Drop matches weaker than `strength` (must be a valid [`Ratio`])
    pub fn min_strength(mut self, strength: f64) -> Self {
        self.min_strength = Some(strength);
        self
    }

    pub fn build(self) -> Result<PatternCatalog> {
        let catalog = PatternCatalog {
            detectors: self.detectors,
            min_strength: self.min_strength,
        };
        catalog.validate()?;
        Ok(catalog)
    }
}

// ============================================================
// TESTS
// ============================================================
