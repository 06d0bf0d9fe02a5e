//! Next-session direction estimate.
//!
//! The estimator turns a series, its trend summaries and recent pattern
//! matches into a [`FeatureVector`], hands it to a [`ProbabilityModel`] and
//! wraps the result in a [`ProbabilityReport`]. Missing evidence shows up as
//! low confidence, never as a made-up probability.
//!
//! Two models ship with the crate: [`LogisticModel`] scores the feature vector
//! directly, [`HistoricalAnalogModel`] looks up how the session after similar
//! past sessions closed.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    calendar::TradingCalendar,
    config::SignalWeights,
    indicators::{trend_state, IndicatorConfig, Indicators, VolatilityState, RSI_NEUTRAL},
    series::BarSeries,
    trend::TrendSummary,
    AnalysisError, Direction, OHLCVExt, PatternKind, PatternMatch, Period, Result,
};

/// Floor for the volatility used to normalize return features.
pub const MIN_VOLATILITY: f64 = 1e-4;

/// Logit clamp; keeps probabilities away from exactly 0 and 1.
const MAX_LOGIT: f64 = 8.0;

// ============================================================
// FEATURES
// ============================================================

/// Named inputs of the estimate, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    TrendPctChange,
    Volatility,
    MeanReturn,
    PatternBias,
    Rsi,
    MacdHist,
    Atr,
}

impl FeatureName {
    pub const ALL: [FeatureName; 7] = [
        FeatureName::TrendPctChange,
        FeatureName::Volatility,
        FeatureName::MeanReturn,
        FeatureName::PatternBias,
        FeatureName::Rsi,
        FeatureName::MacdHist,
        FeatureName::Atr,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            FeatureName::TrendPctChange => "trend_pct_change",
            FeatureName::Volatility => "volatility",
            FeatureName::MeanReturn => "mean_return",
            FeatureName::PatternBias => "pattern_bias",
            FeatureName::Rsi => "rsi",
            FeatureName::MacdHist => "macd_hist",
            FeatureName::Atr => "atr",
        }
    }

    /// Value at which the feature says nothing.
    pub const fn neutral_value(self) -> f64 {
        match self {
            FeatureName::Rsi => RSI_NEUTRAL,
            _ => 0.0,
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw estimator inputs. `None` means the feature could not be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    /// `pct_change` of the most recent trend summary
    pub trend_pct_change: Option<f64>,
    /// Sample standard deviation of daily returns over the lookback window
    pub volatility: Option<f64>,
    /// Mean daily return over the lookback window
    pub mean_return: Option<f64>,
    /// Strength-weighted net direction of recent matches, in [-1, 1]
    pub pattern_bias: Option<f64>,
    /// Wilder RSI of the last bar, 0..=100
    pub rsi: Option<f64>,
    /// MACD histogram of the last bar, in price units
    pub macd_hist: Option<f64>,
    /// Wilder ATR of the last bar, in price units
    pub atr: Option<f64>,
}

impl FeatureVector {
    pub fn get(&self, name: FeatureName) -> Option<f64> {
        match name {
            FeatureName::TrendPctChange => self.trend_pct_change,
            FeatureName::Volatility => self.volatility,
            FeatureName::MeanReturn => self.mean_return,
            FeatureName::PatternBias => self.pattern_bias,
            FeatureName::Rsi => self.rsi,
            FeatureName::MacdHist => self.macd_hist,
            FeatureName::Atr => self.atr,
        }
    }

    /// A feature is default when absent or exactly at its neutral value.
    pub fn is_default(&self, name: FeatureName) -> bool {
        !matches!(self.get(name), Some(v) if v != name.neutral_value())
    }

    /// Non-default features in reporting order.
    pub fn non_default(&self) -> Vec<FeatureName> {
        FeatureName::ALL
            .into_iter()
            .filter(|name| !self.is_default(*name))
            .collect()
    }

    /// Share of features that carry information.
    pub fn completeness(&self) -> f64 {
        self.non_default().len() as f64 / FeatureName::ALL.len() as f64
    }
}

// ============================================================
// SESSION HISTORY
// ============================================================

/// Market state of one session, the key used to find historical analogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// First match ending on this session in scan order (longer windows first)
    pub pattern: Option<(PatternKind, Direction)>,
    /// Close against its moving average
    pub trend: Direction,
    pub momentum: Direction,
    pub volatility: Option<VolatilityState>,
    /// Close above open
    pub bullish: bool,
}

impl SessionState {
    /// Same trend, momentum and volatility as `today`, and the same pattern
    /// when `today` has one.
    pub fn is_analog_of(&self, today: &SessionState) -> bool {
        today.pattern.map_or(true, |p| self.pattern == Some(p))
            && self.trend == today.trend
            && self.momentum == today.momentum
            && self.volatility == today.volatility
    }
}

// ============================================================
// MODELS
// ============================================================

/// Model output before the estimator applies sample sufficiency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub p_up: f64,
    pub confidence: f64,
}

impl Score {
    /// Nothing to go on
    pub const NO_SIGNAL: Score = Score {
        p_up: 0.5,
        confidence: 0.0,
    };
}

/// Scoring capability behind the estimator.
///
/// Implementations must be deterministic and keep `p_up` within [0, 1].
/// `history` holds one state per bar, the last one being the session scored.
pub trait ProbabilityModel: Send + Sync {
    fn score(&self, features: &FeatureVector, history: &[SessionState]) -> Score;
}

/// Logistic model over volatility-normalized return features and momentum.
///
/// Non-decreasing in every directional feature.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogisticModel {
    pub weights: SignalWeights,
}

impl LogisticModel {
    pub fn new(weights: SignalWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Linear score before the logistic map.
    pub fn logit(&self, features: &FeatureVector) -> f64 {
        let scale = features.volatility.unwrap_or(0.0).max(MIN_VOLATILITY);
        let w = &self.weights;
        let rsi = (features.rsi.unwrap_or(RSI_NEUTRAL) - RSI_NEUTRAL) / RSI_NEUTRAL;
        let macd = match (features.macd_hist, features.atr) {
            (Some(hist), Some(atr)) if atr > 0.0 => (hist / atr).clamp(-1.0, 1.0),
            _ => 0.0,
        };
        let z = w.trend * features.trend_pct_change.unwrap_or(0.0) / scale
            + w.drift * features.mean_return.unwrap_or(0.0) / scale
            + w.pattern * features.pattern_bias.unwrap_or(0.0)
            + w.momentum * (rsi + macd);
        if z.is_nan() {
            0.0
        } else {
            z.clamp(-MAX_LOGIT, MAX_LOGIT)
        }
    }
}

impl ProbabilityModel for LogisticModel {
    fn score(&self, features: &FeatureVector, _history: &[SessionState]) -> Score {
        let z = self.logit(features);
        Score {
            p_up: 1.0 / (1.0 + (-z).exp()),
            confidence: features.completeness(),
        }
    }
}

/// Share of bullish next sessions after past sessions in the same state.
///
/// Confidence grows with the number of analogs found, reaching 1 at
/// `full_confidence_samples`. With no analog the score is [`Score::NO_SIGNAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoricalAnalogModel {
    pub full_confidence_samples: usize,
}

impl Default for HistoricalAnalogModel {
    fn default() -> Self {
        Self {
            full_confidence_samples: 30,
        }
    }
}

impl HistoricalAnalogModel {
    /// `(analogs, bullish next sessions)` for the last session of `history`.
    pub fn analogs(&self, history: &[SessionState]) -> (usize, usize) {
        let Some((today, past)) = history.split_last() else {
            return (0, 0);
        };
        past.iter()
            .zip(&history[1..])
            .filter(|(state, _)| state.is_analog_of(today))
            .fold((0, 0), |(n, up), (_, next)| (n + 1, up + usize::from(next.bullish)))
    }
}

impl ProbabilityModel for HistoricalAnalogModel {
    fn score(&self, _features: &FeatureVector, history: &[SessionState]) -> Score {
        let (n, up) = self.analogs(history);
        if n == 0 {
            return Score::NO_SIGNAL;
        }
        Score {
            p_up: up as f64 / n as f64,
            confidence: (n as f64 / self.full_confidence_samples.max(1) as f64).min(1.0),
        }
    }
}

// ============================================================
// ESTIMATOR
// ============================================================

/// Window sizes of the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Minimum history, and the window volatility and mean return cover
    pub lookback_window: Period,
    /// Matches ending within this many final bars count toward the bias
    pub signal_window: Period,
    /// Trend summaries needed for full confidence
    pub full_confidence_periods: Period,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            lookback_window: Period::new_const(20),
            signal_window: Period::new_const(5),
            full_confidence_periods: Period::new_const(4),
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        let lookback = self.lookback_window.get();
        if lookback < 2 {
            return Err(AnalysisError::OutOfRange {
                field: "lookback_window".to_string(),
                value: lookback as f64,
                min: 2.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

/// Result of one estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityReport {
    /// Date of the last bar
    pub as_of_date: NaiveDate,
    /// Next trading session after `as_of_date`
    pub target_date: NaiveDate,
    pub p_up: f64,
    pub p_down: f64,
    pub confidence: f64,
    pub contributing_signals: Vec<FeatureName>,
    pub features: FeatureVector,
    /// RSI and MACD histogram of the last bar, when they agree
    pub momentum_state: Direction,
    /// ATR of the last bar against the series' median ATR
    pub volatility_state: Option<VolatilityState>,
}

/// Builds features and delegates scoring to a [`ProbabilityModel`].
#[derive(Debug, Clone, Default)]
pub struct ProbabilityEstimator<M: ProbabilityModel = LogisticModel> {
    config: EstimatorConfig,
    indicators: IndicatorConfig,
    model: M,
}

impl<M: ProbabilityModel> ProbabilityEstimator<M> {
    pub fn new(config: EstimatorConfig, model: M) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            indicators: IndicatorConfig::default(),
            model,
        })
    }

    /// Replace the indicator periods.
    pub fn with_indicators(mut self, indicators: IndicatorConfig) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Derive the feature vector without scoring it.
    pub fn features(
        &self,
        series: &BarSeries,
        summaries: &[TrendSummary],
        matches: &[PatternMatch],
    ) -> FeatureVector {
        let indicators = Indicators::compute(series.bars(), &self.indicators);
        self.features_with(series, &indicators, summaries, matches)
    }

    /// One [`SessionState`] per bar. `matches` should cover the whole series.
    pub fn history(&self, series: &BarSeries, matches: &[PatternMatch]) -> Vec<SessionState> {
        let indicators = Indicators::compute(series.bars(), &self.indicators);
        self.history_with(series, &indicators, matches)
    }

    fn history_with(
        &self,
        series: &BarSeries,
        indicators: &Indicators,
        matches: &[PatternMatch],
    ) -> Vec<SessionState> {
        let mut patterns: Vec<Option<(PatternKind, Direction)>> = vec![None; series.len()];
        for m in matches {
            if let Some(slot) = patterns.get_mut(m.window_end_index) {
                slot.get_or_insert((m.pattern, m.direction));
            }
        }

        series
            .iter()
            .zip(patterns)
            .enumerate()
            .map(|(i, (bar, pattern))| SessionState {
                pattern,
                trend: trend_state(bar.close, indicators.trend_average[i]),
                momentum: indicators.momentum_at(i),
                volatility: indicators.volatility_at(i),
                bullish: bar.is_bullish(),
            })
            .collect()
    }

    fn features_with(
        &self,
        series: &BarSeries,
        indicators: &Indicators,
        summaries: &[TrendSummary],
        matches: &[PatternMatch],
    ) -> FeatureVector {
        let returns = series.trailing_returns(self.config.lookback_window.get());
        let (mean_return, volatility) = mean_and_std(&returns);

        let horizon = series.len().saturating_sub(self.config.signal_window.get());
        let recent = matches.iter().filter(|m| m.window_end_index >= horizon);

        FeatureVector {
            trend_pct_change: summaries.last().map(|s| s.pct_change),
            volatility,
            mean_return,
            pattern_bias: pattern_bias(recent),
            rsi: indicators.rsi.last().copied().flatten(),
            macd_hist: indicators.macd_hist.last().copied(),
            atr: indicators.atr.last().copied().flatten(),
        }
    }

    /// Estimate the direction of the session after the last bar.
    ///
    /// Needs at least one trend summary and `lookback_window` bars. Models
    /// that use the session history expect `matches` over the whole series;
    /// the pattern bias only looks at the last `signal_window` bars anyway.
    pub fn estimate<C: TradingCalendar + ?Sized>(
        &self,
        calendar: &C,
        series: &BarSeries,
        summaries: &[TrendSummary],
        matches: &[PatternMatch],
    ) -> Result<ProbabilityReport> {
        if summaries.is_empty() {
            return Err(AnalysisError::InsufficientData {
                what: "trend summaries",
                need: 1,
                got: 0,
            });
        }
        let need = self.config.lookback_window.get();
        let last = match series.last() {
            Some(bar) if series.len() >= need => bar,
            _ => {
                return Err(AnalysisError::InsufficientData {
                    what: "bars",
                    need,
                    got: series.len(),
                })
            }
        };

        let indicators = Indicators::compute(series.bars(), &self.indicators);
        let features = self.features_with(series, &indicators, summaries, matches);
        let history = self.history_with(series, &indicators, matches);
        let contributing_signals = features.non_default();
        let last_index = series.len() - 1;

        let (p_up, confidence) = if contributing_signals.is_empty() {
            (Score::NO_SIGNAL.p_up, Score::NO_SIGNAL.confidence)
        } else {
            let score = self.model.score(&features, &history);
            let p_up = if score.p_up.is_nan() { 0.5 } else { score.p_up.clamp(0.0, 1.0) };
            let sufficiency =
                (summaries.len() as f64 / self.config.full_confidence_periods.get() as f64).min(1.0);
            let confidence = if score.confidence.is_nan() {
                0.0
            } else {
                score.confidence.clamp(0.0, 1.0) * sufficiency
            };
            (p_up, confidence)
        };

        tracing::debug!(
            symbol = series.symbol(),
            as_of = %last.date,
            p_up,
            confidence,
            signals = contributing_signals.len(),
            "probability estimated"
        );

        Ok(ProbabilityReport {
            as_of_date: last.date,
            target_date: calendar.next_trading_day(last.date),
            p_up,
            p_down: 1.0 - p_up,
            confidence,
            contributing_signals,
            features,
            momentum_state: indicators.momentum_at(last_index),
            volatility_state: indicators.volatility_at(last_index),
        })
    }
}

/// Mean and sample standard deviation; `None` where undefined.
fn mean_and_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (Some(mean), None);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (Some(mean), Some(var.sqrt()))
}

/// Σ(sign·strength) / Σ(strength); neutral matches only dilute.
fn pattern_bias<'a>(matches: impl Iterator<Item = &'a PatternMatch>) -> Option<f64> {
    let (signed, total) = matches.fold((0.0, 0.0), |(signed, total), m| {
        (signed + m.direction.sign() * m.strength, total + m.strength)
    });
    (total > 0.0).then(|| signed / total)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calendar::{Market, MarketCalendar, PeriodKind},
        series::Bar,
        trend::TrendAggregator,
    };
    use chrono::Days;

    fn start() -> NaiveDate {
        // Monday
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
    }

    fn series(closes: &[f64]) -> BarSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar::new(start() + Days::new(i as u64), *c, c + 1.0, c - 1.0, *c, 10))
            .collect();
        BarSeries::new("T", bars).unwrap()
    }

    /// Bars with no range at all
    fn flat(n: usize, price: f64) -> BarSeries {
        let bars = (0..n)
            .map(|i| Bar::new(start() + Days::new(i as u64), price, price, price, price, 10))
            .collect();
        BarSeries::new("F", bars).unwrap()
    }

    fn weekly(s: &BarSeries) -> Vec<TrendSummary> {
        TrendAggregator::new(MarketCalendar::new(Market::Us))
            .aggregate(s, PeriodKind::Week)
            .unwrap()
    }

    fn m(end: usize, direction: Direction, strength: f64) -> PatternMatch {
        PatternMatch {
            pattern: PatternKind::Doji,
            window_start_index: end,
            window_end_index: end,
            direction,
            strength,
        }
    }

    fn state(trend: Direction, bullish: bool) -> SessionState {
        SessionState {
            pattern: None,
            trend,
            momentum: Direction::Neutral,
            volatility: Some(VolatilityState::Normal),
            bullish,
        }
    }

    #[test]
    fn test_feature_names() {
        assert_eq!(FeatureName::PatternBias.to_string(), "pattern_bias");
        assert_eq!(FeatureName::MacdHist.as_str(), "macd_hist");
        let f = FeatureVector {
            trend_pct_change: Some(0.0),
            volatility: Some(0.02),
            mean_return: None,
            pattern_bias: Some(-0.5),
            rsi: Some(RSI_NEUTRAL),
            macd_hist: None,
            atr: Some(1.5),
        };
        assert_eq!(
            f.non_default(),
            vec![FeatureName::Volatility, FeatureName::PatternBias, FeatureName::Atr]
        );
        assert!((f.completeness() - 3.0 / 7.0).abs() < 1e-12);

        let oversold = FeatureVector { rsi: Some(0.0), ..f };
        assert!(!oversold.is_default(FeatureName::Rsi));
    }

    #[test]
    fn test_pattern_bias() {
        let matches = [
            m(0, Direction::Bullish, 0.8),
            m(1, Direction::Bearish, 0.2),
            m(2, Direction::Neutral, 1.0),
        ];
        let bias = pattern_bias(matches.iter()).unwrap();
        assert!((bias - 0.3).abs() < 1e-12);
        assert_eq!(pattern_bias(std::iter::empty()), None);
    }

    #[test]
    fn test_logistic_is_monotonic_and_bounded() {
        let model = LogisticModel::default();
        let base = FeatureVector {
            trend_pct_change: Some(0.01),
            volatility: Some(0.02),
            mean_return: Some(0.001),
            pattern_bias: Some(0.0),
            atr: Some(2.0),
            ..FeatureVector::default()
        };
        let mut prev = 0.0;
        for bias in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            let p = model.score(&FeatureVector { pattern_bias: Some(bias), ..base }, &[]).p_up;
            assert!((0.0..=1.0).contains(&p));
            assert!(p >= prev);
            prev = p;
        }

        let mut prev = 0.0;
        for (rsi, hist) in [(20.0, -1.0), (45.0, -0.1), (50.0, 0.0), (70.0, 0.5), (90.0, 3.0)] {
            let f = FeatureVector { rsi: Some(rsi), macd_hist: Some(hist), ..base };
            let p = model.score(&f, &[]).p_up;
            assert!(p >= prev);
            prev = p;
        }

        let huge = FeatureVector { mean_return: Some(1e9), ..base };
        assert!(model.score(&huge, &[]).p_up < 1.0);
    }

    #[test]
    fn test_analogs_follow_the_next_session() {
        let up = Direction::Bullish;
        let bullish = [true, true, false, true, true, false, true, true, false, true];
        let mut history: Vec<SessionState> = bullish.iter().map(|b| state(up, *b)).collect();
        // A different trend is not an analog of today
        history[0].trend = Direction::Bearish;

        let model = HistoricalAnalogModel::default();
        // Analogs are sessions 1..=8, followed by sessions 2..=9
        assert_eq!(model.analogs(&history), (8, 5));
        let score = model.score(&FeatureVector::default(), &history);
        assert!((score.p_up - 0.625).abs() < 1e-12);
        assert!((score.confidence - 8.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_analogs_match_todays_pattern() {
        let hammer = Some((PatternKind::Hammer, Direction::Bullish));
        let mut history: Vec<SessionState> = (0..6)
            .map(|i| state(Direction::Bullish, i % 2 == 0))
            .collect();
        history[1].pattern = hammer;
        history[3].pattern = Some((PatternKind::Doji, Direction::Neutral));
        history[5].pattern = hammer;

        // Only session 1 carries today's hammer; session 2 closed bullish
        let model = HistoricalAnalogModel::default();
        assert_eq!(model.analogs(&history), (1, 1));
        assert_eq!(model.score(&FeatureVector::default(), &history).p_up, 1.0);
    }

    #[test]
    fn test_no_analog_is_no_signal() {
        let mut history = vec![state(Direction::Bullish, true); 5];
        history[4].momentum = Direction::Bearish;
        let model = HistoricalAnalogModel::default();
        assert_eq!(model.score(&FeatureVector::default(), &history), Score::NO_SIGNAL);
        assert_eq!(model.score(&FeatureVector::default(), &[]), Score::NO_SIGNAL);
    }

    #[test]
    fn test_history_marks_patterns_and_trend() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let s = series(&closes);
        let est = ProbabilityEstimator::<LogisticModel>::default();
        let engulfing = PatternMatch {
            pattern: PatternKind::Engulfing,
            window_start_index: 9,
            window_end_index: 10,
            direction: Direction::Bullish,
            strength: 0.7,
        };
        let history = est.history(&s, &[engulfing, m(10, Direction::Neutral, 0.4)]);

        assert_eq!(history.len(), 30);
        assert_eq!(history[10].pattern, Some((PatternKind::Engulfing, Direction::Bullish)));
        assert_eq!(history[11].pattern, None);
        // The first close equals its own average
        assert_eq!(history[0].trend, Direction::Neutral);
        assert!(history[1..].iter().all(|s| s.trend == Direction::Bullish));
        assert!(history.iter().all(|s| !s.bullish));
    }

    #[test]
    fn test_flat_series_reports_no_signal() {
        let s = flat(25, 50.0);
        let est = ProbabilityEstimator::<LogisticModel>::default();
        let cal = MarketCalendar::new(Market::Us);
        let report = est.estimate(&cal, &s, &weekly(&s), &[]).unwrap();

        assert_eq!(report.p_up, 0.5);
        assert_eq!(report.p_down, 0.5);
        assert_eq!(report.confidence, 0.0);
        assert!(report.contributing_signals.is_empty());
        assert_eq!(report.features.rsi, Some(RSI_NEUTRAL));
        assert_eq!(report.momentum_state, Direction::Neutral);
    }

    #[test]
    fn test_uptrend_leans_up() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let s = series(&closes);
        let est = ProbabilityEstimator::<LogisticModel>::default();
        let cal = MarketCalendar::new(Market::Us);
        let report = est.estimate(&cal, &s, &weekly(&s), &[]).unwrap();

        assert!(report.p_up > 0.5);
        assert!((report.p_up + report.p_down - 1.0).abs() < 1e-9);
        assert!(report.confidence > 0.0 && report.confidence <= 1.0);
        assert!(report.contributing_signals.contains(&FeatureName::MeanReturn));
        assert!(!report.contributing_signals.contains(&FeatureName::PatternBias));
        assert_eq!(report.features.rsi, Some(100.0));
        assert!(report.features.macd_hist.is_some_and(|h| h > 0.0));
        assert_eq!(report.momentum_state, Direction::Bullish);
        // True range is 2 on every bar
        assert_eq!(report.volatility_state, Some(VolatilityState::Normal));
        assert_eq!(report.as_of_date, s.last().unwrap().date);
        assert!(report.target_date > report.as_of_date);
    }

    #[test]
    fn test_old_matches_are_ignored() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let s = series(&closes);
        let est = ProbabilityEstimator::<LogisticModel>::default();
        let old = [m(3, Direction::Bearish, 1.0)];
        let recent = [m(28, Direction::Bearish, 1.0)];

        assert_eq!(est.features(&s, &weekly(&s), &old).pattern_bias, None);
        assert_eq!(est.features(&s, &weekly(&s), &recent).pattern_bias, Some(-1.0));
    }

    #[test]
    fn test_confidence_scales_with_periods() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let s = series(&closes);
        let summaries = weekly(&s);
        let est = ProbabilityEstimator::<LogisticModel>::default();
        let cal = MarketCalendar::new(Market::Us);

        let full = est.estimate(&cal, &s, &summaries, &[]).unwrap();
        let thin = est.estimate(&cal, &s, &summaries[..1], &[]).unwrap();
        assert!(thin.confidence < full.confidence);
    }

    #[test]
    fn test_insufficient_data() {
        let cal = MarketCalendar::new(Market::Us);
        let est = ProbabilityEstimator::<LogisticModel>::default();

        let one = series(&[10.0]);
        let err = est.estimate(&cal, &one, &weekly(&one), &[]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                what: "bars",
                need: 20,
                got: 1
            }
        );

        let long = series(&[10.0; 25]);
        assert!(matches!(
            est.estimate(&cal, &long, &[], &[]),
            Err(AnalysisError::InsufficientData { what: "trend summaries", .. })
        ));
    }

    #[test]
    fn test_short_lookback_rejected() {
        let config = EstimatorConfig {
            lookback_window: Period::new(1).unwrap(),
            ..EstimatorConfig::default()
        };
        assert!(ProbabilityEstimator::new(config, LogisticModel::default()).is_err());
    }
}
