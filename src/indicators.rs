//! Technical indicators over a bar series.
//!
//! Smoothing follows the usual conventions: exponential averages are seeded
//! with the first observation, Wilder averages use `alpha = 1 / period` and
//! are undefined until `period` observations have been seen.

use serde::Serialize;

use crate::{series::Bar, Direction};

/// RSI above this (with a rising MACD histogram) reads as bullish momentum
pub const MOMENTUM_UPPER: f64 = 55.0;
/// RSI below this (with a falling MACD histogram) reads as bearish momentum
pub const MOMENTUM_LOWER: f64 = 45.0;
/// ATR above `median * HIGH_VOLATILITY` is a high-volatility session
pub const HIGH_VOLATILITY: f64 = 1.2;
/// ATR below `median * LOW_VOLATILITY` is a low-volatility session
pub const LOW_VOLATILITY: f64 = 0.8;

/// Neutral RSI, reported where the indicator has no opinion
pub const RSI_NEUTRAL: f64 = 50.0;

/// Indicator periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    /// Moving average the close is compared against for the trend state
    pub trend_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
            trend_period: 20,
        }
    }
}

/// Volatility regime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityState {
    Low,
    Normal,
    High,
}

// ============================================================
// SMOOTHING
// ============================================================

/// Exponential moving average with `alpha = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut acc = None;
    for &v in values {
        let next = match acc {
            Some(prev) => prev + alpha * (v - prev),
            None => v,
        };
        acc = Some(next);
        out.push(next);
    }
    out
}

/// Wilder smoothing; `None` until `period` values have been folded in.
fn wilder(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let period = period.max(1);
    let alpha = 1.0 / period as f64;
    let mut acc = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            acc = if i == 0 { v } else { acc + alpha * (v - acc) };
            (i + 1 >= period).then_some(acc)
        })
        .collect()
}

/// Simple moving average over up to `period` trailing values.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut sum = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            sum += v;
            if i >= period {
                sum -= values[i - period];
            }
            sum / (i + 1).min(period) as f64
        })
        .collect()
}

/// Median of the finite values, `None` when there are none.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

// ============================================================
// INDICATORS
// ============================================================

/// Wilder RSI per bar. `None` for the first `period` bars.
///
/// With no losses in the window RSI is 100, with no movement at all it is 50.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if closes.is_empty() {
        return Vec::new();
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = deltas.iter().map(|d| d.max(0.0)).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| (-d).max(0.0)).collect();

    let mut out = vec![None];
    out.extend(
        wilder(&gains, period)
            .into_iter()
            .zip(wilder(&losses, period))
            .map(|pair| match pair {
                (Some(gain), Some(loss)) => Some(rsi_value(gain, loss)),
                _ => None,
            }),
    );
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss > 0.0 {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    } else if avg_gain > 0.0 {
        100.0
    } else {
        RSI_NEUTRAL
    }
}

/// MACD line minus its signal line, per bar.
pub fn macd_histogram(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
    let line: Vec<f64> = ema(closes, fast)
        .into_iter()
        .zip(ema(closes, slow))
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);
    line.iter().zip(signal_line).map(|(l, s)| l - s).collect()
}

/// True range; the first bar has no previous close and uses its own range.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let range = bar.high - bar.low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(prev) => range
                    .max((bar.high - prev).abs())
                    .max((bar.low - prev).abs()),
                None => range,
            }
        })
        .collect()
}

/// Wilder ATR per bar. `None` for the first `period - 1` bars.
pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    wilder(&true_range(bars), period)
}

// ============================================================
// STATES
// ============================================================

/// Momentum from RSI and the MACD histogram; both have to agree.
pub fn momentum_state(rsi: Option<f64>, macd_hist: f64) -> Direction {
    let rsi = rsi.unwrap_or(RSI_NEUTRAL);
    if rsi > MOMENTUM_UPPER && macd_hist > 0.0 {
        Direction::Bullish
    } else if rsi < MOMENTUM_LOWER && macd_hist < 0.0 {
        Direction::Bearish
    } else {
        Direction::Neutral
    }
}

/// Volatility regime of `atr` against the series' median ATR.
pub fn volatility_state(atr: Option<f64>, median_atr: Option<f64>) -> Option<VolatilityState> {
    let (atr, median) = (atr?, median_atr?);
    Some(if atr > median * HIGH_VOLATILITY {
        VolatilityState::High
    } else if atr < median * LOW_VOLATILITY {
        VolatilityState::Low
    } else {
        VolatilityState::Normal
    })
}

/// Close against its moving average.
pub fn trend_state(close: f64, average: f64) -> Direction {
    if close > average {
        Direction::Bullish
    } else if close < average {
        Direction::Bearish
    } else {
        Direction::Neutral
    }
}

// ============================================================
// PER-SERIES TABLE
// ============================================================

/// Every indicator for every bar of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicators {
    pub rsi: Vec<Option<f64>>,
    pub macd_hist: Vec<f64>,
    pub atr: Vec<Option<f64>>,
    pub trend_average: Vec<f64>,
    /// Median of the defined ATR values
    pub median_atr: Option<f64>,
}

impl Indicators {
    pub fn compute(bars: &[Bar], config: &IndicatorConfig) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let atr = atr(bars, config.atr_period);
        let median_atr = median(atr.iter().flatten().copied());
        Self {
            rsi: rsi(&closes, config.rsi_period),
            macd_hist: macd_histogram(
                &closes,
                config.macd_fast,
                config.macd_slow,
                config.macd_signal,
            ),
            atr,
            trend_average: sma(&closes, config.trend_period),
            median_atr,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.macd_hist.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.macd_hist.is_empty()
    }

    pub fn momentum_at(&self, i: usize) -> Direction {
        momentum_state(self.rsi[i], self.macd_hist[i])
    }

    pub fn volatility_at(&self, i: usize) -> Option<VolatilityState> {
        volatility_state(self.atr[i], self.median_atr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ema_seeds_with_first_value() {
        // span 3 -> alpha 0.5
        assert_eq!(ema(&[2.0, 4.0, 4.0], 3), vec![2.0, 3.0, 3.5]);
        assert!(ema(&[], 3).is_empty());
    }

    #[test]
    fn test_sma_uses_partial_windows() {
        assert_eq!(sma(&[1.0, 3.0, 5.0, 7.0], 2), vec![1.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_median() {
        assert_eq!(median([3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median([4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median([f64::NAN]), None);
    }

    #[test]
    fn test_rsi_hand_computed() {
        // deltas +1, -0.5, +1 with alpha 0.5:
        // gains 1, 0.5, 0.75; losses 0, 0.25, 0.125
        let out = rsi(&[10.0, 11.0, 10.5, 11.5], 2);
        assert_eq!(out.len(), 4);
        assert_eq!(&out[..2], &[None, None]);
        assert!(close(out[2].unwrap(), 100.0 - 100.0 / 3.0));
        assert!(close(out[3].unwrap(), 100.0 - 100.0 / 7.0));
    }

    #[test]
    fn test_rsi_edges() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0], 2)[2], Some(100.0));
        assert_eq!(rsi(&[5.0, 5.0, 5.0], 2)[2], Some(RSI_NEUTRAL));
        assert_eq!(rsi(&[3.0, 2.0, 1.0], 2)[2], Some(0.0));
        assert!(rsi(&[], 14).is_empty());
    }

    #[test]
    fn test_macd_histogram_hand_computed() {
        // fast span 1 tracks the close; slow and signal span 3 use alpha 0.5
        // line 0, 0.5, 0.75; signal 0, 0.25, 0.5
        let hist = macd_histogram(&[1.0, 2.0, 3.0], 1, 3, 3);
        assert_eq!(hist, vec![0.0, 0.25, 0.25]);
    }

    #[test]
    fn test_atr_hand_computed() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        let bars = [
            Bar::new(day, 10.0, 11.0, 9.0, 10.0, 1),
            Bar::new(day + Days::new(1), 10.0, 12.0, 10.0, 11.5, 1),
            Bar::new(day + Days::new(2), 11.5, 11.8, 10.6, 11.0, 1),
        ];
        let tr = true_range(&bars);
        assert!(close(tr[0], 2.0) && close(tr[1], 2.0) && close(tr[2], 1.2));

        let out = atr(&bars, 2);
        assert_eq!(out[0], None);
        assert!(close(out[1].unwrap(), 2.0));
        assert!(close(out[2].unwrap(), 1.6));
    }

    #[test]
    fn test_momentum_needs_agreement() {
        assert_eq!(momentum_state(Some(60.0), 0.1), Direction::Bullish);
        assert_eq!(momentum_state(Some(60.0), -0.1), Direction::Neutral);
        assert_eq!(momentum_state(Some(40.0), -0.1), Direction::Bearish);
        assert_eq!(momentum_state(None, -0.1), Direction::Neutral);
    }

    #[test]
    fn test_volatility_bands() {
        assert_eq!(volatility_state(Some(1.3), Some(1.0)), Some(VolatilityState::High));
        assert_eq!(volatility_state(Some(1.2), Some(1.0)), Some(VolatilityState::Normal));
        assert_eq!(volatility_state(Some(0.7), Some(1.0)), Some(VolatilityState::Low));
        assert_eq!(volatility_state(None, Some(1.0)), None);
    }
}
