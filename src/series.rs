//! Daily bars and the validated, immutable series built from them.
//!
//! Parsing is someone else's job: a loader hands over plain [`Bar`] records and
//! [`BarSeries::new`] either accepts the whole sequence or rejects it with
//! [`AnalysisError::InvalidBar`] pointing at the first offending bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, OHLCVExt, Result, OHLCV};

// ============================================================
// BAR
// ============================================================

/// One trading day of OHLCV data, dated in the market's local calendar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Plain constructor. No checks happen here; see [`BarSeries::new`].
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    #[inline]
    fn open(&self) -> f64 {
        self.open
    }

    #[inline]
    fn high(&self) -> f64 {
        self.high
    }

    #[inline]
    fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    fn close(&self) -> f64 {
        self.close
    }

    #[inline]
    fn volume(&self) -> f64 {
        self.volume as f64
    }
}

// ============================================================
// BAR SERIES
// ============================================================

/// Chronologically ordered bars for one instrument.
///
/// Dates are strictly increasing and every bar satisfies
/// `low <= min(open, close) <= max(open, close) <= high`. The series cannot be
/// modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate `bars` and take ownership of them.
    ///
    /// An empty series is accepted; components that need history reject it
    /// with [`AnalysisError::InsufficientData`].
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self> {
        let symbol = symbol.into();

        let mut prev: Option<NaiveDate> = None;
        for (index, bar) in bars.iter().enumerate() {
            let reason = match prev {
                Some(p) if bar.date == p => Some("duplicate date"),
                Some(p) if bar.date < p => Some("date precedes previous bar"),
                _ => bar.invariant_violation(),
            };
            if let Some(reason) = reason {
                tracing::warn!(%symbol, index, date = %bar.date, reason, "rejecting bar series");
                return Err(AnalysisError::InvalidBar {
                    index,
                    date: bar.date,
                    reason,
                });
            }
            prev = Some(bar.date);
        }

        tracing::debug!(%symbol, bars = bars.len(), "bar series loaded");
        Ok(Self { symbol, bars })
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    /// The last `n` bars (or all of them when the series is shorter).
    pub fn tail(&self, n: usize) -> &[Bar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }

    /// Close-to-close returns over the last `n` bars, oldest first.
    ///
    /// `n` bars produce `n - 1` returns.
    pub fn trailing_returns(&self, n: usize) -> Vec<f64> {
        self.tail(n)
            .windows(2)
            .map(|w| (w[1].close - w[0].close) / w[0].close)
            .collect()
    }
}

impl AsRef<[Bar]> for BarSeries {
    fn as_ref(&self) -> &[Bar] {
        &self.bars
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn bar(d: u32, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(day(d), o, h, l, c, 1_000)
    }

    #[test]
    fn test_accepts_valid_series() {
        let series = BarSeries::new(
            "AAPL",
            vec![
                bar(4, 10.0, 11.0, 9.5, 10.5),
                bar(5, 10.5, 10.8, 10.0, 10.2),
            ],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.last().unwrap().close, 10.2);
    }

    #[test]
    fn test_empty_series_is_allowed() {
        let series = BarSeries::new("VALE3", Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.trailing_returns(20).is_empty());
    }

    #[test]
    fn test_rejects_low_above_high() {
        let err = BarSeries::new(
            "AAPL",
            vec![
                bar(4, 10.0, 11.0, 9.5, 10.5),
                bar(5, 10.0, 9.0, 11.0, 10.0),
            ],
        )
        .unwrap_err();
        match err {
            AnalysisError::InvalidBar { index, date, .. } => {
                assert_eq!(index, 1);
                assert_eq!(date, day(5));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_close_outside_range() {
        let err = BarSeries::new("AAPL", vec![bar(4, 10.0, 11.0, 9.5, 11.5)]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBar { index: 0, .. }));
    }

    #[test]
    fn test_rejects_non_positive_and_nan_prices() {
        assert!(BarSeries::new("X", vec![bar(4, 0.0, 1.0, 0.0, 0.5)]).is_err());
        assert!(BarSeries::new("X", vec![bar(4, f64::NAN, 1.0, 0.5, 0.7)]).is_err());
        assert!(BarSeries::new("X", vec![bar(4, 1.0, f64::INFINITY, 0.5, 0.7)]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_and_unordered_dates() {
        let dup = BarSeries::new(
            "X",
            vec![bar(4, 1.0, 2.0, 0.5, 1.5), bar(4, 1.0, 2.0, 0.5, 1.5)],
        );
        assert!(matches!(
            dup,
            Err(AnalysisError::InvalidBar {
                reason: "duplicate date",
                ..
            })
        ));

        let unordered = BarSeries::new(
            "X",
            vec![bar(5, 1.0, 2.0, 0.5, 1.5), bar(4, 1.0, 2.0, 0.5, 1.5)],
        );
        assert!(matches!(
            unordered,
            Err(AnalysisError::InvalidBar { index: 1, .. })
        ));
    }

    #[test]
    fn test_reports_earliest_violation() {
        // Ordering breaks at index 1, the price invariant only at index 3
        let err = BarSeries::new(
            "X",
            vec![
                bar(5, 1.0, 2.0, 0.5, 1.5),
                bar(4, 1.0, 2.0, 0.5, 1.5),
                bar(6, 1.0, 2.0, 0.5, 1.5),
                bar(7, 1.0, 0.5, 2.0, 1.0),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidBar {
                index: 1,
                date: day(4),
                reason: "date precedes previous bar",
            }
        );
    }

    #[test]
    fn test_trailing_returns() {
        let series = BarSeries::new(
            "X",
            vec![
                bar(4, 10.0, 10.0, 10.0, 10.0),
                bar(5, 10.0, 11.0, 10.0, 11.0),
                bar(6, 11.0, 11.0, 9.9, 9.9),
            ],
        )
        .unwrap();
        let returns = series.trailing_returns(3);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);
        assert_eq!(series.trailing_returns(2).len(), 1);
        assert_eq!(series.tail(10).len(), 3);
    }
}
