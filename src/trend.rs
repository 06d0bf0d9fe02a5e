//! Weekly and monthly trend summaries.
//!
//! Bars are partitioned by [`TradingCalendar::period_start`]; a period with
//! no bars produces no summary.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    calendar::{MarketCalendar, PeriodKind, TradingCalendar},
    series::{Bar, BarSeries},
    AnalysisError, Result,
};

/// OHLC fold of one calendar period.
///
/// `net_change == close - open` and `pct_change == net_change / open` hold for
/// every summary. A period holding a single bar has no movement across it, so
/// its `open` is reported equal to its `close` and both changes are zero; the
/// bar's own open is still reflected in `high` and `low`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSummary {
    pub period: PeriodKind,
    /// Date of the first bar in the period
    pub period_start: NaiveDate,
    /// Date of the last bar in the period
    pub period_end: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub net_change: f64,
    pub pct_change: f64,
    pub bar_count: usize,
}

impl TrendSummary {
    /// Fold a non-empty run of bars from the same period.
    fn fold(period: PeriodKind, bars: &[Bar]) -> Option<Self> {
        let (first, last) = (bars.first()?, bars.last()?);

        let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let volume = bars.iter().fold(0u64, |acc, b| acc.saturating_add(b.volume));

        let open = if bars.len() == 1 { last.close } else { first.open };
        let net_change = last.close - open;

        Some(Self {
            period,
            period_start: first.date,
            period_end: last.date,
            open,
            high,
            low,
            close: last.close,
            volume,
            net_change,
            pct_change: net_change / open,
            bar_count: bars.len(),
        })
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.net_change > 0.0
    }
}

/// Folds a [`BarSeries`] into per-period [`TrendSummary`] values using an
/// injected trading calendar.
#[derive(Debug, Clone, Default)]
pub struct TrendAggregator<C: TradingCalendar = MarketCalendar> {
    calendar: C,
}

impl<C: TradingCalendar> TrendAggregator<C> {
    pub fn new(calendar: C) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// One summary per period present in the data, in chronological order.
    ///
    /// Fails with [`AnalysisError::InsufficientData`] only for an empty series.
    pub fn aggregate(&self, series: &BarSeries, kind: PeriodKind) -> Result<Vec<TrendSummary>> {
        if series.is_empty() {
            return Err(AnalysisError::InsufficientData {
                what: "bars",
                need: 1,
                got: 0,
            });
        }

        let cal = &self.calendar;
        let summaries: Vec<TrendSummary> = series
            .bars()
            .chunk_by(|a, b| cal.period_start(a.date, kind) == cal.period_start(b.date, kind))
            .filter_map(|chunk| TrendSummary::fold(kind, chunk))
            .collect();

        tracing::debug!(
            symbol = series.symbol(),
            calendar = cal.name(),
            period = ?kind,
            bars = series.len(),
            summaries = summaries.len(),
            "trend aggregation finished"
        );
        Ok(summaries)
    }

    /// Weekly and monthly summaries of the same series.
    pub fn aggregate_both(
        &self,
        series: &BarSeries,
    ) -> Result<(Vec<TrendSummary>, Vec<TrendSummary>)> {
        let weekly = self.aggregate(series, PeriodKind::Week)?;
        let monthly = self.aggregate(series, PeriodKind::Month)?;
        Ok((weekly, monthly))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Market;
    use chrono::Days;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, open: f64, close: f64) -> Bar {
        Bar::new(date, open, open.max(close) + 1.0, open.min(close) - 1.0, close, 100)
    }

    fn aggregator() -> TrendAggregator {
        TrendAggregator::new(MarketCalendar::new(Market::Us))
    }

    #[test]
    fn test_weekly_partition() {
        // Thu, Fri | Mon, Tue, Wed
        let bars = vec![
            bar(d(2024, 3, 7), 10.0, 11.0),
            bar(d(2024, 3, 8), 11.0, 12.0),
            bar(d(2024, 3, 11), 12.0, 11.5),
            bar(d(2024, 3, 12), 11.5, 13.0),
            bar(d(2024, 3, 13), 13.0, 14.0),
        ];
        let series = BarSeries::new("AAPL", bars).unwrap();
        let weeks = aggregator().aggregate(&series, PeriodKind::Week).unwrap();

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].bar_count, 2);
        assert_eq!(weeks[0].period_start, d(2024, 3, 7));
        assert_eq!(weeks[0].period_end, d(2024, 3, 8));
        assert_eq!(weeks[0].open, 10.0);
        assert_eq!(weeks[0].close, 12.0);
        assert!((weeks[0].net_change - 2.0).abs() < 1e-12);
        assert!((weeks[0].pct_change - 0.2).abs() < 1e-12);
        assert_eq!(weeks[0].volume, 200);

        assert_eq!(weeks[1].bar_count, 3);
        assert_eq!(weeks[1].high, 15.0);
        assert_eq!(weeks[1].low, 10.5);
    }

    #[test]
    fn test_empty_periods_are_skipped() {
        let bars = vec![
            bar(d(2024, 1, 31), 10.0, 11.0),
            bar(d(2024, 3, 1), 11.0, 12.0),
        ];
        let series = BarSeries::new("X", bars).unwrap();
        let months = aggregator().aggregate(&series, PeriodKind::Month).unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[1].period_start, d(2024, 3, 1));
    }

    #[test]
    fn test_single_bar_period_has_zero_change() {
        let series = BarSeries::new("X", vec![bar(d(2024, 5, 6), 10.0, 12.0)]).unwrap();
        let (weekly, monthly) = aggregator().aggregate_both(&series).unwrap();
        for s in weekly.iter().chain(&monthly) {
            assert_eq!(s.bar_count, 1);
            assert_eq!(s.open, 12.0);
            assert_eq!(s.close, 12.0);
            assert_eq!((s.high, s.low), (13.0, 9.0));
            assert_eq!(s.net_change, s.close - s.open);
            assert_eq!(s.net_change, 0.0);
            assert_eq!(s.pct_change, 0.0);
            assert!(!s.is_up());
        }
    }

    #[test]
    fn test_empty_series_fails() {
        let series = BarSeries::new("X", Vec::new()).unwrap();
        let err = aggregator().aggregate(&series, PeriodKind::Week).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                what: "bars",
                need: 1,
                got: 0
            }
        );
    }

    proptest! {
        #[test]
        fn bar_counts_cover_series(
            gaps in proptest::collection::vec(1u64..6, 1..120),
            closes in proptest::collection::vec(5.0f64..50.0, 120),
        ) {
            let mut date = d(2023, 1, 2);
            let mut bars = Vec::with_capacity(gaps.len());
            for (gap, close) in gaps.iter().zip(&closes) {
                bars.push(bar(date, *close, close + 0.5));
                date = date + Days::new(*gap);
            }
            let series = BarSeries::new("P", bars).unwrap();
            let (weekly, monthly) = aggregator().aggregate_both(&series).unwrap();

            prop_assert_eq!(weekly.iter().map(|s| s.bar_count).sum::<usize>(), series.len());
            prop_assert_eq!(monthly.iter().map(|s| s.bar_count).sum::<usize>(), series.len());
            prop_assert!(weekly.windows(2).all(|w| w[0].period_end < w[1].period_start));
            for s in weekly.iter().chain(&monthly) {
                prop_assert_eq!(s.net_change, s.close - s.open);
                prop_assert_eq!(s.is_up(), s.close > s.open);
                if s.bar_count == 1 {
                    prop_assert_eq!(s.pct_change, 0.0);
                }
            }
        }
    }
}
