//! Per-instrument analysis pipeline.
//!
//! [`Analyzer::analyze`] runs trend aggregation and the pattern scan side by
//! side on the rayon pool, then feeds both into the estimator. The estimator
//! sees every match so analog models can use the whole history; the report
//! lists only the trailing pattern window. The first component failure is
//! returned unchanged.

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    calendar::{session_gaps, MarketCalendar, SessionGap, TradingCalendar},
    config::AnalysisConfig,
    probability::{LogisticModel, ProbabilityEstimator, ProbabilityModel, ProbabilityReport},
    series::BarSeries,
    trend::{TrendAggregator, TrendSummary},
    trailing_matches, AnalysisError, PatternCatalog, PatternMatch, Period, Result,
};

/// Everything derived from one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    /// Name of the trading calendar used for periods and the target date
    pub calendar: String,
    pub weekly: Vec<TrendSummary>,
    pub monthly: Vec<TrendSummary>,
    /// Matches inside the trailing pattern window, indices into the full series
    pub patterns: Vec<PatternMatch>,
    /// Trading sessions the calendar expected but the series lacks
    pub gaps: Vec<SessionGap>,
    pub probability: ProbabilityReport,
}

/// Failed analysis of one instrument in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Composes aggregator, catalog and estimator.
#[derive(Debug, Clone)]
pub struct Analyzer<C: TradingCalendar = MarketCalendar, M: ProbabilityModel = LogisticModel> {
    aggregator: TrendAggregator<C>,
    catalog: PatternCatalog,
    estimator: ProbabilityEstimator<M>,
    pattern_window: Period,
}

impl Analyzer {
    /// Validate `config` and build the default pipeline from it.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let catalog = config.build_catalog()?;
        if config.pattern_window.get() < catalog.max_window() {
            return Err(AnalysisError::InvalidConfig(format!(
                "pattern_window {} is shorter than the longest pattern ({} bars)",
                config.pattern_window.get(),
                catalog.max_window()
            )));
        }
        let estimator = ProbabilityEstimator::new(
            config.estimator_config(),
            LogisticModel::new(config.weights)?,
        )?;

        tracing::debug!(
            market = ?config.market,
            patterns = catalog.len(),
            lookback = config.lookback_window.get(),
            pattern_window = config.pattern_window.get(),
            "analyzer configured"
        );
        Ok(Self::new(config.calendar(), catalog, estimator, config.pattern_window))
    }
}

impl<C: TradingCalendar, M: ProbabilityModel> Analyzer<C, M> {
    pub fn new(
        calendar: C,
        catalog: PatternCatalog,
        estimator: ProbabilityEstimator<M>,
        pattern_window: Period,
    ) -> Self {
        Self {
            aggregator: TrendAggregator::new(calendar),
            catalog,
            estimator,
            pattern_window,
        }
    }

    pub fn calendar(&self) -> &C {
        self.aggregator.calendar()
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn estimator(&self) -> &ProbabilityEstimator<M> {
        &self.estimator
    }

    /// Analyze one series.
    pub fn analyze(&self, series: &BarSeries) -> Result<AnalysisReport> {
        let (trend, matches) = rayon::join(
            || self.aggregator.aggregate_both(series),
            || self.catalog.scan(series.bars()),
        );
        let (weekly, monthly) = trend?;

        let probability = self
            .estimator
            .estimate(self.calendar(), series, &weekly, &matches)?;
        let patterns = trailing_matches(&matches, series.len(), self.pattern_window.get());
        let gaps = session_gaps(self.calendar(), series.iter().map(|bar| bar.date));
        if !gaps.is_empty() {
            tracing::debug!(symbol = series.symbol(), gaps = gaps.len(), "series has session gaps");
        }

        Ok(AnalysisReport {
            symbol: series.symbol().to_string(),
            calendar: self.calendar().name().to_string(),
            weekly,
            monthly,
            patterns,
            gaps,
            probability,
        })
    }
}

/// Analyze independent instruments in parallel.
///
/// Returns successes and failures separately; a failure never affects the
/// other instruments.
pub fn analyze_parallel<'a, C, M, I>(
    analyzer: &Analyzer<C, M>,
    instruments: I,
) -> (Vec<AnalysisReport>, Vec<AnalysisFailure>)
where
    C: TradingCalendar,
    M: ProbabilityModel,
    I: IntoParallelIterator<Item = &'a BarSeries>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|series| {
            analyzer.analyze(series).map_err(|error| AnalysisFailure {
                symbol: series.symbol().to_string(),
                error,
            })
        })
        .collect();

    let mut reports = Vec::new();
    let mut failures = Vec::new();

    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(failure) => {
                tracing::warn!(
                    symbol = %failure.symbol,
                    error = %failure.error,
                    "instrument analysis failed"
                );
                failures.push(failure);
            }
        }
    }

    (reports, failures)
}
