//! Benchmarks for pattern scanning and the full analysis pipeline.

use candlecast::prelude::*;
use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Deterministic pseudo-random daily series
fn generate_series(symbol: &str, n: usize) -> BarSeries {
  let start = NaiveDate::from_ymd_opt(2015, 1, 5).unwrap();
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0;
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let open = price;
    let close = (price + change).max(1.0);
    let high = open.max(close) + volatility * 0.5;
    let low = (open.min(close) - volatility * 0.5).max(0.5);

    bars.push(Bar::new(start + Days::new(i as u64), open, high, low, close, 1_000));
    price = close;
  }

  BarSeries::new(symbol, bars).unwrap()
}

fn bench_single_pattern(c: &mut Criterion) {
  let series = generate_series("DOJI", 1000);
  let catalog = CatalogBuilder::new().add_named("doji").unwrap().build().unwrap();

  c.bench_function("detect_doji_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(detect(black_box(&series), &catalog));
    })
  });
}

fn bench_all_patterns(c: &mut Criterion) {
  let series = generate_series("ALL", 1000);
  let catalog = CatalogBuilder::new().with_all_defaults().build().unwrap();

  c.bench_function("detect_all_patterns_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(detect(black_box(&series), &catalog));
    })
  });
}

fn bench_trend_aggregation(c: &mut Criterion) {
  let aggregator = TrendAggregator::new(MarketCalendar::new(Market::Us));
  let mut group = c.benchmark_group("aggregate_both");

  for size in [252, 1260, 5040] {
    let series = generate_series("TREND", size);
    group.bench_with_input(BenchmarkId::from_parameter(size), &series, |b, series| {
      b.iter(|| {
        let _ = black_box(aggregator.aggregate_both(black_box(series)));
      })
    });
  }

  group.finish();
}

fn bench_analyze(c: &mut Criterion) {
  let analyzer = Analyzer::from_config(&AnalysisConfig::default()).unwrap();
  let series = generate_series("PIPE", 1260);

  c.bench_function("analyze_5y", |b| {
    b.iter(|| {
      let _ = black_box(analyzer.analyze(black_box(&series)));
    })
  });
}

fn bench_parallel_analyze(c: &mut Criterion) {
  let analyzer = Analyzer::from_config(&AnalysisConfig::default()).unwrap();
  let instruments: Vec<BarSeries> =
    (0..16).map(|i| generate_series(&format!("SYM{i}"), 1260)).collect();

  c.bench_function("analyze_parallel_16_instruments", |b| {
    b.iter(|| {
      let _ = black_box(analyze_parallel(&analyzer, black_box(instruments.iter().collect::<Vec<_>>())));
    })
  });
}

criterion_group!(
  benches,
  bench_single_pattern,
  bench_all_patterns,
  bench_trend_aggregation,
  bench_analyze,
  bench_parallel_analyze,
);

criterion_main!(benches);
