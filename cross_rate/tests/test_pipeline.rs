use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use cross_rate::cache::ManualClock;
use cross_rate::{
    Catalog, ForecastOutcome, Instrument, MemorySource, Pipeline, PipelineStatus, Portfolio,
    PricingMode, TrendDirection, TtlSeriesCache,
};
use forecast_rate::data::QuoteSeries;
use forecast_rate::Forecaster;
use forecast_rate::models::AdditiveTrendModel;
use pretty_assertions::assert_eq;
use rate_math::RsiZone;
use std::sync::Arc;
use std::time::Duration;

const BASE: &str = "USDTRY=X";

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn daily(closes: impl IntoIterator<Item = f64>) -> QuoteSeries {
    QuoteSeries::from_closes(
        closes
            .into_iter()
            .enumerate()
            .map(|(i, c)| (start() + Days::new(i as u64), c)),
    )
}

fn rising(n: usize, from: f64, step: f64) -> QuoteSeries {
    daily((0..n).map(|i| from + step * i as f64))
}

/// Base plus one native series per built-in symbol, 60 days each
fn market() -> MemorySource {
    MemorySource::new()
        .with_series(BASE, rising(60, 30.0, 0.05))
        .with_series("EURTRY=X", rising(60, 33.0, 0.04))
        .with_series("GBPTRY=X", rising(60, 38.0, 0.03))
        .with_series("GC=F", rising(60, 2000.0, 2.0))
        .with_series("SI=F", rising(60, 23.0, 0.01))
        .with_series("USDJPY=X", rising(60, 150.0, 0.1))
        .with_series("USDSAR=X", daily(vec![3.75; 60]))
        .with_series("USDKWD=X", daily(vec![0.307; 60]))
        .with_series("USDAZN=X", daily(vec![1.7; 60]))
        .with_series("CHFUSD=X", rising(60, 1.12, 0.001))
        .with_series("AUDUSD=X", rising(60, 0.66, 0.0005))
}

fn pipeline(source: Arc<MemorySource>) -> Pipeline {
    Pipeline::new(source).with_forecaster(
        Forecaster::new(AdditiveTrendModel::new().with_uncertainty_samples(200))
            .with_timeout(Duration::from_secs(60)),
    )
}

#[test]
fn test_direct_run_for_base_instrument() {
    let source = Arc::new(market());
    let usd = Instrument::new("USD/TRY", BASE, PricingMode::Direct);

    let result = pipeline(source.clone()).run(&usd, 0, true);

    assert_eq!(result.status, PipelineStatus::Ok);
    assert_eq!(result.series, rising(60, 30.0, 0.05));
    assert_eq!(source.calls(BASE), 1);
    assert_eq!(result.trend, Some(TrendDirection::Rising));
    assert_eq!(result.forecast, ForecastOutcome::NotRequested);

    // Strictly rising closes: no losses in any window
    let indicator = result.indicator.unwrap();
    assert_eq!(indicator.len(), 60);
    assert!(indicator.values()[..14].iter().all(Option::is_none));
    assert_eq!(indicator.latest().map(|(_, v)| v), Some(100.0));
    assert_eq!(indicator.latest_zone(), Some(RsiZone::Overbought));
}

#[test]
fn test_gold_run_converts_to_grams() {
    let source = Arc::new(market());
    let gold = Instrument::new("Gram Gold", "GC=F", PricingMode::GoldCalc);

    let result = pipeline(source).run(&gold, 0, false);

    assert_eq!(result.status, PipelineStatus::Ok);
    assert_relative_eq!(
        result.series.first().unwrap().close,
        2000.0 * 30.0 / 31.1035,
        epsilon = 1e-9
    );
    assert!(result.indicator.is_none());
}

#[test]
fn test_price_change_over_last_two_bars() {
    let source = Arc::new(MemorySource::new().with_series(BASE, daily(vec![90.0, 100.0, 110.0])));
    let usd = Instrument::new("USD/TRY", BASE, PricingMode::Direct);

    let result = pipeline(source).run(&usd, 0, false);

    assert_eq!(result.latest_price, Some(110.0));
    assert_relative_eq!(result.price_change_pct.unwrap(), 10.0, epsilon = 1e-12);
}

#[test]
fn test_forecast_rows_follow_history() {
    let source = Arc::new(market());
    let eur = Instrument::new("EUR/TRY", "EURTRY=X", PricingMode::Direct);

    let result = pipeline(source).run(&eur, 5, false);
    let forecast = result.forecast.result().expect("forecast should be ready");
    let last = result.series.last().unwrap().date;

    assert_eq!(forecast.forecast_dates().len(), 5);
    assert_eq!(forecast.forecast_dates()[0], last + Days::new(1));
    for point in forecast.points() {
        assert!(point.yhat_lower <= point.yhat && point.yhat <= point.yhat_upper);
    }
}

#[test]
fn test_single_point_is_insufficient_data() {
    let source = Arc::new(MemorySource::new().with_series(BASE, daily(vec![32.0])));
    let usd = Instrument::new("USD/TRY", BASE, PricingMode::Direct);

    let result = pipeline(source).run(&usd, 7, true);

    assert_eq!(result.status, PipelineStatus::InsufficientData);
    assert_eq!(result.latest_price, Some(32.0));
    assert_eq!(result.price_change_pct, None);
    assert!(result.indicator.is_none());
    assert_eq!(
        result.forecast,
        ForecastOutcome::InsufficientHistory {
            required: 2,
            actual: 1
        }
    );
}

#[test]
fn test_missing_base_is_source_unavailable() {
    let source = Arc::new(MemorySource::new().with_series("GC=F", rising(10, 2000.0, 1.0)));
    let gold = Instrument::new("Gram Gold", "GC=F", PricingMode::GoldCalc);

    let result = pipeline(source.clone()).run(&gold, 3, true);

    assert_eq!(result.status, PipelineStatus::SourceUnavailable);
    assert!(result.series.is_empty());
    assert!(result.message.is_some());
    // One retry, then give up without touching the target
    assert_eq!(source.calls(BASE), 2);
    assert_eq!(source.calls("GC=F"), 0);
}

#[test]
fn test_disjoint_dates_are_derivation_impossible() {
    let late = QuoteSeries::from_closes(vec![(start() + Days::new(365), 150.0)]);
    let source = Arc::new(
        MemorySource::new()
            .with_series(BASE, rising(10, 30.0, 0.1))
            .with_series("USDJPY=X", late),
    );
    let jpy = Instrument::new("JPY/TRY", "USDJPY=X", PricingMode::Calc);

    let result = pipeline(source).run(&jpy, 0, false);
    assert_eq!(result.status, PipelineStatus::DerivationImpossible);
}

#[test]
fn test_failing_forecast_does_not_fail_run() {
    let source = Arc::new(market());
    let usd = Instrument::new("USD/TRY", BASE, PricingMode::Direct);
    let strict = Forecaster::new(AdditiveTrendModel::new())
        .with_min_history(100)
        .unwrap();

    let result = Pipeline::new(source).with_forecaster(strict).run(&usd, 3, false);

    assert_eq!(result.status, PipelineStatus::Ok);
    assert_eq!(
        result.forecast,
        ForecastOutcome::InsufficientHistory {
            required: 100,
            actual: 60
        }
    );
}

#[test]
fn test_batch_fetches_base_once_and_keeps_order() {
    let source = Arc::new(market());
    let catalog = Catalog::builtin();

    let results = pipeline(source.clone()).run_batch(catalog.instruments(), 0, true);

    assert_eq!(source.calls(BASE), 1);
    assert_eq!(results.len(), catalog.len());
    for (result, instrument) in results.iter().zip(catalog.iter()) {
        assert_eq!(&result.instrument, instrument);
        assert_eq!(result.status, PipelineStatus::Ok, "{}", instrument);
        assert_eq!(result.series.len(), 60);
    }
}

#[test]
fn test_cache_hit_avoids_fetch() {
    let source = Arc::new(market());
    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let cache = Arc::new(TtlSeriesCache::with_clock(Duration::from_secs(60), clock.clone()));
    let pipeline = pipeline(source.clone()).with_cache(cache);
    let chf = Instrument::new("CHF/TRY", "CHFUSD=X", PricingMode::CalcInverse);

    let first = pipeline.run(&chf, 0, false);
    let calls = source.total_calls();
    let second = pipeline.run(&chf, 0, false);

    assert_eq!(calls, 2);
    assert_eq!(source.total_calls(), calls);
    assert_eq!(first.series, second.series);

    clock.advance(Duration::from_secs(61));
    pipeline.run(&chf, 0, false);
    assert_eq!(source.total_calls(), calls * 2);
}

#[test]
fn test_portfolio_values_batch_results() {
    let source = Arc::new(market());
    let catalog = Catalog::builtin();
    let portfolio: Portfolio = vec![
        "USD/TRY=100".parse().unwrap(),
        "Gram Gold=2".parse().unwrap(),
        "Bitcoin=1".parse().unwrap(),
    ]
    .into_iter()
    .collect();

    let results = pipeline(source).run_batch(catalog.instruments(), 0, false);
    let valuation = portfolio.value_with(&results);

    let usd = results[0].latest_price.unwrap();
    let gold = results[3].latest_price.unwrap();
    assert_relative_eq!(valuation.total, 100.0 * usd + 2.0 * gold, epsilon = 1e-9);
    assert_eq!(valuation.unpriced(), vec!["Bitcoin"]);
}
