use chrono::{Days, NaiveDate};
use forecast_rate::data::{frame_points, QuoteSeries};
use forecast_rate::error::{ForecastError, Result};
use forecast_rate::models::{AdditiveTrendModel, ForecastModel, ForecastPoint, TrainedForecastModel};
use forecast_rate::Forecaster;
use polars::prelude::DataFrame;
use rstest::rstest;
use std::thread;
use std::time::Duration;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn linear_history(n: u64) -> QuoteSeries {
    QuoteSeries::from_closes((0..n).map(|i| (start() + Days::new(i), 30.0 + 0.05 * i as f64)))
}

/// Behaviours a test backend can be told to show
#[derive(Debug, Clone, Copy)]
enum Behaviour {
    LastValue,
    Slow(Duration),
    Fail,
    Panic,
    ShortOutput,
    InvertedBounds,
}

#[derive(Debug, Clone)]
struct ScriptedModel {
    behaviour: Behaviour,
}

#[derive(Debug)]
struct TrainedScripted {
    behaviour: Behaviour,
    last: f64,
}

impl ForecastModel for ScriptedModel {
    type Trained = TrainedScripted;

    fn train(&self, frame: &DataFrame) -> Result<TrainedScripted> {
        match self.behaviour {
            Behaviour::Slow(delay) => thread::sleep(delay),
            Behaviour::Fail => {
                return Err(ForecastError::DataError("solver diverged".to_string()))
            }
            Behaviour::Panic => panic!("backend bug"),
            _ => {}
        }
        let last = frame_points(frame)?
            .last()
            .map(|(_, value)| *value)
            .unwrap_or_default();
        Ok(TrainedScripted {
            behaviour: self.behaviour,
            last,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

impl TrainedForecastModel for TrainedScripted {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>> {
        let mut points: Vec<ForecastPoint> = dates
            .iter()
            .map(|&date| ForecastPoint {
                date,
                yhat: self.last,
                yhat_lower: self.last - 1.0,
                yhat_upper: self.last + 1.0,
            })
            .collect();
        match self.behaviour {
            Behaviour::ShortOutput => {
                points.pop();
            }
            Behaviour::InvertedBounds => {
                for point in &mut points {
                    std::mem::swap(&mut point.yhat_lower, &mut point.yhat_upper);
                }
            }
            _ => {}
        }
        Ok(points)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn scripted(behaviour: Behaviour) -> Forecaster<ScriptedModel> {
    Forecaster::new(ScriptedModel { behaviour })
}

#[test]
fn test_forecast_has_horizon_rows_after_history() {
    let history = linear_history(90);
    let forecaster = Forecaster::new(AdditiveTrendModel::new());

    let forecast = forecaster.forecast(&history, 7).unwrap();
    let last = history.last().unwrap().date;

    assert_eq!(forecast.horizon(), 7);
    assert_eq!(forecast.yhat().len(), 7);
    assert_eq!(forecast.forecast_dates()[0], last + Days::new(1));
    assert_eq!(forecast.forecast_dates()[6], last + Days::new(7));
    for point in forecast.points() {
        assert!(point.date > last);
        assert!(point.yhat_lower <= point.yhat && point.yhat <= point.yhat_upper);
    }
    assert_eq!(forecast.history(), &history);
}

#[test]
fn test_single_point_is_insufficient_history() {
    let history = linear_history(1);
    let result = Forecaster::new(AdditiveTrendModel::new()).forecast(&history, 5);

    assert!(matches!(
        result,
        Err(ForecastError::InsufficientHistory {
            required: 2,
            actual: 1
        })
    ));
}

#[test]
fn test_empty_history_is_insufficient_history() {
    let result = Forecaster::new(AdditiveTrendModel::new()).forecast(&QuoteSeries::empty(), 5);
    assert!(matches!(
        result,
        Err(ForecastError::InsufficientHistory { actual: 0, .. })
    ));
}

#[test]
fn test_zero_horizon_is_rejected() {
    let result = scripted(Behaviour::LastValue).forecast(&linear_history(10), 0);
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_min_history_is_configurable() {
    let forecaster = scripted(Behaviour::LastValue).with_min_history(30).unwrap();
    assert!(matches!(
        forecaster.forecast(&linear_history(10), 3),
        Err(ForecastError::InsufficientHistory {
            required: 30,
            actual: 10
        })
    ));
    assert!(scripted(Behaviour::LastValue).with_min_history(1).is_err());
}

#[test]
fn test_slow_backend_times_out() {
    let forecaster = scripted(Behaviour::Slow(Duration::from_secs(5)))
        .with_timeout(Duration::from_millis(50));

    let result = forecaster.forecast(&linear_history(10), 3);
    assert!(matches!(result, Err(ForecastError::ForecastUnavailable(_))));
}

#[test]
fn test_backend_within_timeout_succeeds() {
    let forecaster = scripted(Behaviour::LastValue).with_timeout(Duration::from_secs(10));

    let history = linear_history(10);
    let forecast = forecaster.forecast(&history, 3).unwrap();
    let last = history.latest_close().unwrap();
    assert_eq!(forecast.yhat(), &[last, last, last]);
    assert_eq!(forecast.model(), "scripted");
}

#[rstest]
#[case(Behaviour::Fail, None)]
#[case(Behaviour::Fail, Some(Duration::from_secs(10)))]
#[case(Behaviour::Panic, None)]
#[case(Behaviour::Panic, Some(Duration::from_secs(10)))]
#[case(Behaviour::ShortOutput, None)]
#[case(Behaviour::InvertedBounds, None)]
fn test_backend_failures_are_unavailable(
    #[case] behaviour: Behaviour,
    #[case] timeout: Option<Duration>,
) {
    let mut forecaster = scripted(behaviour);
    if let Some(timeout) = timeout {
        forecaster = forecaster.with_timeout(timeout);
    }

    let result = forecaster.forecast(&linear_history(10), 3);
    assert!(matches!(result, Err(ForecastError::ForecastUnavailable(_))));
}

#[test]
fn test_forecast_serializes_to_json() {
    let forecast = scripted(Behaviour::LastValue)
        .forecast(&linear_history(3), 1)
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&forecast.to_json().unwrap()).unwrap();

    assert_eq!(json["horizon"], 1);
    assert_eq!(json["forecast_dates"][0], "2024-01-04");
    assert_eq!(json["model"], "scripted");
}
