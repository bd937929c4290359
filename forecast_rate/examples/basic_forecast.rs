use chrono::{Days, NaiveDate};
use forecast_rate::data::QuoteSeries;
use forecast_rate::models::AdditiveTrendModel;
use forecast_rate::Forecaster;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Forecast Rate: Basic Forecasting Example");
    println!("========================================\n");

    let history = create_sample_history();
    println!(
        "Sample history: {} daily closes, latest {:.4}\n",
        history.len(),
        history.latest_close().unwrap_or_default()
    );

    let model = AdditiveTrendModel::new()
        .with_interval_width(0.9)?
        .with_seed(7);
    let forecaster = Forecaster::new(model).with_timeout(Duration::from_secs(30));

    let forecast = forecaster.forecast(&history, 10)?;
    println!("{:<12} {:>10} {:>10} {:>10}", "date", "lower", "yhat", "upper");
    for point in forecast.points() {
        println!(
            "{:<12} {:>10.4} {:>10.4} {:>10.4}",
            point.date, point.yhat_lower, point.yhat, point.yhat_upper
        );
    }

    Ok(())
}

/// A drifting rate with a weekly wobble
fn create_sample_history() -> QuoteSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    QuoteSeries::from_closes((0..180u64).map(|i| {
        let day = i as f64;
        let weekly = (2.0 * std::f64::consts::PI * day / 7.0).sin() * 0.15;
        (start + Days::new(i), 30.0 + 0.02 * day + weekly)
    }))
}
