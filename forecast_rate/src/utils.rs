//! Utility functions for the forecast_rate crate

use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};

/// Daily dates following `last_date`: `last_date + 1 ..= last_date + horizon`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    (1..=horizon as u64)
        .map(|offset| {
            last_date.checked_add_days(Days::new(offset)).ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Date overflow {} days after {}",
                    offset, last_date
                ))
            })
        })
        .collect()
}

/// Whether `dates` is strictly ascending and starts after `after`
pub fn strictly_after(after: NaiveDate, dates: &[NaiveDate]) -> bool {
    let mut previous = after;
    for &date in dates {
        if date <= previous {
            return false;
        }
        previous = date;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_future_dates_cross_month_end() {
        let dates = future_dates(date("2024-02-28"), 3).unwrap();
        assert_eq!(
            dates,
            vec![date("2024-02-29"), date("2024-03-01"), date("2024-03-02")]
        );
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        assert!(future_dates(date("2024-01-01"), 0).unwrap().is_empty());
    }

    #[test]
    fn test_strictly_after() {
        let last = date("2024-01-01");
        assert!(strictly_after(last, &[date("2024-01-02"), date("2024-01-05")]));
        assert!(!strictly_after(last, &[date("2024-01-01")]));
        assert!(!strictly_after(last, &[date("2024-01-03"), date("2024-01-02")]));
    }
}
