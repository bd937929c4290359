use chrono::NaiveDate;
use forecast_rate::data::{frame_points, Bar, QuoteSeries};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn test_read_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,open,high,low,close").unwrap();
    writeln!(file, "2023-01-03,106.0,110.0,104.0,108.0").unwrap();
    writeln!(file, "2023-01-01,100.0,105.0,98.0,103.0").unwrap();
    writeln!(file, "2023-01-02,103.0,107.0,101.0,106.0").unwrap();

    let series = QuoteSeries::read_csv(file.path()).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.first().unwrap().date, date("2023-01-01"));
    assert_eq!(series.latest_close(), Some(108.0));
}

#[test]
fn test_csv_export_reads_back() {
    let series = QuoteSeries::from_bars(vec![
        Bar::new(date("2024-03-01"), 32.1, 32.4, 31.9, 32.2),
        Bar::new(date("2024-03-04"), 32.2, 32.6, 32.0, 32.5),
    ]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("USDTRY.csv");
    series.write_csv(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("date,open,high,low,close\n2024-03-01,"));
    assert_eq!(QuoteSeries::read_csv(&path).unwrap(), series);
}

#[test]
fn test_empty_series_exports_header_only() {
    let mut out = Vec::new();
    QuoteSeries::empty().to_csv_writer(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "date,open,high,low,close\n");
}

#[test]
fn test_read_csv_drops_invalid_rows() {
    let csv = "date,open,high,low,close\n\
               2024-01-01,1.0,1.0,1.0,1.0\n\
               2024-01-02,0.0,0.0,0.0,0.0\n\
               2024-01-03,2.0,2.0,2.0,2.0\n";
    let series = QuoteSeries::from_csv_reader(csv.as_bytes()).unwrap();
    assert_eq!(series.dates(), vec![date("2024-01-01"), date("2024-01-03")]);
}

#[test]
fn test_read_csv_error_handling() {
    assert!(QuoteSeries::read_csv("nonexistent_file.csv").is_err());

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,open,high,low,close").unwrap();
    writeln!(file, "not-a-date,1.0,1.0,1.0,1.0").unwrap();
    assert!(QuoteSeries::read_csv(file.path()).is_err());
}

#[test]
fn test_model_frame_collapses_duplicates_keeping_last() {
    let series = QuoteSeries::from_closes(vec![
        (date("2024-01-02"), 5.0),
        (date("2024-01-01"), 4.0),
        (date("2024-01-02"), 6.0),
    ]);
    let frame = series.to_model_frame().unwrap();

    assert_eq!(frame.get_column_names(), vec!["ds", "y"]);
    assert_eq!(
        frame_points(&frame).unwrap(),
        vec![(date("2024-01-01"), 4.0), (date("2024-01-02"), 6.0)]
    );
}

#[test]
fn test_series_serializes_as_bar_list() {
    let series = QuoteSeries::from_closes(vec![(date("2024-01-01"), 1.5)]);
    let json = serde_json::to_string(&series).unwrap();
    assert_eq!(
        json,
        r#"[{"date":"2024-01-01","open":1.5,"high":1.5,"low":1.5,"close":1.5}]"#
    );
}
