use chrono::NaiveDate;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use sales_forecast::data::{CleanOptions, Cleaner, DataLoader, TimeSeriesData};
use sales_forecast::ForecastError;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_data_loader_from_csv() {
    let file = csv_file(&[
        "order_date,region,sales",
        "2023-01-01,north,1000.0",
        "2023-01-02,north,1200.5",
        "2023-01-03,north,980.0",
    ]);

    let data = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data.dates()[0], date(2023, 1, 1));
    assert_eq!(data.values(), &[1000.0, 1200.5, 980.0]);
}

#[test]
fn test_value_column_falls_back_to_first_numeric() {
    let file = csv_file(&["date,units", "2023-05-01,4", "2023-05-02,6"]);
    let data = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(data.values(), &[4.0, 6.0]);
}

#[test]
fn test_missing_values_filled_with_mean() {
    let file = csv_file(&["date,revenue", "2023-01-01,10", "2023-01-02,", "2023-01-03,30"]);
    let data = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(data.value_on(date(2023, 1, 2)), Some(20.0));
}

#[test]
fn test_unparseable_date() {
    let file = csv_file(&["date,sales", "not-a-date,10"]);
    assert!(matches!(
        DataLoader::from_csv(file.path()),
        Err(ForecastError::InvalidInput(_))
    ));
}

#[test]
fn test_no_date_column() {
    let file = csv_file(&["region,sales", "north,10"]);
    assert!(matches!(
        DataLoader::from_csv(file.path()),
        Err(ForecastError::InvalidInput(_))
    ));
}

#[test]
fn test_missing_file() {
    assert!(DataLoader::from_csv("nonexistent_file.csv").is_err());
}

#[test]
fn test_from_sources_concatenates() {
    let january = csv_file(&["date,sales", "2023-01-01,1", "2023-01-02,2"]);
    let february = csv_file(&["date,sales", "2023-01-02,2", "2023-01-03,3"]);

    let data = DataLoader::from_sources(&[january.path(), february.path()], &Cleaner::default())
        .unwrap();
    // The overlapping row is an exact duplicate and is dropped
    assert_eq!(data.len(), 3);
}

#[test]
fn test_from_sources_keeps_duplicates_when_asked() {
    let a = csv_file(&["date,sales", "2023-01-01,1"]);
    let b = csv_file(&["date,sales", "2023-01-01,1"]);
    let cleaner = Cleaner::new(CleanOptions {
        remove_duplicates: false,
        fill_nulls: true,
    });

    let data = DataLoader::from_sources(&[a.path(), b.path()], &cleaner).unwrap();
    assert_eq!(data.len(), 2);
    // Repeated dates are rejected once the series is ordered
    assert!(data.sorted().is_err());
}

#[test]
fn test_validate_sources() {
    let empty: [&str; 0] = [];
    assert!(matches!(
        DataLoader::validate_sources(&empty),
        Err(ForecastError::InvalidInput(_))
    ));

    match DataLoader::validate_sources(&["missing/sales.csv"]) {
        Err(ForecastError::InvalidInput(message)) => assert!(message.contains("missing/sales.csv")),
        other => panic!("expected missing source error, got {:?}", other),
    }
}

#[test]
fn test_dataframe_round_trip() {
    let series = TimeSeriesData::daily(date(2024, 2, 27), vec![1.0, 2.0, 3.0]).unwrap();
    let df = series.to_dataframe().unwrap();
    assert_eq!(df.height(), 3);
    assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);

    let loaded = DataLoader::from_dataframe(&df).unwrap();
    assert_eq!(loaded, series);
}
