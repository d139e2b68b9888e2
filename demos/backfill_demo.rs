use bi_forecast_workspace::sales_forecast::logging::init_logging;
use bi_forecast_workspace::sales_forecast::pipeline::{CsvSink, CsvSource, ForecastPipeline};
use bi_forecast_workspace::{backtest_sources, EngineConfig, ForecastEngine};
use chrono::{Duration, NaiveDate};
use std::io::Write;
use tempfile::tempdir;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info")?;

    println!("Sales Forecast: Ensemble Demo");
    println!("=============================\n");

    // Synthetic export: weekly cycle on a rising trend, with a few gaps and blanks
    let dir = tempdir()?;
    let input = dir.path().join("daily_sales.csv");
    let mut file = std::fs::File::create(&input)?;
    writeln!(file, "order_date,sales")?;
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad start date")?;
    for day in 0..120i64 {
        if day % 29 == 13 {
            continue; // missing calendar day
        }
        let date = start + Duration::days(day);
        if day % 31 == 7 {
            writeln!(file, "{},", date)?; // blank value
            continue;
        }
        let weekend = if day % 7 >= 5 { 180.0 } else { 0.0 };
        let value = 1_000.0 + 4.0 * day as f64 + weekend;
        writeln!(file, "{},{:.2}", date, value)?;
    }
    drop(file);
    println!("Wrote sample history to {}\n", input.display());

    let config = EngineConfig::default();

    println!("Backtesting on the last 14 days...");
    let report = backtest_sources(&[&input], 14, config.clone())?;
    println!("{}", report.metrics);
    println!("Best single model: {}\n", report.metrics.best_model());

    println!("Forecasting the next 14 days...");
    let output = dir.path().join("forecast.csv");
    let mut pipeline = ForecastPipeline::new(
        ForecastEngine::new(config)?,
        CsvSource::new([&input]),
        CsvSink::new(&output),
    );
    let bundle = pipeline.run(14)?;

    println!(
        "{:<12}{:>16}{:>12}{:>14}{:>12}",
        "date", "seasonal_trend", "sequence", "boosted_tree", "ensemble"
    );
    for row in bundle.rows() {
        println!(
            "{:<12}{:>16.2}{:>12.2}{:>14.2}{:>12.2}",
            row.date.to_string(),
            row.seasonal_trend,
            row.sequence,
            row.boosted_tree,
            row.ensemble
        );
    }
    println!("\nForecast written to {}", output.display());

    Ok(())
}
