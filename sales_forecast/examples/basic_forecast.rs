use chrono::NaiveDate;
use sales_forecast::models::ModelKind;
use sales_forecast::{EngineConfig, ForecastEngine, TimeSeriesData};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Sales Forecast: Basic Forecasting Example");
    println!("=========================================\n");

    // Create sample data
    println!("Creating sample data...");
    let history = create_sample_daily_sales()?;
    println!("Sample data created: {} daily points\n", history.len());

    // Blend towards the seasonal model and shrink the network for a quick run
    let config = EngineConfig::from_json_str(
        r#"{
            "sequence": { "hidden_units": 16, "epochs": 20 },
            "weights": { "seasonal_trend": 0.5, "sequence": 0.2, "boosted_tree": 0.3 }
        }"#,
    )?;

    println!("Training models...");
    let mut engine = ForecastEngine::new(config)?;
    engine.train(&history)?;
    println!("Models trained successfully\n");

    println!("Generating forecasts...");
    let bundle = engine.forecast(&history, 7)?;
    for kind in ModelKind::ALL {
        let values: Vec<String> = bundle
            .model_series(kind)?
            .values()
            .iter()
            .map(|v| format!("{:.1}", v))
            .collect();
        println!("{:>15}: [{}]", kind, values.join(", "));
    }
    for row in bundle.rows() {
        println!("  {} ensemble {:.2}", row.date, row.ensemble);
    }

    println!("\nForecasting complete!");
    Ok(())
}

fn create_sample_daily_sales() -> Result<TimeSeriesData, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;
    let values = (0..90)
        .map(|day| {
            let weekly = [0.0, -20.0, -10.0, 0.0, 30.0, 80.0, 60.0][day % 7];
            500.0 + 1.5 * day as f64 + weekly
        })
        .collect();
    Ok(TimeSeriesData::daily(start, values)?)
}
