use chrono::NaiveDate;
use demand_forecast::features::build_feature_table;
use demand_forecast::forecast::DemandForecaster;
use demand_forecast::generate::{generate_store, GeneratorConfig};
use demand_forecast::metrics::evaluate_artifact;
use demand_forecast::models::{train_model, GbdtParams};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Demand Forecast: End-to-End Example");
    println!("===================================\n");

    // Generate a small in-memory history
    println!("Generating sample history...");
    let config = GeneratorConfig {
        end_date: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
        n_products: 3,
        ..GeneratorConfig::default()
    };
    let store = generate_store(&config)?;
    println!(
        "Generated {} records for {} products\n",
        store.len(),
        store.product_ids().len()
    );

    // Build features, hold out the last 30 days, and carve a validation
    // window off the end of what remains
    let table = build_feature_table(&store);
    let (full_train, holdout) = table.split_by_days(30)?;
    let (train, validation) = full_train.split_by_days(30)?;
    println!(
        "Feature rows: {} train / {} validation / {} holdout\n",
        train.len(),
        validation.len(),
        holdout.len()
    );

    // Train with a small budget so the example stays quick
    println!("Training...");
    let params = GbdtParams {
        n_estimators: 80,
        early_stopping_rounds: 20,
        ..GbdtParams::default()
    };
    let artifact = train_model(&train, Some(&validation), params)?;
    println!("Kept {} trees\n", artifact.model().n_trees());

    // Score the holdout window
    let report = evaluate_artifact(&artifact, &holdout)?;
    println!("{}\n", report);

    // Forecast a week ahead for one product
    let forecaster = DemandForecaster::new(artifact, store);
    let entries = forecaster.predict_for_product("P001", 7)?;
    println!("Next week for P001:");
    for entry in &entries {
        println!("  {}: {:>5.0} units", entry.date, entry.predicted_demand);
    }

    Ok(())
}
