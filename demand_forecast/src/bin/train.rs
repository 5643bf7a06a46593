use demand_forecast::data::DemandHistory;
use demand_forecast::features::build_feature_table;
use demand_forecast::metrics::evaluate_artifact;
use demand_forecast::models::{train_model, GbdtParams};
use std::env;

/// Held-out test window, in days off the end of the history
const TEST_DAYS: i64 = 90;

/// Validation window carved off the end of the remaining training data
const VALIDATION_DAYS: i64 = 30;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let data_path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("data/product_demand.csv");
    let model_path = args
        .get(2)
        .map(String::as_str)
        .unwrap_or("models/demand_gbdt.json");

    println!("Demand Model Training");
    println!("=====================");

    println!("Loading {} ...", data_path);
    let store = DemandHistory::from_csv(data_path)?;
    let table = build_feature_table(&store);
    println!(
        "Built {} feature rows for {} products",
        table.len(),
        store.product_ids().len()
    );

    let (full_train, test) = table.split_by_days(TEST_DAYS)?;
    let (train, validation) = full_train.split_by_days(VALIDATION_DAYS)?;
    println!(
        "Train rows: {} | Validation rows: {} | Test rows: {}",
        train.len(),
        validation.len(),
        test.len()
    );

    println!("\nTraining ...");
    let artifact = train_model(&train, Some(&validation), GbdtParams::default())?;
    println!(
        "Kept {} trees (best iteration {})",
        artifact.model().n_trees(),
        artifact.model().best_iteration()
    );
    if let Some(rmse) = artifact.model().best_validation_rmse() {
        println!("Best validation RMSE: {:.4}", rmse);
    }

    artifact.save(model_path)?;
    println!("Model saved at: {}", model_path);

    let report = evaluate_artifact(&artifact, &test)?;
    println!("\n{}", report);

    Ok(())
}
