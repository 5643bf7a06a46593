use demand_forecast::data::DemandHistory;
use demand_forecast::features::build_feature_table;
use demand_forecast::metrics::evaluate_artifact;
use demand_forecast::models::ModelArtifact;
use std::env;

/// Held-out test window, matching the split used at training time
const TEST_DAYS: i64 = 90;

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

    println!("Holdout Evaluation");
    println!("==================");

    println!("Loading model from: {}", model_path);
    let artifact = ModelArtifact::load(model_path)?;
    let store = DemandHistory::from_csv(data_path)?;
    let table = build_feature_table(&store);
    let (_, holdout) = table.split_by_days(TEST_DAYS)?;

    let report = evaluate_artifact(&artifact, &holdout)?;
    println!("{}", report);

    Ok(())
}
