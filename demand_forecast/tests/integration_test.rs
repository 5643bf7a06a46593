use chrono::NaiveDate;
use demand_forecast::data::DemandHistory;
use demand_forecast::error::ForecastError;
use demand_forecast::features::build_feature_table;
use demand_forecast::forecast::DemandForecaster;
use demand_forecast::generate::{generate_store, write_store_csv, GeneratorConfig};
use demand_forecast::metrics::evaluate_artifact;
use demand_forecast::models::{train_model, GbdtParams, ModelArtifact};
use demand_forecast::query::{format_reply, parse_request};
use tempfile::{tempdir, NamedTempFile};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_full_pipeline_workflow() {
    // 1. Generate a synthetic store and persist it as CSV
    let config = GeneratorConfig {
        end_date: date(2023, 3, 31),
        n_products: 3,
        ..GeneratorConfig::default()
    };
    let generated = generate_store(&config).unwrap();
    let data_file = NamedTempFile::new().unwrap();
    write_store_csv(&generated, data_file.path()).unwrap();

    // 2. Load it back
    let store = DemandHistory::from_csv(data_file.path()).unwrap();
    assert_eq!(store.len(), 3 * 455);

    // 3. Build features; each product loses the 60-day lag warm-up
    let table = build_feature_table(&store);
    assert_eq!(table.len(), 3 * 395);

    // 4. Hold out the most recent 60 days, then carve a validation slice
    let (train, test) = table.split_by_days(60).unwrap();
    let (train, validation) = train.split_by_days(30).unwrap();
    assert_eq!(test.len(), 3 * 60);
    assert_eq!(validation.len(), 3 * 30);

    // 5. Train with early stopping
    let params = GbdtParams {
        n_estimators: 150,
        learning_rate: 0.05,
        min_samples_leaf: 5,
        early_stopping_rounds: 30,
        ..GbdtParams::default()
    };
    let artifact = train_model(&train, Some(&validation), params).unwrap();
    assert!(artifact.model().n_trees() >= 1);

    // 6. Evaluate on the holdout
    let report = evaluate_artifact(&artifact, &test).unwrap();
    assert_eq!(report.n_rows, test.len());
    assert!(report.mae.is_finite() && report.mae >= 0.0);
    assert!(report.rmse >= report.mae);

    // 7. Round-trip the artifact through disk
    let model_dir = tempdir().unwrap();
    let model_path = model_dir.path().join("model.json");
    artifact.save(&model_path).unwrap();
    let loaded = ModelArtifact::load(&model_path).unwrap();
    assert_eq!(
        loaded.predict_table(&test).unwrap(),
        artifact.predict_table(&test).unwrap()
    );

    // 8. Forecast forward from the end of the history
    let forecaster = DemandForecaster::new(loaded, store.clone());
    let entries = forecaster.predict_for_product("P002", 14).unwrap();
    assert_eq!(entries.len(), 14);
    assert_eq!(entries[0].date, date(2023, 4, 1));
    assert_eq!(entries[13].date, date(2023, 4, 14));
    for entry in &entries {
        assert!(entry.predicted_demand >= 0.0);
        assert_eq!(entry.predicted_demand.fract(), 0.0);
    }

    // 9. Answer a chat-style request end to end
    let catalog = store.catalog();
    let request = parse_request(
        "How much Milk_Frother_Pro will we need for the next 2 weeks?",
        &catalog,
    )
    .unwrap();
    assert_eq!(request.product_id, "P003");
    assert_eq!(request.days, 14);

    let entries = forecaster
        .predict_for_product(&request.product_id, request.days)
        .unwrap();
    let reply = format_reply(&catalog[&request.product_id], request.days, &entries);
    assert!(reply.starts_with("Forecast for Milk Frother Pro over the next 14 days:"));
    assert_eq!(reply.lines().count(), 3 + 14);

    // 10. Test error handling
    let result = DemandHistory::from_csv("/nonexistent/path.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));
}

#[test]
fn test_chat_request_drives_forecaster() {
    let config = GeneratorConfig {
        end_date: date(2022, 10, 31),
        n_products: 2,
        ..GeneratorConfig::default()
    };
    let store = generate_store(&config).unwrap();
    let table = build_feature_table(&store);
    let (train, validation) = table.split_by_days(20).unwrap();

    let params = GbdtParams {
        n_estimators: 40,
        min_samples_leaf: 5,
        early_stopping_rounds: 10,
        ..GbdtParams::default()
    };
    let artifact = train_model(&train, Some(&validation), params).unwrap();
    let forecaster = DemandForecaster::new(artifact, store.clone());

    let catalog = store.catalog();
    let request = parse_request("p001 for 10 days", &catalog).unwrap();
    assert_eq!(request.product_id, "P001");
    assert_eq!(request.days, 10);

    let entries = forecaster
        .predict_for_product(&request.product_id, request.days)
        .unwrap();
    let reply = format_reply(&catalog[&request.product_id], request.days, &entries);

    let total: f64 = entries.iter().map(|e| e.predicted_demand).sum();
    assert!(reply.contains(&format!("Total Predicted Demand: {:.0} units.", total)));
    assert_eq!(reply.lines().count(), 3 + 10);
}
