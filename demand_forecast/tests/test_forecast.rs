use chrono::{Duration, NaiveDate};
use demand_forecast::data::{DemandHistory, DemandRecord};
use demand_forecast::error::ForecastError;
use demand_forecast::features::build_feature_table;
use demand_forecast::forecast::{DemandForecaster, ForecastEntry};
use demand_forecast::generate::{generate_store, GeneratorConfig};
use demand_forecast::models::{train_model, GbdtParams};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// Helper function to train a forecaster on a small generated store
fn trained_forecaster() -> DemandForecaster {
    let config = GeneratorConfig {
        end_date: date(2022, 6, 30),
        n_products: 2,
        ..GeneratorConfig::default()
    };
    let store = generate_store(&config).unwrap();
    let table = build_feature_table(&store);
    let (train, validation) = table.split_by_days(20).unwrap();

    let params = GbdtParams {
        n_estimators: 20,
        min_samples_leaf: 5,
        early_stopping_rounds: 10,
        ..GbdtParams::default()
    };
    let artifact = train_model(&train, Some(&validation), params).unwrap();
    DemandForecaster::new(artifact, store)
}

#[test]
fn test_forecast_advances_day_by_day() {
    let forecaster = trained_forecaster();
    let entries = forecaster.predict_for_product("P001", 7).unwrap();

    assert_eq!(entries.len(), 7);
    // The generated store ends on 2022-06-30, so the horizon starts July 1st
    assert_eq!(entries[0].date, date(2022, 7, 1));
    for (offset, entry) in entries.iter().enumerate() {
        assert_eq!(entry.date, date(2022, 7, 1) + Duration::days(offset as i64));
    }

    // Price is carried forward from the last observed day, every step
    let window = forecaster.store().recent_history("P001", 1);
    for entry in &entries {
        assert_eq!(entry.price, window[0].price);
    }
}

#[test]
fn test_forecast_replay_is_deterministic() {
    let forecaster = trained_forecaster();
    let first = forecaster.predict_for_product("P001", 10).unwrap();
    let second = forecaster.predict_for_product("P001", 10).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_forecast_demand_is_whole_and_non_negative() {
    let forecaster = trained_forecaster();
    let entries = forecaster.predict_for_product("P002", 14).unwrap();

    assert_eq!(entries.len(), 14);
    for entry in entries {
        assert!(entry.predicted_demand >= 0.0);
        assert_eq!(entry.predicted_demand.fract(), 0.0);
    }
}

#[test]
fn test_unknown_product_is_rejected() {
    let forecaster = trained_forecaster();
    let result = forecaster.predict_for_product("P999", 7);
    assert!(matches!(result, Err(ForecastError::ProductNotFound(_))));
}

#[test]
fn test_zero_horizon_is_rejected() {
    let forecaster = trained_forecaster();
    let result = forecaster.predict_for_product("P001", 0);
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_flat_history_forecasts_flat() {
    let start = date(2022, 1, 1);
    let records: Vec<DemandRecord> = (0..100)
        .map(|i| DemandRecord {
            date: start + Duration::days(i),
            product_id: "P001".to_string(),
            product_name: "Coffee_Beans_Arabica".to_string(),
            price: 10.0,
            demand: 50.0,
            promotion: false,
        })
        .collect();
    let store = DemandHistory::from_records(records);
    let table = build_feature_table(&store);

    let params = GbdtParams {
        n_estimators: 5,
        min_samples_leaf: 5,
        ..GbdtParams::default()
    };
    let artifact = train_model(&table, None, params).unwrap();
    let forecaster = DemandForecaster::new(artifact, store);

    let entries = forecaster.predict_for_product("P001", 10).unwrap();
    assert_eq!(entries.len(), 10);
    for entry in entries {
        assert_eq!(entry.predicted_demand, 50.0);
        assert_eq!(entry.price, 10.0);
    }
}

#[test]
fn test_forecast_entry_json_shape() {
    let entry = ForecastEntry {
        date: date(2024, 1, 2),
        predicted_demand: 42.0,
        price: 9.99,
    };

    // Chat and dashboard consumers read exactly these keys
    let json = serde_json::to_string(&entry).unwrap();
    assert_eq!(
        json,
        r#"{"date":"2024-01-02","predicted_demand":42.0,"price":9.99}"#
    );
}

#[test]
fn test_forecast_sequence_serializes_per_day_rows() {
    let forecaster = trained_forecaster();
    let entries = forecaster.predict_for_product("P001", 3).unwrap();

    let json = serde_json::to_string(&entries).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["date"], "2022-07-01");
    for row in rows {
        assert!(row["predicted_demand"].as_f64().unwrap() >= 0.0);
        assert!(row["price"].as_f64().is_some());
    }
}
