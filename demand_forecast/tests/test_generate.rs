use chrono::NaiveDate;
use demand_forecast::data::DemandHistory;
use demand_forecast::error::ForecastError;
use demand_forecast::generate::{generate_store, write_store_csv, GeneratorConfig, PRODUCT_NAMES};
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn small_config() -> GeneratorConfig {
    GeneratorConfig {
        end_date: date(2022, 1, 31),
        n_products: 3,
        ..GeneratorConfig::default()
    }
}

#[test]
fn test_generation_is_deterministic() {
    let first = generate_store(&small_config()).unwrap();
    let second = generate_store(&small_config()).unwrap();
    assert_eq!(first.records(), second.records());
}

#[test]
fn test_default_store_shape() {
    let store = generate_store(&GeneratorConfig::default()).unwrap();

    // 2022 through 2024 is 1096 days (2024 is a leap year)
    assert_eq!(store.len(), 1096 * 20);
    assert_eq!(store.product_ids().len(), 20);
    assert_eq!(store.min_date(), Some(date(2022, 1, 1)));
    assert_eq!(store.max_date(), Some(date(2024, 12, 31)));
    assert!(store.records().iter().any(|r| r.promotion));
}

#[test]
fn test_small_store_counts() {
    let store = generate_store(&small_config()).unwrap();
    assert_eq!(store.len(), 31 * 3);
    for id in store.product_ids() {
        assert_eq!(store.product_records(&id).len(), 31);
    }
}

#[test]
fn test_values_are_rounded_and_non_negative() {
    let store = generate_store(&small_config()).unwrap();
    for record in store.records() {
        assert!(record.price >= 0.0);
        assert_eq!((record.price * 100.0).round() / 100.0, record.price);
        assert!(record.demand >= 0.0);
        assert_eq!(record.demand.fract(), 0.0);
    }
}

#[test]
fn test_catalog_uses_fixed_names() {
    let config = GeneratorConfig {
        end_date: date(2022, 1, 5),
        ..GeneratorConfig::default()
    };
    let store = generate_store(&config).unwrap();
    let catalog = store.catalog();

    assert_eq!(catalog.len(), 20);
    assert_eq!(catalog["P001"], "Coffee_Beans_Arabica");
    assert_eq!(catalog["P020"], "Decaf_Blend_House");
    assert_eq!(catalog["P001"], PRODUCT_NAMES[0]);
    assert_eq!(catalog["P020"], PRODUCT_NAMES[19]);
}

#[test]
fn test_csv_round_trip() {
    let store = generate_store(&small_config()).unwrap();

    let file = NamedTempFile::new().unwrap();
    write_store_csv(&store, file.path()).unwrap();

    let loaded = DemandHistory::from_csv(file.path()).unwrap();
    assert_eq!(loaded.records(), store.records());
}

#[test]
fn test_config_validation() {
    let swapped = GeneratorConfig {
        start_date: date(2023, 1, 1),
        end_date: date(2022, 1, 1),
        ..GeneratorConfig::default()
    };
    assert!(matches!(
        swapped.validate(),
        Err(ForecastError::InvalidParameter(_))
    ));

    let none = GeneratorConfig {
        n_products: 0,
        ..GeneratorConfig::default()
    };
    assert!(matches!(
        none.validate(),
        Err(ForecastError::InvalidParameter(_))
    ));

    let too_many = GeneratorConfig {
        n_products: 21,
        ..GeneratorConfig::default()
    };
    assert!(matches!(
        generate_store(&too_many),
        Err(ForecastError::InvalidParameter(_))
    ));
}
