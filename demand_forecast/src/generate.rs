//! Synthetic demand data generation
//!
//! Produces a multi-product daily history with the structure the model is
//! built to learn: weekend lift, an annual sine cycle, per-product trends,
//! holiday spikes, rare promotions, and price noise feeding a mild
//! elasticity. Output is deterministic for a fixed seed.

use crate::data::{DemandHistory, DemandRecord};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::path::Path;

/// Catalog names, assigned to ids P001 through P020 in order
pub const PRODUCT_NAMES: [&str; 20] = [
    "Coffee_Beans_Arabica",
    "Espresso_Machine_V1",
    "Milk_Frother_Pro",
    "Tea_Sampler_Green",
    "Chai_Latte_Mix",
    "Syrup_Vanilla_SugarFree",
    "Syrup_Caramel_Classic",
    "Mug_Insulated_Travel",
    "French_Press_Small",
    "Drip_Coffee_Maker",
    "Pastry_Mix_Croissant",
    "Honey_Local_12oz",
    "Sugar_Cane_Cubes",
    "Spoon_Set_Long",
    "Cleaning_Tablets_50ct",
    "Filter_Paper_Cone",
    "Water_Kettle_Electric",
    "Grinder_Blade_Mini",
    "Scale_Digital_Precision",
    "Decaf_Blend_House",
];

/// Settings for the synthetic generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Products to emit, at most the catalog size
    pub n_products: usize,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            n_products: PRODUCT_NAMES.len(),
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(ForecastError::InvalidParameter(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.n_products == 0 || self.n_products > PRODUCT_NAMES.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "n_products must be between 1 and {}",
                PRODUCT_NAMES.len()
            )));
        }
        Ok(())
    }
}

/// Generate a complete demand history in memory
pub fn generate_store(config: &GeneratorConfig) -> Result<DemandHistory> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let price_noise =
        Normal::new(0.0, 0.5).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
    let demand_noise =
        Normal::new(0.0, 8.0).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

    let mut records = Vec::new();
    let mut date = config.start_date;
    loop {
        let days_in_year = if date.leap_year() { 366.0 } else { 365.0 };
        let day_of_year = date.ordinal() as f64;
        let holiday_factor = match (date.month(), date.day()) {
            (12, 25) => 1.5,
            (1, 1) => 0.8,
            (7, 4) => 1.1,
            _ => 1.0,
        };
        let days_elapsed = (date - config.start_date).num_days() as f64;
        let weekly = if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            1.1
        } else {
            1.0
        };
        let annual = 1.0 + 0.2 * (2.0 * PI * day_of_year / days_in_year).sin();

        for index in 1..=config.n_products {
            let base = 50.0 + (index % 20) as f64 * 3.0;
            let trend_slope = if index % 2 == 1 { 0.0001 } else { -0.00005 };
            let trend_factor = 1.0 + trend_slope * days_elapsed;

            let promotion = rng.gen::<f64>() < 0.02;
            let promo_factor = if promotion { 1.5 } else { 1.0 };

            let base_price = 10.0 + (index % 10) as f64 * 0.5;
            let price = (((base_price + price_noise.sample(&mut rng)) * 100.0).round() / 100.0)
                .max(0.0);
            let elasticity = (1.0 - 0.05 * (price - base_price)).max(0.5);

            let expected = base
                * weekly
                * annual
                * trend_factor
                * holiday_factor
                * promo_factor
                * elasticity;
            let demand = (expected + demand_noise.sample(&mut rng)).round().max(0.0);

            records.push(DemandRecord {
                date,
                product_id: format!("P{:03}", index),
                product_name: PRODUCT_NAMES[index - 1].to_string(),
                price,
                demand,
                promotion,
            });
        }

        if date == config.end_date {
            break;
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    Ok(DemandHistory::from_records(records))
}

/// Write a history as CSV with prices at two decimals and promotions as
/// 1 or 0, creating parent directories as needed
pub fn write_store_csv(store: &DemandHistory, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["date", "product_id", "product_name", "price", "demand", "promotion"])?;
    for record in store.records() {
        writer.write_record([
            record.date.format("%Y-%m-%d").to_string(),
            record.product_id.clone(),
            record.product_name.clone(),
            format!("{:.2}", record.price),
            format!("{}", record.demand),
            if record.promotion { "1" } else { "0" }.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
