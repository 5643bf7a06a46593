//! # Demand Forecast
//!
//! A Rust library for per-product daily demand forecasting with
//! gradient-boosted trees.
//!
//! ## Features
//!
//! - Historical store loading (date, product, price, demand, promotion)
//! - Calendar, lag, and rolling feature engineering that is identical in
//!   batch and step-by-step form
//! - Date-cutoff train/validation/test splitting
//! - Histogram-based boosted-tree training with early stopping and
//!   native categorical splits
//! - Autoregressive multi-day forecasting that feeds each prediction
//!   back into the rolling history
//! - Holdout evaluation (MAE, RMSE, R2), a synthetic data generator,
//!   and a rule-based query parser for chat-style requests
//!
//! ## Quick Start
//!
//! ```rust
//! use demand_forecast::features::build_feature_table;
//! use demand_forecast::forecast::DemandForecaster;
//! use demand_forecast::generate::{generate_store, GeneratorConfig};
//! use demand_forecast::models::{train_model, GbdtParams};
//!
//! # fn main() -> demand_forecast::error::Result<()> {
//! // A small synthetic store: two products over half a year
//! let config = GeneratorConfig {
//!     end_date: chrono::NaiveDate::from_ymd_opt(2022, 6, 30).unwrap(),
//!     n_products: 2,
//!     ..GeneratorConfig::default()
//! };
//! let store = generate_store(&config)?;
//!
//! // Engineer features and hold out the last 30 days for validation
//! let table = build_feature_table(&store);
//! let (train, validation) = table.split_by_days(30)?;
//!
//! // Train with a small budget, then forecast two weeks ahead
//! let params = GbdtParams {
//!     n_estimators: 40,
//!     early_stopping_rounds: 10,
//!     ..GbdtParams::default()
//! };
//! let artifact = train_model(&train, Some(&validation), params)?;
//! let forecaster = DemandForecaster::new(artifact, store);
//! let entries = forecaster.predict_for_product("P001", 14)?;
//! assert_eq!(entries.len(), 14);
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod features;
pub mod forecast;
pub mod generate;
pub mod metrics;
pub mod models;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use crate::data::{DemandHistory, DemandRecord, SalesPoint};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{build_feature_table, build_features, FeatureRecord, FeatureTable};
pub use crate::forecast::{DemandForecaster, ForecastEntry};
pub use crate::metrics::EvaluationReport;
pub use crate::models::{train_model, GbdtModel, GbdtParams, ModelArtifact};
pub use crate::schema::FeatureSchema;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
