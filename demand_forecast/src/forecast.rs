//! Autoregressive demand forecasting
//!
//! The forecaster seeds a rolling window from a product's most recent
//! history, then steps one day at a time: build features against the
//! window, score them, clamp and round the prediction, and append it as a
//! synthetic observation so later days see it through their lags.

use crate::data::{DemandHistory, SalesPoint};
use crate::error::{ForecastError, Result};
use crate::features::build_features;
use crate::models::ModelArtifact;
use chrono::NaiveDate;
use serde::Serialize;

/// Trailing history rows used to seed a forecast window
pub const SEED_WINDOW_ROWS: usize = 100;

/// One forecasted day for one product.
///
/// Serializes as `{date, predicted_demand, price}` with an ISO-8601 date,
/// the row shape chat and dashboard consumers read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub date: NaiveDate,
    /// Predicted units, clamped at zero and rounded to a whole number
    pub predicted_demand: f64,
    /// Price assumed for the day, carried from the last observed price
    pub price: f64,
}

/// Rolls a trained model forward day by day for one product
#[derive(Debug, Clone)]
pub struct DemandForecaster {
    artifact: ModelArtifact,
    store: DemandHistory,
}

impl DemandForecaster {
    pub fn new(artifact: ModelArtifact, store: DemandHistory) -> Self {
        DemandForecaster { artifact, store }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn store(&self) -> &DemandHistory {
        &self.store
    }

    /// Forecast daily demand for the given horizon.
    ///
    /// Future days carry the product's last observed price and assume no
    /// promotion. Each prediction is appended to the window before the
    /// next day is built, so lag and rolling features roll forward over
    /// forecasted values once the horizon outruns real history.
    pub fn predict_for_product(&self, product_id: &str, days: usize) -> Result<Vec<ForecastEntry>> {
        if days == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast horizon must be at least 1 day".to_string(),
            ));
        }
        let mut window = self.store.recent_history(product_id, SEED_WINDOW_ROWS);
        if window.is_empty() {
            return Err(ForecastError::ProductNotFound(product_id.to_string()));
        }
        let mean_price = match self.store.mean_price(product_id) {
            Some(value) => value,
            None => return Err(ForecastError::ProductNotFound(product_id.to_string())),
        };

        let mut entries = Vec::with_capacity(days);
        for _ in 0..days {
            let last = window[window.len() - 1];
            let date = match last.date.succ_opt() {
                Some(date) => date,
                None => {
                    return Err(ForecastError::DataError(
                        "forecast date is out of the supported calendar range".to_string(),
                    ))
                }
            };
            let price = last.price;
            let record = build_features(date, product_id, price, false, mean_price, &window);
            let raw = self.artifact.predict_record(&record)?;
            let demand = raw.max(0.0).round();

            entries.push(ForecastEntry {
                date,
                predicted_demand: demand,
                price,
            });
            window.push(SalesPoint {
                date,
                demand,
                price,
                promotion: false,
            });
        }
        Ok(entries)
    }
}
