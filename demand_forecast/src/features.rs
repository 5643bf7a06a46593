//! Feature engineering for the demand model
//!
//! One single-row builder serves both training-time (batch) and
//! forecast-time (incremental) construction. The batch path calls the same
//! function once per historical row, so the two paths cannot drift apart.

use crate::data::{DemandHistory, SalesPoint};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use statrs::statistics::Statistics;
use std::f64::consts::PI;

/// Lag offsets, in days, for the demand and price lag features
pub const LAG_OFFSETS: [usize; 6] = [1, 7, 14, 28, 42, 60];

/// Longest lag offset; batch mode drops rows with less prior history
pub const WARMUP_DAYS: usize = 60;

/// Model input columns in training order, product identifier first
pub const FEATURE_COLUMNS: [&str; 36] = [
    "product_id",
    "price",
    "promotion",
    "product_num",
    "id_group",
    "is_christmas",
    "is_newyear",
    "is_july4",
    "price_diff",
    "price_ratio",
    "days_elapsed",
    "trend_direction",
    "trend_sim",
    "day",
    "day_of_year",
    "sin_annual",
    "cos_annual",
    "demand_lag_1",
    "demand_lag_7",
    "demand_lag_14",
    "demand_lag_28",
    "demand_lag_42",
    "demand_lag_60",
    "price_lag_1",
    "price_lag_7",
    "price_lag_14",
    "price_lag_28",
    "price_lag_42",
    "price_lag_60",
    "rolling_7_mean",
    "rolling_28_mean",
    "rolling_7_std",
    "dayofweek",
    "month",
    "is_weekend",
    "product_month_interaction",
];

/// Columns carried as enumerated categories rather than numerics
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["product_id", "product_month_interaction"];

/// Fixed epoch for the days-elapsed feature
pub fn feature_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
}

/// Engineered inputs for one (date, product) pair.
///
/// Every field is always populated. Lag and rolling features fall back to
/// the mean of available history when the buffer is shorter than the span,
/// and degenerate statistics (std of fewer than two points, ratio against a
/// zero mean price) substitute safe defaults instead of NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    /// Target date the row describes
    pub date: NaiveDate,
    /// Product identifier, used as a categorical input
    pub product_id: String,
    /// Composite "product_id × month" categorical token
    pub product_month: String,
    /// Price assumed for the target date
    pub price: f64,
    /// Promotion flag for the target date, 0 or 1
    pub promotion: f64,
    /// Numeric suffix parsed from the product identifier, 0 when absent
    pub product_num: f64,
    /// Parity group (0 or 1) of the numeric suffix
    pub id_group: f64,
    pub is_christmas: f64,
    pub is_newyear: f64,
    pub is_july4: f64,
    /// Price minus the product's all-time mean price
    pub price_diff: f64,
    /// Price over the product's all-time mean price, 1 when the mean is 0
    pub price_ratio: f64,
    /// Days since 2022-01-01, negative for earlier dates
    pub days_elapsed: f64,
    /// +1 for odd-numbered products, -1 for even
    pub trend_direction: f64,
    /// Trend interaction: days_elapsed times trend_direction
    pub trend_sim: f64,
    /// Day of month
    pub day: f64,
    /// Day of year, 1-based
    pub day_of_year: f64,
    /// Annual harmonics over a fixed 365.25-day period. Leap days shift
    /// the phase slightly; this is the convention the model is trained on.
    pub sin_annual: f64,
    pub cos_annual: f64,
    /// Demand at each of `LAG_OFFSETS` days back, by position
    pub demand_lags: [f64; 6],
    /// Price at each of `LAG_OFFSETS` days back, by position
    pub price_lags: [f64; 6],
    /// Trailing 7-day mean of demand, current day excluded
    pub rolling_7_mean: f64,
    /// Trailing 28-day mean of demand, current day excluded
    pub rolling_28_mean: f64,
    /// Trailing 7-day sample standard deviation of demand, 0 when undefined
    pub rolling_7_std: f64,
    /// Day of week, Monday = 0
    pub dayofweek: f64,
    pub month: f64,
    pub is_weekend: f64,
}

impl FeatureRecord {
    /// Look up a numeric feature by column name
    pub fn numeric_value(&self, column: &str) -> Option<f64> {
        let value = match column {
            "price" => self.price,
            "promotion" => self.promotion,
            "product_num" => self.product_num,
            "id_group" => self.id_group,
            "is_christmas" => self.is_christmas,
            "is_newyear" => self.is_newyear,
            "is_july4" => self.is_july4,
            "price_diff" => self.price_diff,
            "price_ratio" => self.price_ratio,
            "days_elapsed" => self.days_elapsed,
            "trend_direction" => self.trend_direction,
            "trend_sim" => self.trend_sim,
            "day" => self.day,
            "day_of_year" => self.day_of_year,
            "sin_annual" => self.sin_annual,
            "cos_annual" => self.cos_annual,
            "demand_lag_1" => self.demand_lags[0],
            "demand_lag_7" => self.demand_lags[1],
            "demand_lag_14" => self.demand_lags[2],
            "demand_lag_28" => self.demand_lags[3],
            "demand_lag_42" => self.demand_lags[4],
            "demand_lag_60" => self.demand_lags[5],
            "price_lag_1" => self.price_lags[0],
            "price_lag_7" => self.price_lags[1],
            "price_lag_14" => self.price_lags[2],
            "price_lag_28" => self.price_lags[3],
            "price_lag_42" => self.price_lags[4],
            "price_lag_60" => self.price_lags[5],
            "rolling_7_mean" => self.rolling_7_mean,
            "rolling_28_mean" => self.rolling_28_mean,
            "rolling_7_std" => self.rolling_7_std,
            "dayofweek" => self.dayofweek,
            "month" => self.month,
            "is_weekend" => self.is_weekend,
            _ => return None,
        };
        Some(value)
    }

    /// Look up a categorical feature by column name
    pub fn categorical_value(&self, column: &str) -> Option<&str> {
        match column {
            "product_id" => Some(&self.product_id),
            "product_month_interaction" => Some(&self.product_month),
            _ => None,
        }
    }
}

/// Build the feature record for one (date, product) pair.
///
/// `history` holds that product's prior rows in ascending date order and
/// must not include the target date itself. `mean_price` is the product's
/// all-time mean price from the historical store. Pure function, no side
/// effects; this is the incremental path and the unit the batch path loops.
pub fn build_features(
    date: NaiveDate,
    product_id: &str,
    price: f64,
    promotion: bool,
    mean_price: f64,
    history: &[SalesPoint],
) -> FeatureRecord {
    let demand_history: Vec<f64> = history.iter().map(|p| p.demand).collect();
    let price_history: Vec<f64> = history.iter().map(|p| p.price).collect();

    let product_num = product_number(product_id);
    let id_group = (product_num % 2) as f64;
    let trend_direction = if product_num % 2 == 1 { 1.0 } else { -1.0 };
    let days_elapsed = (date - feature_epoch()).num_days() as f64;

    let day = date.day() as f64;
    let month = date.month() as f64;
    let dayofweek = date.weekday().num_days_from_monday() as f64;
    let day_of_year = date.ordinal() as f64;
    let annual_phase = 2.0 * PI * day_of_year / 365.25;

    let price_ratio = if mean_price.abs() > f64::EPSILON {
        price / mean_price
    } else {
        1.0
    };

    let mut demand_lags = [0.0; 6];
    let mut price_lags = [0.0; 6];
    for (k, &lag) in LAG_OFFSETS.iter().enumerate() {
        demand_lags[k] = lag_or_mean(&demand_history, lag);
        price_lags[k] = lag_or_mean(&price_history, lag);
    }

    FeatureRecord {
        date,
        product_id: product_id.to_string(),
        product_month: format!("{}_{}", product_id, date.month()),
        price,
        promotion: if promotion { 1.0 } else { 0.0 },
        product_num: product_num as f64,
        id_group,
        is_christmas: flag(date.month() == 12 && date.day() == 25),
        is_newyear: flag(date.month() == 1 && date.day() == 1),
        is_july4: flag(date.month() == 7 && date.day() == 4),
        price_diff: price - mean_price,
        price_ratio,
        days_elapsed,
        trend_direction,
        trend_sim: days_elapsed * trend_direction,
        day,
        day_of_year,
        sin_annual: annual_phase.sin(),
        cos_annual: annual_phase.cos(),
        demand_lags,
        price_lags,
        rolling_7_mean: trailing_mean(&demand_history, 7),
        rolling_28_mean: trailing_mean(&demand_history, 28),
        rolling_7_std: trailing_std(&demand_history, 7),
        dayofweek,
        month,
        is_weekend: flag(dayofweek >= 5.0),
    }
}

/// One feature record together with its training target
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub record: FeatureRecord,
    /// Observed demand on the record's date
    pub demand: f64,
}

/// Feature rows for every product/date with a full lag warm-up
#[derive(Debug, Clone)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Wrap prebuilt rows into a table
    pub fn from_rows(rows: Vec<FeatureRow>) -> Self {
        FeatureTable { rows }
    }

    /// The rows in product-then-date order
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Training targets in row order
    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.demand).collect()
    }

    /// Latest date in the table
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.record.date).max()
    }

    /// Split into (train, test) at the cutoff `max(date) - test_size_days`.
    ///
    /// Train keeps dates at or before the cutoff, test keeps dates after
    /// it. Splitting is always by date, never by row index, so no test-day
    /// information can precede a training day.
    pub fn split_by_days(&self, test_size_days: i64) -> Result<(FeatureTable, FeatureTable)> {
        if test_size_days < 1 {
            return Err(ForecastError::InvalidParameter(format!(
                "test_size_days must be at least 1, got {}",
                test_size_days
            )));
        }
        let max_date = self.max_date().ok_or_else(|| {
            ForecastError::ConfigError("cannot split an empty feature table".to_string())
        })?;
        let cutoff = max_date - Duration::days(test_size_days);

        let (train, test): (Vec<FeatureRow>, Vec<FeatureRow>) = self
            .rows
            .iter()
            .cloned()
            .partition(|row| row.record.date <= cutoff);

        if train.is_empty() {
            return Err(ForecastError::ConfigError(format!(
                "a {}-day test window leaves no training rows before {}",
                test_size_days, cutoff
            )));
        }

        Ok((FeatureTable { rows: train }, FeatureTable { rows: test }))
    }
}

/// Build the training feature table for every product in the store.
///
/// Each product's first `WARMUP_DAYS` rows only feed history; feature rows
/// start once a full 60-day lag span exists, matching the warm-up drop the
/// model is trained under. Every emitted row comes from `build_features`
/// with the rows before it as history.
pub fn build_feature_table(store: &DemandHistory) -> FeatureTable {
    let mut rows = Vec::new();

    for product_id in store.product_ids() {
        let records = store.product_records(&product_id);
        let mean_price = store.mean_price(&product_id).unwrap_or(0.0);
        let window: Vec<SalesPoint> = records.iter().map(SalesPoint::from).collect();

        for i in WARMUP_DAYS..window.len() {
            let current = window[i];
            let record = build_features(
                current.date,
                &product_id,
                current.price,
                current.promotion,
                mean_price,
                &window[..i],
            );
            rows.push(FeatureRow {
                record,
                demand: current.demand,
            });
        }
    }

    FeatureTable { rows }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// First contiguous digit run in the identifier, 0 when none parses
fn product_number(product_id: &str) -> u32 {
    let digits: String = product_id
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Value exactly `lag` positions back, or the mean of available history
/// when the buffer is shorter than the lag span
fn lag_or_mean(values: &[f64], lag: usize) -> f64 {
    if lag > 0 && values.len() >= lag {
        values[values.len() - lag]
    } else {
        mean_or_zero(values)
    }
}

/// Mean over the trailing `window` values, shrinking to what is available
fn trailing_mean(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len().saturating_sub(window)..];
    mean_or_zero(tail)
}

/// Sample standard deviation over the trailing `window` values; 0 when
/// fewer than two points are available
fn trailing_std(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len().saturating_sub(window)..];
    if tail.len() < 2 {
        return 0.0;
    }
    let sd = tail.std_dev();
    if sd.is_nan() {
        0.0
    } else {
        sd
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_number_parses_first_digit_run() {
        assert_eq!(product_number("P007"), 7);
        assert_eq!(product_number("P012X3"), 12);
        assert_eq!(product_number("decaf"), 0);
    }

    #[test]
    fn test_lag_or_mean_falls_back_to_mean() {
        let values = [10.0, 20.0, 30.0];

        // Lag 2 reaches back two positions, lag 3 to the oldest value
        assert_eq!(lag_or_mean(&values, 2), 20.0);
        assert_eq!(lag_or_mean(&values, 3), 10.0);

        // Lag 4 exceeds the buffer, so the mean of all three stands in
        assert!((lag_or_mean(&values, 4) - 20.0).abs() < 1e-9);
        assert_eq!(lag_or_mean(&[], 1), 0.0);
    }

    #[test]
    fn test_trailing_mean_shrinks_to_available() {
        let values = [1.0, 2.0, 3.0, 4.0];

        // Window 2 covers the last two values only
        assert!((trailing_mean(&values, 2) - 3.5).abs() < 1e-9);

        // Window 10 shrinks to all four
        assert!((trailing_mean(&values, 10) - 2.5).abs() < 1e-9);
        assert_eq!(trailing_mean(&[], 7), 0.0);
    }

    #[test]
    fn test_trailing_std_needs_two_points() {
        // Sample std of [2, 4, 4, 4, 5, 5, 7, 9] is sqrt(32 / 7)
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((trailing_std(&values, 8) - expected).abs() < 1e-9);

        assert_eq!(trailing_std(&[5.0], 7), 0.0);
        assert_eq!(trailing_std(&[], 7), 0.0);
    }
}
