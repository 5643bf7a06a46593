//! Historical demand store loading and access

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// One observed day of sales for a single product
#[derive(Debug, Clone, PartialEq)]
pub struct DemandRecord {
    /// Calendar day of the observation
    pub date: NaiveDate,
    /// Stable product identifier, e.g. "P001"
    pub product_id: String,
    /// Human-readable product name
    pub product_name: String,
    /// Unit price on that day
    pub price: f64,
    /// Units sold that day
    pub demand: f64,
    /// Whether the product was on promotion that day
    pub promotion: bool,
}

/// One day of history as the feature builder and forecaster consume it.
/// Product identity is implicit; a window always belongs to one product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalesPoint {
    pub date: NaiveDate,
    pub demand: f64,
    pub price: f64,
    pub promotion: bool,
}

impl From<&DemandRecord> for SalesPoint {
    fn from(record: &DemandRecord) -> Self {
        SalesPoint {
            date: record.date,
            demand: record.demand,
            price: record.price,
            promotion: record.promotion,
        }
    }
}

/// In-memory historical store, sorted by (product_id, date)
#[derive(Debug, Clone)]
pub struct DemandHistory {
    /// All records, sorted by product then date
    records: Vec<DemandRecord>,
    /// Index range into `records` for each product
    ranges: BTreeMap<String, (usize, usize)>,
}

impl DemandHistory {
    /// Build a store from unordered records
    pub fn from_records(mut records: Vec<DemandRecord>) -> Self {
        records.sort_by(|a, b| {
            a.product_id
                .cmp(&b.product_id)
                .then_with(|| a.date.cmp(&b.date))
        });

        let mut ranges = BTreeMap::new();
        let mut start = 0;
        for i in 0..records.len() {
            let at_end = i + 1 == records.len();
            if at_end || records[i + 1].product_id != records[i].product_id {
                ranges.insert(records[i].product_id.clone(), (start, i + 1));
                start = i + 1;
            }
        }

        DemandHistory { records, ranges }
    }

    /// Load a store from a CSV file with columns
    /// {date, product_id, product_name, price, demand, promotion}
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // Use polars DataFrame reader directly
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df)
    }

    /// Build a store from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let dates = column_as_dates(df, "date")?;
        let product_ids = column_as_strings(df, "product_id")?;
        let product_names = column_as_strings(df, "product_name")?;
        let prices = column_as_f64(df, "price")?;
        let demands = column_as_f64(df, "demand")?;
        let promotions = column_as_bool(df, "promotion")?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            records.push(DemandRecord {
                date: dates[i],
                product_id: product_ids[i].clone(),
                product_name: product_names[i].clone(),
                price: prices[i],
                demand: demands[i],
                promotion: promotions[i],
            });
        }

        Ok(Self::from_records(records))
    }

    /// All records, sorted by (product_id, date)
    pub fn records(&self) -> &[DemandRecord] {
        &self.records
    }

    /// Total number of rows in the store
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Product identifiers present in the store, ascending
    pub fn product_ids(&self) -> Vec<String> {
        self.ranges.keys().cloned().collect()
    }

    /// Map of product_id to product_name
    pub fn catalog(&self) -> BTreeMap<String, String> {
        self.ranges
            .iter()
            .map(|(id, &(start, _))| (id.clone(), self.records[start].product_name.clone()))
            .collect()
    }

    /// All records for one product, ascending by date.
    /// Returns an empty slice for an unknown product.
    pub fn product_records(&self, product_id: &str) -> &[DemandRecord] {
        match self.ranges.get(product_id) {
            Some(&(start, end)) => &self.records[start..end],
            None => &[],
        }
    }

    /// The most recent `limit` rows for a product, ascending by date
    pub fn recent_history(&self, product_id: &str, limit: usize) -> Vec<SalesPoint> {
        let rows = self.product_records(product_id);
        let skip = rows.len().saturating_sub(limit);
        rows[skip..].iter().map(SalesPoint::from).collect()
    }

    /// All-time mean price for a product
    pub fn mean_price(&self, product_id: &str) -> Option<f64> {
        let rows = self.product_records(product_id);
        if rows.is_empty() {
            return None;
        }
        Some(rows.iter().map(|r| r.price).sum::<f64>() / rows.len() as f64)
    }

    /// Latest date across all products
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    /// Earliest date across all products
    pub fn min_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).min()
    }
}

fn missing_column(name: &str) -> ForecastError {
    ForecastError::DataError(format!("required column '{}' not found in data", name))
}

fn null_value(name: &str, row: usize) -> ForecastError {
    ForecastError::DataError(format!("null value in column '{}' at row {}", name, row))
}

/// Extract a column as calendar dates, accepting either a native date
/// dtype or "%Y-%m-%d" strings
fn column_as_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let col = df.column(name).map_err(|_| missing_column(name))?;

    match col.dtype() {
        DataType::Date => col
            .date()?
            .into_iter()
            .enumerate()
            .map(|(i, opt_days)| {
                let days = opt_days.ok_or_else(|| null_value(name, i))?;
                NaiveDate::from_ymd_opt(1970, 1, 1)
                    .unwrap()
                    .checked_add_signed(chrono::Duration::days(days as i64))
                    .ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "date value out of range in column '{}' at row {}",
                            name, i
                        ))
                    })
            })
            .collect(),
        DataType::Utf8 => col
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(i, opt_s)| {
                let s = opt_s.ok_or_else(|| null_value(name, i))?;
                NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                    ForecastError::DataError(format!("invalid date '{}' at row {}: {}", s, i, e))
                })
            })
            .collect(),
        other => Err(ForecastError::DataError(format!(
            "column '{}' has unsupported date type {:?}",
            name, other
        ))),
    }
}

/// Extract a column as owned strings
fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let col = df.column(name).map_err(|_| missing_column(name))?;

    match col.dtype() {
        DataType::Utf8 => col
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(i, opt_s)| {
                opt_s
                    .map(|s| s.to_string())
                    .ok_or_else(|| null_value(name, i))
            })
            .collect(),
        other => Err(ForecastError::DataError(format!(
            "column '{}' has unsupported string type {:?}",
            name, other
        ))),
    }
}

/// Extract a numeric column as f64 values
fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let col = df.column(name).map_err(|_| missing_column(name))?;

    match col.dtype() {
        DataType::Float64 => col
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| null_value(name, i)))
            .collect(),
        DataType::Float32 => col
            .f32()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.map(|x| x as f64).ok_or_else(|| null_value(name, i)))
            .collect(),
        DataType::Int64 => col
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.map(|x| x as f64).ok_or_else(|| null_value(name, i)))
            .collect(),
        DataType::Int32 => col
            .i32()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.map(|x| x as f64).ok_or_else(|| null_value(name, i)))
            .collect(),
        other => Err(ForecastError::DataError(format!(
            "column '{}' has unsupported numeric type {:?}",
            name, other
        ))),
    }
}

/// Extract a flag column as booleans, accepting bool, integer 0/1,
/// or "true"/"false" strings
fn column_as_bool(df: &DataFrame, name: &str) -> Result<Vec<bool>> {
    let col = df.column(name).map_err(|_| missing_column(name))?;

    match col.dtype() {
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| null_value(name, i)))
            .collect(),
        DataType::Int64 => col
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.map(|x| x != 0).ok_or_else(|| null_value(name, i)))
            .collect(),
        DataType::Int32 => col
            .i32()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.map(|x| x != 0).ok_or_else(|| null_value(name, i)))
            .collect(),
        DataType::Utf8 => col
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(i, opt_s)| {
                let s = opt_s.ok_or_else(|| null_value(name, i))?;
                match s.trim().to_lowercase().as_str() {
                    "true" | "1" => Ok(true),
                    "false" | "0" => Ok(false),
                    other => Err(ForecastError::DataError(format!(
                        "invalid flag '{}' in column '{}' at row {}",
                        other, name, i
                    ))),
                }
            })
            .collect(),
        other => Err(ForecastError::DataError(format!(
            "column '{}' has unsupported flag type {:?}",
            name, other
        ))),
    }
}
