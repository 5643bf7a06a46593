//! Model input schema: ordered columns and enumerated categories
//!
//! The schema fit at training time is persisted inside the model artifact
//! and is authoritative at inference. Records are always projected through
//! its exact column order, and a missing column is a hard error rather
//! than a silent reindex.

use crate::error::{ForecastError, Result};
use crate::features::{FeatureRecord, FeatureTable, CATEGORICAL_COLUMNS, FEATURE_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Code reserved for labels never seen at fit time. It belongs to no
/// trained category subset, so categorical splits route it to the
/// default branch.
pub const UNSEEN_CATEGORY: u32 = u32::MAX;

/// Enumerated label-to-code table for one categorical column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    codes: BTreeMap<String, u32>,
}

impl CategoryEncoder {
    /// Empty encoder with no labels
    pub fn new() -> Self {
        CategoryEncoder::default()
    }

    /// Code for a label, assigning the next free code on first sight
    pub fn insert(&mut self, label: &str) -> u32 {
        if let Some(&code) = self.codes.get(label) {
            return code;
        }
        let code = self.codes.len() as u32;
        self.codes.insert(label.to_string(), code);
        code
    }

    /// Code for a fitted label, or `UNSEEN_CATEGORY` otherwise
    pub fn encode(&self, label: &str) -> u32 {
        self.codes.get(label).copied().unwrap_or(UNSEEN_CATEGORY)
    }

    /// Whether the label was seen at fit time
    pub fn contains(&self, label: &str) -> bool {
        self.codes.contains_key(label)
    }

    /// Number of fitted labels
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether no labels were fitted
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Ordered feature columns plus the categorical code tables the model
/// was fit with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
    categorical: BTreeMap<String, CategoryEncoder>,
}

impl FeatureSchema {
    /// Fit the canonical schema over a feature table, enumerating every
    /// categorical label in row order
    pub fn fit(table: &FeatureTable) -> Self {
        let mut categorical: BTreeMap<String, CategoryEncoder> = CATEGORICAL_COLUMNS
            .iter()
            .map(|c| (c.to_string(), CategoryEncoder::new()))
            .collect();

        for row in table.rows() {
            for column in CATEGORICAL_COLUMNS {
                if let Some(label) = row.record.categorical_value(column) {
                    if let Some(encoder) = categorical.get_mut(column) {
                        encoder.insert(label);
                    }
                }
            }
        }

        FeatureSchema {
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            categorical,
        }
    }

    /// Column names in model order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Indices of categorical columns within the model order
    pub fn categorical_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| self.categorical.contains_key(c.as_str()))
            .map(|(i, _)| i)
            .collect()
    }

    /// The code table for a categorical column, if the column is one
    pub fn encoder(&self, column: &str) -> Option<&CategoryEncoder> {
        self.categorical.get(column)
    }

    /// Encode a record into model column order.
    ///
    /// Every schema column must resolve against the record; a column the
    /// record cannot supply fails with a schema error. Categorical labels
    /// unseen at fit time encode to `UNSEEN_CATEGORY`.
    pub fn encode(&self, record: &FeatureRecord) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if let Some(encoder) = self.categorical.get(column) {
                let label = record.categorical_value(column).ok_or_else(|| {
                    ForecastError::SchemaError(format!(
                        "categorical column '{}' missing from feature record",
                        column
                    ))
                })?;
                values.push(encoder.encode(label) as f64);
            } else {
                let value = record.numeric_value(column).ok_or_else(|| {
                    ForecastError::SchemaError(format!(
                        "column '{}' missing from feature record",
                        column
                    ))
                })?;
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Check the schema's internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(ForecastError::SchemaError(
                "schema has no columns".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(ForecastError::SchemaError(format!(
                    "duplicate column '{}' in schema",
                    column
                )));
            }
        }

        for key in self.categorical.keys() {
            if !self.columns.iter().any(|c| c == key) {
                return Err(ForecastError::SchemaError(format!(
                    "categorical table '{}' has no matching column",
                    key
                )));
            }
        }

        Ok(())
    }
}
