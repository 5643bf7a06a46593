//! Model training, bundling, and persistence
//!
//! `train_model` turns feature tables into a [`ModelArtifact`]: the fitted
//! gradient-boosted ensemble together with the schema that maps feature
//! records onto its input columns. The artifact round-trips through JSON so
//! a trained model can be reloaded without the training data.

use crate::error::{ForecastError, Result};
use crate::features::{FeatureRecord, FeatureTable};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub mod gbdt;

pub use gbdt::{GbdtModel, GbdtParams, GbdtRegressor};

/// Column-major training matrix with aligned targets
#[derive(Debug, Clone)]
pub struct GbdtDataset {
    /// One vector per feature, all the same length as `targets`
    pub columns: Vec<Vec<f64>>,
    /// Observed demand per row
    pub targets: Vec<f64>,
    /// Indices of columns that hold categorical codes
    pub categorical: BTreeSet<usize>,
}

impl GbdtDataset {
    pub fn n_rows(&self) -> usize {
        self.targets.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Check the matrix is non-empty, rectangular, and finite
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(ForecastError::DataError(
                "dataset has no feature columns".to_string(),
            ));
        }
        if self.targets.is_empty() {
            return Err(ForecastError::DataError("dataset has no rows".to_string()));
        }
        for (index, column) in self.columns.iter().enumerate() {
            if column.len() != self.targets.len() {
                return Err(ForecastError::DataError(format!(
                    "column {} has {} rows, expected {}",
                    index,
                    column.len(),
                    self.targets.len()
                )));
            }
            if let Some(row) = column.iter().position(|v| !v.is_finite()) {
                return Err(ForecastError::DataError(format!(
                    "column {} has a non-finite value at row {}",
                    index, row
                )));
            }
        }
        if let Some(row) = self.targets.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "target has a non-finite value at row {}",
                row
            )));
        }
        for &index in &self.categorical {
            if index >= self.columns.len() {
                return Err(ForecastError::SchemaError(format!(
                    "categorical index {} is out of range for {} columns",
                    index,
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}

/// A trained model bundled with the schema that encodes rows for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    schema: FeatureSchema,
    model: GbdtModel,
}

impl ModelArtifact {
    /// Bundle a schema and model, checking that they agree on width
    pub fn new(schema: FeatureSchema, model: GbdtModel) -> Result<Self> {
        schema.validate()?;
        if schema.columns().len() != model.n_features() {
            return Err(ForecastError::SchemaError(format!(
                "schema has {} columns, model expects {}",
                schema.columns().len(),
                model.n_features()
            )));
        }
        Ok(ModelArtifact { schema, model })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn model(&self) -> &GbdtModel {
        &self.model
    }

    /// Encode one feature record and score it
    pub fn predict_record(&self, record: &FeatureRecord) -> Result<f64> {
        let row = self.schema.encode(record)?;
        self.model.predict_row(&row)
    }

    /// Score every row of a feature table, in table order
    pub fn predict_table(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        table
            .rows()
            .iter()
            .map(|row| self.predict_record(&row.record))
            .collect()
    }

    /// Write the artifact as JSON, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Read an artifact back from JSON and re-check its consistency
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let artifact: ModelArtifact = serde_json::from_reader(reader)?;
        artifact.schema.validate()?;
        if artifact.schema.columns().len() != artifact.model.n_features() {
            return Err(ForecastError::SchemaError(format!(
                "loaded schema has {} columns, model expects {}",
                artifact.schema.columns().len(),
                artifact.model.n_features()
            )));
        }
        Ok(artifact)
    }
}

/// Fit a schema on the training table, train the ensemble, and bundle both.
///
/// The schema is always fitted on the training rows alone, so category
/// codes never leak in from validation data.
pub fn train_model(
    train: &FeatureTable,
    validation: Option<&FeatureTable>,
    params: GbdtParams,
) -> Result<ModelArtifact> {
    if train.is_empty() {
        return Err(ForecastError::ConfigError(
            "training table is empty".to_string(),
        ));
    }
    let schema = FeatureSchema::fit(train);
    let train_set = dataset_from_table(&schema, train)?;
    let validation_set = match validation {
        Some(table) => {
            if table.is_empty() {
                return Err(ForecastError::ConfigError(
                    "validation table is empty".to_string(),
                ));
            }
            Some(dataset_from_table(&schema, table)?)
        }
        None => None,
    };

    let model = GbdtRegressor::new(params).fit(&train_set, validation_set.as_ref())?;
    ModelArtifact::new(schema, model)
}

fn dataset_from_table(schema: &FeatureSchema, table: &FeatureTable) -> Result<GbdtDataset> {
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(table.len()); schema.columns().len()];
    let mut targets = Vec::with_capacity(table.len());

    for row in table.rows() {
        let encoded = schema.encode(&row.record)?;
        for (column, value) in columns.iter_mut().zip(encoded) {
            column.push(value);
        }
        targets.push(row.demand);
    }

    Ok(GbdtDataset {
        columns,
        targets,
        categorical: schema.categorical_indices().into_iter().collect(),
    })
}
