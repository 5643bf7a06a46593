//! Metrics for evaluating forecast quality

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use crate::models::ModelArtifact;

/// Mean absolute error between actual and predicted values
pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Root mean squared error between actual and predicted values
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok((sum / actual.len() as f64).sqrt())
}

/// Coefficient of determination.
///
/// A constant actual series has no variance to explain: the score is 1.0
/// when the predictions match it exactly and 0.0 otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "actual and predicted values must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

/// Holdout evaluation summary
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Rows evaluated
    pub n_rows: usize,
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Holdout Evaluation:")?;
        writeln!(f, "  MAE:  {:.4}", self.mae)?;
        writeln!(f, "  RMSE: {:.4}", self.rmse)?;
        writeln!(f, "  R2:   {:.4}", self.r_squared)?;
        write!(f, "  Rows: {}", self.n_rows)
    }
}

/// Score predictions against actuals.
///
/// Predictions are clamped at zero first, since negative demand is never
/// served to a caller, but they are not rounded: evaluation measures the
/// model, not the presentation.
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<EvaluationReport> {
    check_lengths(actual, predicted)?;
    let clamped: Vec<f64> = predicted.iter().map(|p| p.max(0.0)).collect();
    Ok(EvaluationReport {
        mae: mae(actual, &clamped)?,
        rmse: rmse(actual, &clamped)?,
        r_squared: r_squared(actual, &clamped)?,
        n_rows: actual.len(),
    })
}

/// Predict every row of a holdout table and score the results
pub fn evaluate_artifact(artifact: &ModelArtifact, holdout: &FeatureTable) -> Result<EvaluationReport> {
    if holdout.is_empty() {
        return Err(ForecastError::ConfigError(
            "holdout table is empty".to_string(),
        ));
    }
    let predicted = artifact.predict_table(holdout)?;
    evaluate(&holdout.targets(), &predicted)
}
