use assert_approx_eq::assert_approx_eq;
use demand_forecast::error::ForecastError;
use demand_forecast::metrics::{evaluate, mae, r_squared, rmse};

#[test]
fn test_mae_basic() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];
    let result = mae(&actual, &predicted).unwrap();
    assert_approx_eq!(result, 2.4, 1e-10);
}

#[test]
fn test_rmse_basic() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];
    let result = rmse(&actual, &predicted).unwrap();
    assert_approx_eq!(result, 6.0_f64.sqrt(), 1e-10);
}

#[test]
fn test_r_squared_basic() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];
    let result = r_squared(&actual, &predicted).unwrap();
    assert_approx_eq!(result, 0.97, 1e-10);
}

#[test]
fn test_perfect_predictions() {
    let actual = vec![3.0, 7.0, 11.0];
    assert_approx_eq!(mae(&actual, &actual).unwrap(), 0.0, 1e-12);
    assert_approx_eq!(rmse(&actual, &actual).unwrap(), 0.0, 1e-12);
    assert_approx_eq!(r_squared(&actual, &actual).unwrap(), 1.0, 1e-12);
}

#[test]
fn test_length_mismatch_is_rejected() {
    let actual = vec![1.0, 2.0, 3.0];
    let predicted = vec![1.0, 2.0];
    assert!(matches!(
        mae(&actual, &predicted),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        rmse(&actual, &predicted),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        r_squared(&actual, &predicted),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_empty_series_is_rejected() {
    let empty: Vec<f64> = Vec::new();
    assert!(matches!(
        mae(&empty, &empty),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        evaluate(&empty, &empty),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_constant_actual_with_exact_fit() {
    let actual = vec![5.0, 5.0, 5.0];
    let result = r_squared(&actual, &actual).unwrap();
    assert_approx_eq!(result, 1.0, 1e-12);
}

#[test]
fn test_evaluate_clamps_negative_predictions() {
    // Negative raw scores count as zero demand before scoring
    let actual = vec![5.0, 5.0];
    let predicted = vec![-50.0, -50.0];
    let report = evaluate(&actual, &predicted).unwrap();

    assert_approx_eq!(report.mae, 5.0, 1e-12);
    assert_approx_eq!(report.rmse, 5.0, 1e-12);
    assert_approx_eq!(report.r_squared, 0.0, 1e-12);
    assert_eq!(report.n_rows, 2);
}

#[test]
fn test_evaluate_report_fields() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];
    let report = evaluate(&actual, &predicted).unwrap();

    assert_eq!(report.n_rows, 5);
    assert_approx_eq!(report.mae, 2.4, 1e-10);
    assert_approx_eq!(report.rmse, 6.0_f64.sqrt(), 1e-10);
    assert!(report.rmse >= report.mae);
}

#[test]
fn test_report_display() {
    let actual = vec![10.0, 20.0, 30.0];
    let predicted = vec![11.0, 19.0, 31.0];
    let report = evaluate(&actual, &predicted).unwrap();

    let text = format!("{}", report);
    assert!(text.contains("MAE"));
    assert!(text.contains("RMSE"));
    assert!(text.contains("R2"));
    assert!(text.contains("Rows: 3"));
}
