//! Penalized least squares for small dense designs

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, Axis};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{
    RidgeRegression, RidgeRegressionParameters, RidgeRegressionSolverName,
};

type Ridge = RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Minimize `‖y - Xβ‖² + Σ penalty[j]·β[j]²`.
///
/// Column `j` is rescaled by `sqrt(α / penalty[j])` with `α` the smallest
/// penalty, which turns the per-column penalties into a single ridge `α`
/// that smartcore can solve. Every penalty must be finite and positive.
pub fn solve_ridge(
    design: &Array2<f64>,
    y: &Array1<f64>,
    penalty: &Array1<f64>,
) -> Result<Array1<f64>> {
    let (n, p) = design.dim();
    if n != y.len() {
        return Err(ForecastError::DataError(format!(
            "Design has {} rows but target has {} values",
            n,
            y.len()
        )));
    }
    if p != penalty.len() {
        return Err(ForecastError::DataError(format!(
            "Design has {} columns but {} penalties",
            p,
            penalty.len()
        )));
    }
    if p == 0 || penalty.iter().any(|w| !(w.is_finite() && *w > 0.0)) {
        return Err(ForecastError::DataError(
            "Ridge penalties must be finite and positive".to_string(),
        ));
    }

    let alpha = penalty.fold(f64::INFINITY, |acc, &w| acc.min(w));
    let scale = penalty.mapv(|w| (alpha / w).sqrt());
    let scaled = design * &scale.view().insert_axis(Axis(0));

    // Zero rows leave XᵀX and Xᵀy unchanged and keep the design taller than wide
    let mut rows: Vec<Vec<f64>> = scaled.outer_iter().map(|row| row.to_vec()).collect();
    rows.extend(std::iter::repeat(vec![0.0; p]).take(p));
    let mut targets = y.to_vec();
    targets.extend(std::iter::repeat(0.0).take(p));

    let x = DenseMatrix::from_2d_vec(&rows).map_err(|e| unavailable("design matrix", e))?;
    let model = fit(&x, &targets, alpha, RidgeRegressionSolverName::Cholesky)
        .or_else(|_| fit(&x, &targets, alpha, RidgeRegressionSolverName::SVD))
        .map_err(|e| unavailable("ridge fit", e))?;

    // Coefficients via prediction on the unit basis; the fit has no intercept
    let basis: Vec<Vec<f64>> = Array2::<f64>::eye(p)
        .outer_iter()
        .map(|row| row.to_vec())
        .collect();
    let basis = DenseMatrix::from_2d_vec(&basis).map_err(|e| unavailable("unit basis", e))?;
    let gamma = model
        .predict(&basis)
        .map_err(|e| unavailable("coefficient readout", e))?;

    let beta = Array1::from(gamma) * &scale;
    if beta.iter().any(|b| !b.is_finite()) {
        return Err(ForecastError::ForecastUnavailable(
            "Least squares solution is not finite".to_string(),
        ));
    }

    Ok(beta)
}

fn fit(
    x: &DenseMatrix<f64>,
    y: &Vec<f64>,
    alpha: f64,
    solver: RidgeRegressionSolverName,
) -> std::result::Result<Ridge, Failed> {
    let parameters = RidgeRegressionParameters::default()
        .with_alpha(alpha)
        .with_solver(solver)
        .with_normalize(false);
    RidgeRegression::fit(x, y, parameters)
}

fn unavailable(stage: &str, err: Failed) -> ForecastError {
    ForecastError::ForecastUnavailable(format!("{} failed: {}", stage, err))
}
