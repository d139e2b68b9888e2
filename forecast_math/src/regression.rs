//! Regularised linear least squares
//!
//! Solves `(XᵀX + diag(λ)) w = Xᵀy` through a Cholesky factorisation. Each
//! column carries its own penalty so intercept-like columns can stay
//! (almost) unpenalised while others are shrunk.

use crate::{MathError, Result};

/// Smallest penalty applied to any column so the normal matrix stays positive definite
const MIN_PENALTY: f64 = 1e-8;

/// Fit ridge regression coefficients.
///
/// `design` holds one row per observation; every row must have
/// `penalties.len()` columns.
pub fn ridge_least_squares(design: &[Vec<f64>], target: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    if design.is_empty() {
        return Err(MathError::InsufficientData(
            "Design matrix has no rows".to_string(),
        ));
    }
    if design.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "Design rows ({}) don't match target length ({})",
            design.len(),
            target.len()
        )));
    }

    let p = penalties.len();
    if let Some(row) = design.iter().find(|row| row.len() != p) {
        return Err(MathError::InvalidInput(format!(
            "Design row has {} columns, expected {}",
            row.len(),
            p
        )));
    }
    if penalties.iter().any(|&l| l < 0.0 || !l.is_finite()) {
        return Err(MathError::InvalidInput(
            "Penalties must be finite and non-negative".to_string(),
        ));
    }

    // Normal equations
    let mut gram = vec![vec![0.0; p]; p];
    let mut rhs = vec![0.0; p];
    for (row, &y) in design.iter().zip(target) {
        for i in 0..p {
            rhs[i] += row[i] * y;
            for j in 0..=i {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..p {
        gram[i][i] += penalties[i].max(MIN_PENALTY);
        for j in 0..i {
            gram[j][i] = gram[i][j];
        }
    }

    let lower = cholesky(&gram)?;
    Ok(cholesky_solve(&lower, &rhs))
}

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix
pub fn cholesky(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut lower = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| lower[i][k] * lower[j][k]).sum();
            if i == j {
                let diag = matrix[i][i] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return Err(MathError::CalculationError(format!(
                        "Matrix is not positive definite (pivot {} = {})",
                        i, diag
                    )));
                }
                lower[i][j] = diag.sqrt();
            } else {
                lower[i][j] = (matrix[i][j] - sum) / lower[j][j];
            }
        }
    }

    Ok(lower)
}

fn cholesky_solve(lower: &[Vec<f64>], rhs: &[f64]) -> Vec<f64> {
    let n = rhs.len();

    // Forward substitution: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|k| lower[i][k] * z[k]).sum();
        z[i] = (rhs[i] - sum) / lower[i][i];
    }

    // Back substitution: Lᵀ w = z
    let mut w = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| lower[k][i] * w[k]).sum();
        w[i] = (z[i] - sum) / lower[i][i];
    }

    w
}

/// Dot product of a design row with fitted coefficients
pub fn predict_row(row: &[f64], coefficients: &[f64]) -> f64 {
    row.iter().zip(coefficients).map(|(x, w)| x * w).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_linear_relationship() {
        // y = 3 + 2x
        let design: Vec<Vec<f64>> = (0..10).map(|x| vec![1.0, x as f64]).collect();
        let target: Vec<f64> = (0..10).map(|x| 3.0 + 2.0 * x as f64).collect();

        let w = ridge_least_squares(&design, &target, &[0.0, 0.0]).unwrap();
        assert!((w[0] - 3.0).abs() < 1e-6);
        assert!((w[1] - 2.0).abs() < 1e-6);
        assert!((predict_row(&[1.0, 20.0], &w) - 43.0).abs() < 1e-5);
    }

    #[test]
    fn test_penalty_shrinks_coefficient() {
        let design: Vec<Vec<f64>> = (0..10).map(|x| vec![1.0, x as f64]).collect();
        let target: Vec<f64> = (0..10).map(|x| 2.0 * x as f64).collect();

        let free = ridge_least_squares(&design, &target, &[0.0, 0.0]).unwrap();
        let shrunk = ridge_least_squares(&design, &target, &[0.0, 1000.0]).unwrap();
        assert!(shrunk[1].abs() < free[1].abs());
    }

    #[test]
    fn test_shape_mismatch() {
        let design = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(ridge_least_squares(&design, &[1.0, 2.0], &[0.0, 0.0]).is_err());
        assert!(ridge_least_squares(&[], &[], &[0.0]).is_err());
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let matrix = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(cholesky(&matrix).is_err());
    }
}
