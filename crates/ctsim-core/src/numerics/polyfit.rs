//! Least-squares polynomial fitting through an explicit Vandermonde system.

use super::DenseMatrix;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolyFitError {
    #[error("fit inputs have different lengths: x={x_len}, y={y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("degree-{degree} fit needs at least {required} points, got {actual}")]
    InsufficientPoints {
        degree: usize,
        required: usize,
        actual: usize,
    },
    #[error("fit input must be finite at index {index}, got x={x}, y={y}")]
    NonFiniteInput { index: usize, x: f64, y: f64 },
    #[error("normal equations are singular at pivot index {pivot_index}")]
    SingularSystem { pivot_index: usize },
}

/// Polynomial coefficients in ascending powers: `c[0] + c[1] x + c[2] x^2 ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Coefficient of the linear term, zero for constant polynomials.
    pub fn linear_term(&self) -> f64 {
        self.coefficients.get(1).copied().unwrap_or(0.0)
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        polyval(&self.coefficients, x)
    }
}

/// Builds the `values.len() x (degree + 1)` Vandermonde matrix with ascending
/// powers across columns: row `i` is `[1, v_i, v_i^2, ..., v_i^degree]`.
pub fn vandermonde(values: &[f64], degree: usize) -> DenseMatrix {
    let mut matrix = DenseMatrix::zeros(values.len(), degree + 1);
    for (row, &value) in values.iter().enumerate() {
        let mut power = 1.0;
        for col in 0..=degree {
            matrix[(row, col)] = power;
            power *= value;
        }
    }
    matrix
}

/// Least-squares fit of a degree-`degree` polynomial `y ~ p(x)`, solved via
/// the normal equations of the Vandermonde system.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Polynomial, PolyFitError> {
    if x.len() != y.len() {
        return Err(PolyFitError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    let required = degree + 1;
    if x.len() < required {
        return Err(PolyFitError::InsufficientPoints {
            degree,
            required,
            actual: x.len(),
        });
    }
    for (index, (&xi, &yi)) in x.iter().zip(y).enumerate() {
        if !xi.is_finite() || !yi.is_finite() {
            return Err(PolyFitError::NonFiniteInput {
                index,
                x: xi,
                y: yi,
            });
        }
    }

    let design = vandermonde(x, degree);
    let terms = degree + 1;

    // Normal equations: (V^T V) c = V^T y.
    let mut gram = DenseMatrix::zeros(terms, terms);
    for row in 0..terms {
        for col in 0..terms {
            let mut sum = 0.0;
            for sample in 0..x.len() {
                sum += design[(sample, row)] * design[(sample, col)];
            }
            gram[(row, col)] = sum;
        }
    }

    let mut rhs = vec![0.0; terms];
    for (row, entry) in rhs.iter_mut().enumerate() {
        let mut sum = 0.0;
        for sample in 0..x.len() {
            sum += design[(sample, row)] * y[sample];
        }
        *entry = sum;
    }

    let coefficients = solve_in_place(gram, rhs)?;
    Ok(Polynomial { coefficients })
}

/// Evaluates ascending-power coefficients at `x` by Horner's rule.
pub fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |accumulator, &coefficient| accumulator * x + coefficient)
}

/// Gaussian elimination with partial pivoting on a square system.
fn solve_in_place(
    mut matrix: DenseMatrix,
    mut rhs: Vec<f64>,
) -> Result<Vec<f64>, PolyFitError> {
    let dimension = rhs.len();

    for pivot_col in 0..dimension {
        let mut pivot_row = pivot_col;
        let mut pivot_magnitude = matrix[(pivot_col, pivot_col)].abs();
        for row in (pivot_col + 1)..dimension {
            let magnitude = matrix[(row, pivot_col)].abs();
            if magnitude > pivot_magnitude {
                pivot_row = row;
                pivot_magnitude = magnitude;
            }
        }
        if pivot_magnitude <= SINGULAR_PIVOT_EPSILON {
            return Err(PolyFitError::SingularSystem {
                pivot_index: pivot_col,
            });
        }

        if pivot_row != pivot_col {
            for col in 0..dimension {
                let swapped = matrix[(pivot_col, col)];
                matrix[(pivot_col, col)] = matrix[(pivot_row, col)];
                matrix[(pivot_row, col)] = swapped;
            }
            rhs.swap(pivot_col, pivot_row);
        }

        for row in (pivot_col + 1)..dimension {
            let factor = matrix[(row, pivot_col)] / matrix[(pivot_col, pivot_col)];
            if factor == 0.0 {
                continue;
            }
            for col in pivot_col..dimension {
                matrix[(row, col)] -= factor * matrix[(pivot_col, col)];
            }
            rhs[row] -= factor * rhs[pivot_col];
        }
    }

    let mut solution = vec![0.0; dimension];
    for row in (0..dimension).rev() {
        let mut value = rhs[row];
        for col in (row + 1)..dimension {
            value -= matrix[(row, col)] * solution[col];
        }
        solution[row] = value / matrix[(row, row)];
    }

    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::{polyfit, polyval, vandermonde, PolyFitError};

    #[test]
    fn vandermonde_rows_hold_ascending_powers() {
        let matrix = vandermonde(&[2.0, 3.0], 2);
        assert_eq!(matrix.nrows(), 2);
        assert_eq!(matrix.ncols(), 3);
        assert_eq!(matrix[(0, 0)], 1.0);
        assert_eq!(matrix[(0, 1)], 2.0);
        assert_eq!(matrix[(0, 2)], 4.0);
        assert_eq!(matrix[(1, 2)], 9.0);
    }

    #[test]
    fn quadratic_fit_recovers_exact_coefficients() {
        let x: Vec<f64> = (0..8).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|&v| 1.5 - 2.0 * v + 0.25 * v * v).collect();
        let fit = polyfit(&x, &y, 2).expect("fit should succeed");

        let coefficients = fit.coefficients();
        assert!((coefficients[0] - 1.5).abs() < 1.0e-9);
        assert!((coefficients[1] + 2.0).abs() < 1.0e-9);
        assert!((coefficients[2] - 0.25).abs() < 1.0e-9);
        assert!((fit.linear_term() + 2.0).abs() < 1.0e-9);
    }

    #[test]
    fn polyval_matches_direct_evaluation() {
        let coefficients = [1.0, -3.0, 2.0];
        let x = 1.75;
        let direct = 1.0 - 3.0 * x + 2.0 * x * x;
        assert!((polyval(&coefficients, x) - direct).abs() < 1.0e-12);
    }

    #[test]
    fn fit_rejects_mismatched_and_short_inputs() {
        assert_eq!(
            polyfit(&[1.0, 2.0], &[1.0], 1).expect_err("length mismatch"),
            PolyFitError::LengthMismatch { x_len: 2, y_len: 1 }
        );
        assert_eq!(
            polyfit(&[1.0, 2.0], &[1.0, 2.0], 2).expect_err("too few points"),
            PolyFitError::InsufficientPoints {
                degree: 2,
                required: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn fit_rejects_non_finite_samples() {
        let error = polyfit(&[0.0, f64::NAN], &[0.0, 1.0], 1).expect_err("nan input");
        assert!(matches!(error, PolyFitError::NonFiniteInput { index: 1, .. }));
    }

    #[test]
    fn degenerate_abscissae_report_singular_system() {
        let error = polyfit(&[2.0, 2.0, 2.0], &[1.0, 1.0, 1.0], 2)
            .expect_err("identical x values cannot support a quadratic");
        assert!(matches!(error, PolyFitError::SingularSystem { .. }));
    }
}
