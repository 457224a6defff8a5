//! Small dense linear solves.

use faer::prelude::SpSolver;
use faer::{FaerMat, Mat};

const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Solve `matrix · x = rhs` by partial-pivot LU.
///
/// Returns `None` for a malformed or numerically singular system.
pub fn solve_dense(matrix: &[Vec<f64>], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = matrix.len();
    if n == 0 {
        return Some(Vec::new());
    }
    if rhs.len() != n || matrix.iter().any(|row| row.len() != n) {
        return None;
    }

    let mat = Mat::from_fn(n, n, |i, j| matrix[i][j]);
    let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
    let lu = mat.partial_piv_lu();
    let sol = lu.solve(&rhs_mat);
    let solution: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
    if solution.iter().any(|v| !v.is_finite()) {
        return None;
    }

    // A tiny pivot yields a finite but meaningless answer; check the residual.
    let scale = rhs.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    for (row, &b) in matrix.iter().zip(rhs) {
        let ax: f64 = row.iter().zip(&solution).map(|(a, x)| a * x).sum();
        if (ax - b).abs() > RESIDUAL_TOLERANCE * scale {
            return None;
        }
    }
    Some(solution)
}
