//! Eigendecomposition of a real symmetric matrix by cyclic Jacobi rotations.
//!
//! Used exclusively on the 9x9 covariance accumulated when fitting a model
//! from more than 8 correspondences, where eigendecomposing the small
//! covariance is cheaper and better conditioned than a direct SVD of the tall
//! constraint matrix. The sweep count is capped; running out of sweeps is
//! reported as non-convergence and the caller drops the refit.

use nalgebra::DMatrix;

const MAX_SWEEPS: usize = 50;

/// Result of [`symmetric_eigen`]: `a = vectors * diag(values) * vectors'`,
/// eigenvectors stored as columns. Eigenvalues are not sorted.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub values: Vec<f64>,
    pub vectors: DMatrix<f64>,
}

impl SymmetricEigen {
    /// Column index of the smallest eigenvalue.
    pub fn min_index(&self) -> usize {
        let mut j = 0;
        for i in 1..self.values.len() {
            if self.values[i] < self.values[j] {
                j = i;
            }
        }
        j
    }
}

/// Decompose the symmetric matrix `input`. Returns `None` if the Jacobi
/// sweeps fail to drive the off-diagonal to zero.
pub fn symmetric_eigen(input: &DMatrix<f64>) -> Option<SymmetricEigen> {
    let n = input.nrows();
    debug_assert_eq!(n, input.ncols(), "symmetric_eigen expects a square input");

    let mut a = input.clone();
    let mut v = DMatrix::<f64>::identity(n, n);

    for _sweep in 0..MAX_SWEEPS {
        let mut off = 0.0f64;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[(p, q)].abs();
            }
        }
        if off == 0.0 {
            let values = (0..n).map(|i| a[(i, i)]).collect();
            return Some(SymmetricEigen { values, vectors: v });
        }

        for p in 0..(n - 1) {
            for q in (p + 1)..n {
                let apq = a[(p, q)];
                // Skip entries that are already negligible against the
                // diagonal; rotating on them only churns roundoff.
                if apq.abs() <= f64::EPSILON * (a[(p, p)].abs() + a[(q, q)].abs()) {
                    a[(p, q)] = 0.0;
                    a[(q, p)] = 0.0;
                    continue;
                }
                let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * apq);
                let t = if theta.abs() > 1e12 {
                    1.0 / (2.0 * theta)
                } else {
                    let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                    sign / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                let tau = s / (1.0 + c);

                a[(p, p)] -= t * apq;
                a[(q, q)] += t * apq;
                a[(p, q)] = 0.0;
                a[(q, p)] = 0.0;
                for r in 0..n {
                    if r != p && r != q {
                        let arp = a[(r, p)];
                        let arq = a[(r, q)];
                        a[(r, p)] = arp - s * (arq + tau * arp);
                        a[(p, r)] = a[(r, p)];
                        a[(r, q)] = arq + s * (arp - tau * arq);
                        a[(q, r)] = a[(r, q)];
                    }
                }
                for r in 0..n {
                    let vrp = v[(r, p)];
                    let vrq = v[(r, q)];
                    v[(r, p)] = c * vrp - s * vrq;
                    v[(r, q)] = s * vrp + c * vrq;
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reconstruct(e: &SymmetricEigen) -> DMatrix<f64> {
        let n = e.values.len();
        let d = DMatrix::from_fn(n, n, |i, j| if i == j { e.values[i] } else { 0.0 });
        &e.vectors * d * e.vectors.transpose()
    }

    #[test]
    fn diagonal_input_is_its_own_decomposition() {
        let a = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 5.0]);
        let e = symmetric_eigen(&a).unwrap();
        let mut values = e.values.clone();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(values[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(values[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(values[2], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn reconstructs_a_9x9_covariance() {
        // Covariance-style positive semidefinite input z' * z.
        let z = DMatrix::from_fn(20, 9, |i, j| ((i * 9 + j) as f64 * 0.37).sin());
        let a = z.transpose() * &z;
        let e = symmetric_eigen(&a).unwrap();
        let r = reconstruct(&e);
        for i in 0..9 {
            for j in 0..9 {
                assert_relative_eq!(r[(i, j)], a[(i, j)], epsilon = 1e-8);
            }
        }
        assert!(e.values.iter().all(|&ev| ev > -1e-9));
    }

    #[test]
    fn min_index_points_at_smallest_eigenvalue() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.0, 0.0, 0.0, 10.0]);
        let e = symmetric_eigen(&a).unwrap();
        let idx = e.min_index();
        // Smallest eigenvalue of the 2x2 block [[4,1],[1,3]] is (7-sqrt(5))/2.
        assert_relative_eq!(e.values[idx], (7.0 - 5.0f64.sqrt()) / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn eigenvectors_are_orthonormal() {
        let a = DMatrix::from_row_slice(
            4,
            4,
            &[
                3.0, 1.0, 0.5, 0.0, //
                1.0, 2.0, 0.0, 0.25, //
                0.5, 0.0, 1.0, 0.125, //
                0.0, 0.25, 0.125, 4.0,
            ],
        );
        let e = symmetric_eigen(&a).unwrap();
        let gram = e.vectors.transpose() * &e.vectors;
        for i in 0..4 {
            for j in 0..4 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(gram[(i, j)], expect, epsilon = 1e-10);
            }
        }
    }
}
