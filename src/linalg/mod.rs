//! From-scratch dense linear algebra for the estimation kernel.
//!
//! Everything the estimator needs numerically lives here: singular value
//! decomposition, symmetric eigendecomposition, null-space computation and
//! cubic root solving, plus small fixed-size matrix helpers. The matrices
//! involved are tiny (3x3 and 9x9 systems), so the routines favour
//! predictable, allocation-light code over generality. Decompositions that
//! fail to converge report the failure to the caller, which abandons the
//! affected hypothesis and keeps the prior best.

pub mod cubic;
pub mod eigen;
pub mod nullspace;
pub mod svd;

pub use cubic::real_cubic_roots;
pub use eigen::symmetric_eigen;
pub use nullspace::null_space;
pub use svd::{svd, Svd};

/// Row-major 3x3 matrix product.
#[inline]
pub fn mat3_mul(a: &[f64; 9], b: &[f64; 9]) -> [f64; 9] {
    let mut c = [0.0; 9];
    for i in 0..3 {
        for j in 0..3 {
            let mut s = 0.0;
            for k in 0..3 {
                s += a[3 * i + k] * b[3 * k + j];
            }
            c[3 * i + j] = s;
        }
    }
    c
}

/// Row-major 3x3 transpose.
#[inline]
pub fn mat3_transpose(a: &[f64; 9]) -> [f64; 9] {
    [
        a[0], a[3], a[6], //
        a[1], a[4], a[7], //
        a[2], a[5], a[8],
    ]
}

/// Cross product of two 3-vectors.
#[inline]
pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mat3_mul_against_identity_and_known_product() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let id = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        assert_eq!(mat3_mul(&a, &id), a);
        let b = [9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let c = mat3_mul(&a, &b);
        // first row: [1 2 3] * columns of b
        assert_relative_eq!(c[0], 30.0);
        assert_relative_eq!(c[1], 24.0);
        assert_relative_eq!(c[2], 18.0);
    }

    #[test]
    fn transpose_is_involutive() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        assert_eq!(mat3_transpose(&mat3_transpose(&a)), a);
        assert_eq!(mat3_transpose(&a)[1], 4.0);
    }

    #[test]
    fn cross_product_is_orthogonal() {
        let a = [1.0, 2.0, 3.0];
        let b = [-2.0, 0.5, 4.0];
        let c = cross(&a, &b);
        let dot_a: f64 = (0..3).map(|i| a[i] * c[i]).sum();
        let dot_b: f64 = (0..3).map(|i| b[i] * c[i]).sum();
        assert_relative_eq!(dot_a, 0.0, epsilon = 1e-12);
        assert_relative_eq!(dot_b, 0.0, epsilon = 1e-12);
    }
}
