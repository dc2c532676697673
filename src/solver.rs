//! Model solvers: the seven-point minimal solver feeding the main sampling
//! loop, and the linear least-squares fit the local optimiser refines with.

use crate::geometry::{
    conditioned_rows, conditioners, constraint_row, decondition, enforce_rank_two,
};
use crate::linalg::{null_space, real_cubic_roots, svd, symmetric_eigen};
use crate::types::CorrespondenceSet;

use nalgebra::DMatrix;

/// A fundamental matrix needs seven correspondences.
pub const MINIMAL_SAMPLE_SIZE: usize = 7;

fn det3(m: &[f64]) -> f64 {
    m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
        + m[2] * (m[3] * m[7] - m[4] * m[6])
}

/// Coefficients of det(x*A + (1-x)*B) as a cubic in x, ascending from the
/// pure-B constant term. Mutates `b` into `a - b`, which is exactly the
/// matrix the caller combines with the roots afterwards.
fn rank_constraint_poly(a: &[f64; 9], b: &mut [f64; 9], p: &mut [f64; 4]) {
    let (a11, a12, a13) = (a[0], a[1], a[2]);
    let (a21, a22, a23) = (a[3], a[4], a[5]);
    let (a31, a32, a33) = (a[6], a[7], a[8]);
    let (b11, b12, b13) = (b[0], b[1], b[2]);
    let (b21, b22, b23) = (b[3], b[4], b[5]);
    let (b31, b32, b33) = (b[6], b[7], b[8]);

    p[0] = -(b13 * b22 * b31) + b12 * b23 * b31 + b13 * b21 * b32
        - b11 * b23 * b32
        - b12 * b21 * b33
        + b11 * b22 * b33;

    p[1] = -(a33 * b12 * b21) + a32 * b13 * b21 + a33 * b11 * b22
        - a31 * b13 * b22
        - a32 * b11 * b23
        + a31 * b12 * b23
        + a23 * b12 * b31
        - a22 * b13 * b31
        - a13 * b22 * b31
        + 3.0 * b13 * b22 * b31
        + a12 * b23 * b31
        - 3.0 * b12 * b23 * b31
        - a23 * b11 * b32
        + a21 * b13 * b32
        + a13 * b21 * b32
        - 3.0 * b13 * b21 * b32
        - a11 * b23 * b32
        + 3.0 * b11 * b23 * b32
        + (a22 * b11 - a21 * b12 - a12 * b21 + 3.0 * b12 * b21 + a11 * b22 - 3.0 * b11 * b22)
            * b33;

    p[2] = -(a21 * a33 * b12) + a21 * a32 * b13 + a13 * a32 * b21 - a12 * a33 * b21
        + 2.0 * a33 * b12 * b21
        - 2.0 * a32 * b13 * b21
        - a13 * a31 * b22
        + a11 * a33 * b22
        - 2.0 * a33 * b11 * b22
        + 2.0 * a31 * b13 * b22
        + a12 * a31 * b23
        - a11 * a32 * b23
        + 2.0 * a32 * b11 * b23
        - 2.0 * a31 * b12 * b23
        + 2.0 * a13 * b22 * b31
        - 3.0 * b13 * b22 * b31
        - 2.0 * a12 * b23 * b31
        + 3.0 * b12 * b23 * b31
        + a13 * a21 * b32
        - 2.0 * a21 * b13 * b32
        - 2.0 * a13 * b21 * b32
        + 3.0 * b13 * b21 * b32
        + 2.0 * a11 * b23 * b32
        - 3.0 * b11 * b23 * b32
        + a23 * (-(a32 * b11) + a31 * b12 + a12 * b31 - 2.0 * b12 * b31 - a11 * b32
            + 2.0 * b11 * b32)
        + (-(a12 * a21) + 2.0 * a21 * b12 + 2.0 * a12 * b21 - 3.0 * b12 * b21 - 2.0 * a11 * b22
            + 3.0 * b11 * b22)
            * b33
        + a22 * (a33 * b11 - a31 * b13 - a13 * b31 + 2.0 * b13 * b31 + a11 * b33
            - 2.0 * b11 * b33);

    for i in 0..9 {
        b[i] = a[i] - b[i];
    }
    p[3] = det3(b);
}

/// Seven-point minimal solver. Stacks the seven constraint rows into a
/// zero-padded 9x9 block, extracts its two-dimensional null space and roots
/// the rank-2 determinant constraint, yielding one or three candidates.
/// Returns an empty vector when the sample is degenerate (null space is not
/// exactly two-dimensional).
pub fn seven_point(
    data: &CorrespondenceSet,
    sample: &[usize],
    pivot_tolerance: f64,
) -> Vec<[f64; 9]> {
    debug_assert_eq!(sample.len(), MINIMAL_SAMPLE_SIZE);

    let mut block = [0.0f64; 81];
    for (i, &idx) in sample.iter().enumerate() {
        block[9 * i..9 * i + 9].copy_from_slice(&constraint_row(data.pair(idx)));
    }

    let mut basis = [0.0f64; 81];
    if null_space(&mut block, 9, &mut basis, pivot_tolerance) != 2 {
        return Vec::new();
    }

    let mut f1 = [0.0f64; 9];
    let mut f2 = [0.0f64; 9];
    f1.copy_from_slice(&basis[0..9]);
    f2.copy_from_slice(&basis[9..18]);

    let mut poly = [0.0f64; 4];
    rank_constraint_poly(&f1, &mut f2, &mut poly);

    // The parametrisation pairs the reversed coefficients with the mutated
    // second basis vector: a root r gives the rank-2 member
    // f1*r + (f1 - f2_orig)*(1 - r).
    let mut roots = [0.0f64; 3];
    let count = real_cubic_roots(&[poly[3], poly[2], poly[1], poly[0]], &mut roots);

    let mut models = Vec::with_capacity(count);
    for &r in roots.iter().take(count) {
        let mut f = [0.0f64; 9];
        for j in 0..9 {
            f[j] = f1[j] * r + f2[j] * (1.0 - r);
        }
        models.push(f);
    }
    models
}

/// Least-squares fit over an index set, optionally reweighted per
/// correspondence (weights are indexed by the global correspondence index).
///
/// Above eight points the rows are Hartley-conditioned and the model comes
/// from the smallest eigenvector of the 9x9 scatter matrix; at eight or
/// fewer the raw rows are zero-padded square and decomposed directly. Either
/// way the result is projected to rank 2. `None` means a decomposition
/// failed to converge and the refit should be discarded.
pub fn fit_indices(
    data: &CorrespondenceSet,
    indices: &[usize],
    weights: Option<&[f64]>,
    rows: &mut Vec<f64>,
) -> Option<[f64; 9]> {
    let n = indices.len();
    if n < 2 {
        return None;
    }

    let mut f = [0.0f64; 9];

    if n > 8 {
        let (a1, a2) = conditioners(data, indices);
        rows.resize(9 * n, 0.0);
        conditioned_rows(data, indices, &a1, &a2, rows);
        if let Some(w) = weights {
            for (i, &idx) in indices.iter().enumerate() {
                for v in &mut rows[9 * i..9 * i + 9] {
                    *v *= w[idx];
                }
            }
        }

        let mut scatter = DMatrix::<f64>::zeros(9, 9);
        for i in 0..9 {
            for j in 0..=i {
                let mut val = 0.0;
                for row in rows.chunks_exact(9) {
                    val += row[i] * row[j];
                }
                scatter[(i, j)] = val;
                scatter[(j, i)] = val;
            }
        }

        let eig = symmetric_eigen(&scatter)?;
        let col = eig.min_index();
        for i in 0..9 {
            f[i] = eig.vectors[(i, col)];
        }

        if !enforce_rank_two(&mut f) {
            return None;
        }
        decondition(&mut f, &a1, &a2);
    } else {
        let mut block = DMatrix::<f64>::zeros(9, 9);
        for (i, &idx) in indices.iter().enumerate() {
            let row = constraint_row(data.pair(idx));
            let w = weights.map_or(1.0, |w| w[idx]);
            for j in 0..9 {
                block[(i, j)] = row[j] * w;
            }
        }

        let dec = svd(&block)?;
        let col = dec.min_index();
        for i in 0..9 {
            f[i] = dec.v[(i, col)];
        }

        if !enforce_rank_two(&mut f) {
            return None;
        }
    }

    Some(f)
}
