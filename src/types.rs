//! Core data types: correspondences and the fundamental-matrix model.
//!
//! Correspondences are stored contiguously as flat 6-tuples
//! `(x1, y1, w1, x2, y2, w2)` so that the residual and linearization loops
//! touch memory sequentially. The set is built once per run and never mutated;
//! all later bookkeeping (pool, inlier map) refers to it by index.

use nalgebra::Matrix3;

use crate::error::EstimateError;

/// Number of stored coordinates per correspondence.
pub(crate) const PAIR_STRIDE: usize = 6;

/// An ordered, immutable set of tentative point correspondences between two
/// images.
#[derive(Debug, Clone)]
pub struct CorrespondenceSet {
    data: Vec<f64>,
    len: usize,
}

impl CorrespondenceSet {
    /// Build a set from rows of 4 numbers `(x1, y1, x2, y2)` or 6 numbers
    /// `(x1, y1, w1, x2, y2, w2)`. Rows of any other length are rejected.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, EstimateError> {
        let mut data = Vec::with_capacity(rows.len() * PAIR_STRIDE);
        for (index, row) in rows.iter().enumerate() {
            match row.len() {
                4 => {
                    data.extend_from_slice(&[row[0], row[1], 1.0, row[2], row[3], 1.0]);
                }
                6 => {
                    data.extend_from_slice(row);
                }
                len => {
                    return Err(EstimateError::MalformedCorrespondence { index, len });
                }
            }
        }
        Ok(Self {
            data,
            len: rows.len(),
        })
    }

    /// Build a set from fixed-size `(x1, y1, x2, y2)` rows.
    pub fn from_points(rows: &[[f64; 4]]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * PAIR_STRIDE);
        for row in rows {
            data.extend_from_slice(&[row[0], row[1], 1.0, row[2], row[3], 1.0]);
        }
        Self {
            data,
            len: rows.len(),
        }
    }

    /// Number of correspondences.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The six stored coordinates of correspondence `index`.
    #[inline]
    pub fn pair(&self, index: usize) -> &[f64] {
        &self.data[index * PAIR_STRIDE..(index + 1) * PAIR_STRIDE]
    }

    /// The original four-coordinate form of correspondence `index`.
    pub fn points(&self, index: usize) -> [f64; 4] {
        let p = self.pair(index);
        [p[0], p[1], p[3], p[4]]
    }
}

/// A two-view fundamental matrix, stored row-major and defined up to scale.
///
/// After any re-estimation the matrix is exactly rank 2; it satisfies the
/// epipolar constraint `x2' * F * x1 ~ 0` for inlier correspondences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundamentalMatrix(pub [f64; 9]);

impl FundamentalMatrix {
    pub fn zeros() -> Self {
        Self([0.0; 9])
    }

    /// Entry at `(row, col)`.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.0[row * 3 + col]
    }

    pub fn to_matrix3(&self) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.0)
    }
}

impl From<[f64; 9]> for FundamentalMatrix {
    fn from(f: [f64; 9]) -> Self {
        Self(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_and_six_column_rows_store_identically() {
        let four = CorrespondenceSet::from_rows(&[vec![1.0, 2.0, 3.0, 4.0]]).unwrap();
        let six = CorrespondenceSet::from_rows(&[vec![1.0, 2.0, 1.0, 3.0, 4.0, 1.0]]).unwrap();
        assert_eq!(four.pair(0), six.pair(0));
        assert_eq!(four.points(0), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn malformed_row_is_rejected() {
        let err = CorrespondenceSet::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap_err();
        assert_eq!(
            err,
            EstimateError::MalformedCorrespondence { index: 0, len: 3 }
        );
    }

    #[test]
    fn matrix_row_major_indexing() {
        let f = FundamentalMatrix([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(f.at(1, 2), 6.0);
        assert_eq!(f.to_matrix3()[(1, 2)], 6.0);
    }
}
