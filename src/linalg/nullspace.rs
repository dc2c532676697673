//! Null-space basis of a square matrix by Gauss-Jordan elimination with
//! partial pivoting. The seven-point solver feeds a 9x9 block (seven
//! constraint rows padded with zeros) through this and expects a
//! two-dimensional null space back.

/// Reduce the `n x n` row-major matrix `a` in place and write a spanning set
/// of its null space into `basis`, one vector of length `n` per free column,
/// packed consecutively. Pivots smaller than `tol` in absolute
/// value are treated as zero. Returns the null-space dimension.
///
/// `basis` must hold at least `n * n` elements; at most `n` vectors are
/// written.
pub fn null_space(a: &mut [f64], n: usize, basis: &mut [f64], tol: f64) -> usize {
    debug_assert!(a.len() >= n * n);
    debug_assert!(basis.len() >= n * n);

    // row_of_pivot[c] is the row holding the pivot of column c, or n if the
    // column is free. row_used marks rows already consumed as pivot rows.
    let mut row_of_pivot = [usize::MAX; 18];
    let mut row_used = [false; 18];
    debug_assert!(n <= 18);

    for c in 0..n {
        row_of_pivot[c] = n;
        let mut best = tol;
        let mut pivot_row = n;
        for r in 0..n {
            if !row_used[r] && a[r * n + c].abs() > best {
                best = a[r * n + c].abs();
                pivot_row = r;
            }
        }
        if pivot_row == n {
            continue;
        }
        row_used[pivot_row] = true;
        row_of_pivot[c] = pivot_row;

        let inv = 1.0 / a[pivot_row * n + c];
        for j in 0..n {
            a[pivot_row * n + j] *= inv;
        }
        a[pivot_row * n + c] = 1.0;
        for r in 0..n {
            if r == pivot_row {
                continue;
            }
            let factor = a[r * n + c];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[r * n + j] -= factor * a[pivot_row * n + j];
            }
            a[r * n + c] = 0.0;
        }
    }

    let mut nullity = 0;
    for free in 0..n {
        if row_of_pivot[free] != n {
            continue;
        }
        let vec = &mut basis[nullity * n..(nullity + 1) * n];
        vec.fill(0.0);
        vec[free] = 1.0;
        for c in 0..n {
            let r = row_of_pivot[c];
            if r != n {
                vec[c] = -a[r * n + free];
            }
        }
        nullity += 1;
    }
    nullity
}
