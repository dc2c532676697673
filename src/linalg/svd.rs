//! Singular value decomposition of a dense m x n matrix (m >= n).
//!
//! Householder bidiagonalization followed by implicit-shift QR iteration on
//! the bidiagonal form. Singular values come out unsorted; any that the QR
//! sweep leaves negative are sign-flipped together with their V column, so the
//! returned values are non-negative. The iteration is capped at 30 QR sweeps
//! per singular value; hitting the cap means the decomposition did not
//! converge and the caller must treat the hypothesis as lost, not panic.

use nalgebra::DMatrix;

const MAX_QR_SWEEPS: usize = 30;

/// Result of [`svd`]: `a = u * diag(sigma) * v'` with orthogonal `u` (m x n)
/// and `v` (n x n).
#[derive(Debug, Clone)]
pub struct Svd {
    pub u: DMatrix<f64>,
    pub sigma: Vec<f64>,
    pub v: DMatrix<f64>,
}

impl Svd {
    /// Column index of the smallest singular value.
    pub fn min_index(&self) -> usize {
        let mut j = 0;
        for i in 1..self.sigma.len() {
            if self.sigma[i] < self.sigma[j] {
                j = i;
            }
        }
        j
    }
}

#[inline]
fn same_sign(magnitude: f64, sign_of: f64) -> f64 {
    if sign_of >= 0.0 {
        magnitude.abs()
    } else {
        -magnitude.abs()
    }
}

/// `sqrt(a^2 + b^2)` without destructive underflow or overflow.
#[inline]
fn pythag(a: f64, b: f64) -> f64 {
    let abs_a = a.abs();
    let abs_b = b.abs();
    if abs_a > abs_b {
        let r = abs_b / abs_a;
        abs_a * (1.0 + r * r).sqrt()
    } else if abs_b == 0.0 {
        0.0
    } else {
        let r = abs_a / abs_b;
        abs_b * (1.0 + r * r).sqrt()
    }
}

/// Decompose `input` (m x n, m >= n). Returns `None` if the QR iteration
/// fails to converge.
pub fn svd(input: &DMatrix<f64>) -> Option<Svd> {
    let m = input.nrows();
    let n = input.ncols();
    debug_assert!(m >= n, "svd expects at least as many rows as columns");

    let mut a = input.clone();
    let mut v = DMatrix::<f64>::zeros(n, n);
    let mut w = vec![0.0f64; n];
    let mut rv1 = vec![0.0f64; n];

    // Householder reduction to bidiagonal form.
    let mut g = 0.0f64;
    let mut scale = 0.0f64;
    let mut anorm = 0.0f64;
    let mut l = 0usize;
    for i in 0..n {
        l = i + 1;
        rv1[i] = scale * g;
        g = 0.0;
        let mut s = 0.0;
        scale = 0.0;
        if i < m {
            for k in i..m {
                scale += a[(k, i)].abs();
            }
            if scale != 0.0 {
                for k in i..m {
                    a[(k, i)] /= scale;
                    s += a[(k, i)] * a[(k, i)];
                }
                let f = a[(i, i)];
                g = -same_sign(s.sqrt(), f);
                let h = f * g - s;
                a[(i, i)] = f - g;
                for j in l..n {
                    let mut s = 0.0;
                    for k in i..m {
                        s += a[(k, i)] * a[(k, j)];
                    }
                    let f = s / h;
                    for k in i..m {
                        let add = f * a[(k, i)];
                        a[(k, j)] += add;
                    }
                }
                for k in i..m {
                    a[(k, i)] *= scale;
                }
            }
        }
        w[i] = scale * g;
        g = 0.0;
        let mut s = 0.0;
        scale = 0.0;
        if i < m && i != n - 1 {
            for k in l..n {
                scale += a[(i, k)].abs();
            }
            if scale != 0.0 {
                for k in l..n {
                    a[(i, k)] /= scale;
                    s += a[(i, k)] * a[(i, k)];
                }
                let f = a[(i, l)];
                g = -same_sign(s.sqrt(), f);
                let h = f * g - s;
                a[(i, l)] = f - g;
                for k in l..n {
                    rv1[k] = a[(i, k)] / h;
                }
                for j in l..m {
                    let mut s = 0.0;
                    for k in l..n {
                        s += a[(j, k)] * a[(i, k)];
                    }
                    for k in l..n {
                        let add = s * rv1[k];
                        a[(j, k)] += add;
                    }
                }
                for k in l..n {
                    a[(i, k)] *= scale;
                }
            }
        }
        anorm = anorm.max(w[i].abs() + rv1[i].abs());
    }

    // Accumulate right-hand transformations into v.
    for i in (0..n).rev() {
        if i < n - 1 {
            if g != 0.0 {
                for j in l..n {
                    v[(j, i)] = (a[(i, j)] / a[(i, l)]) / g;
                }
                for j in l..n {
                    let mut s = 0.0;
                    for k in l..n {
                        s += a[(i, k)] * v[(k, j)];
                    }
                    for k in l..n {
                        let add = s * v[(k, i)];
                        v[(k, j)] += add;
                    }
                }
            }
            for j in l..n {
                v[(i, j)] = 0.0;
                v[(j, i)] = 0.0;
            }
        }
        v[(i, i)] = 1.0;
        g = rv1[i];
        l = i;
    }

    // Accumulate left-hand transformations in place (a becomes u).
    for i in (0..m.min(n)).rev() {
        let l = i + 1;
        g = w[i];
        for j in l..n {
            a[(i, j)] = 0.0;
        }
        if g != 0.0 {
            g = 1.0 / g;
            for j in l..n {
                let mut s = 0.0;
                for k in l..m {
                    s += a[(k, i)] * a[(k, j)];
                }
                let f = (s / a[(i, i)]) * g;
                for k in i..m {
                    let add = f * a[(k, i)];
                    a[(k, j)] += add;
                }
            }
            for j in i..m {
                a[(j, i)] *= g;
            }
        } else {
            for j in i..m {
                a[(j, i)] = 0.0;
            }
        }
        a[(i, i)] += 1.0;
    }

    // Diagonalize the bidiagonal form by implicit-shift QR.
    for k in (0..n).rev() {
        let mut converged = false;
        for sweep in 0..MAX_QR_SWEEPS {
            // Test for a split of the bidiagonal matrix. rv1[0] is always
            // zero, so the first branch fires before l can underflow.
            let mut l = k;
            let mut cancel = true;
            loop {
                if rv1[l].abs() + anorm == anorm {
                    cancel = false;
                    break;
                }
                if w[l - 1].abs() + anorm == anorm {
                    break;
                }
                l -= 1;
            }
            if cancel {
                // Cancel rv1[l] with Givens rotations applied to u.
                let mut c = 0.0f64;
                let mut s = 1.0f64;
                for i in l..=k {
                    let f = s * rv1[i];
                    rv1[i] *= c;
                    if f.abs() + anorm == anorm {
                        break;
                    }
                    let g = w[i];
                    let h = pythag(f, g);
                    w[i] = h;
                    let h = 1.0 / h;
                    c = g * h;
                    s = -f * h;
                    for j in 0..m {
                        let y = a[(j, l - 1)];
                        let z = a[(j, i)];
                        a[(j, l - 1)] = y * c + z * s;
                        a[(j, i)] = z * c - y * s;
                    }
                }
            }
            let z = w[k];
            if l == k {
                // Converged; pull negative singular values positive by
                // flipping the matching column of v.
                if z < 0.0 {
                    w[k] = -z;
                    for j in 0..n {
                        v[(j, k)] = -v[(j, k)];
                    }
                }
                converged = true;
                break;
            }
            if sweep == MAX_QR_SWEEPS - 1 {
                return None;
            }
            // Shift from the bottom 2x2 minor.
            let mut x = w[l];
            let nm = k - 1;
            let mut y = w[nm];
            let mut g = rv1[nm];
            let mut h = rv1[k];
            let mut f = ((y - z) * (y + z) + (g - h) * (g + h)) / (2.0 * h * y);
            g = pythag(f, 1.0);
            f = ((x - z) * (x + z) + h * ((y / (f + same_sign(g, f))) - h)) / x;
            // Next QR transformation.
            let mut c = 1.0f64;
            let mut s = 1.0f64;
            for j in l..=nm {
                let i = j + 1;
                g = rv1[i];
                y = w[i];
                h = s * g;
                g *= c;
                let z = pythag(f, h);
                rv1[j] = z;
                c = f / z;
                s = h / z;
                f = x * c + g * s;
                g = g * c - x * s;
                h = y * s;
                y *= c;
                for jj in 0..n {
                    let xx = v[(jj, j)];
                    let zz = v[(jj, i)];
                    v[(jj, j)] = xx * c + zz * s;
                    v[(jj, i)] = zz * c - xx * s;
                }
                let z = pythag(f, h);
                w[j] = z;
                if z != 0.0 {
                    let z = 1.0 / z;
                    c = f * z;
                    s = h * z;
                }
                f = c * g + s * y;
                x = c * y - s * g;
                for jj in 0..m {
                    let yy = a[(jj, j)];
                    let zz = a[(jj, i)];
                    a[(jj, j)] = yy * c + zz * s;
                    a[(jj, i)] = zz * c - yy * s;
                }
            }
            rv1[l] = 0.0;
            rv1[k] = f;
            w[k] = x;
        }
        if !converged {
            return None;
        }
    }

    Some(Svd {
        u: a,
        sigma: w,
        v,
    })
}
