//! Real roots of a cubic polynomial, Cardano's method with the
//! trigonometric branch for three-real-root discriminants. The seven-point
//! solver turns its rank constraint into exactly this problem.

/// Real roots of `c[0] + c[1]x + c[2]x^2 + c[3]x^3`, written into `roots`.
/// Returns how many roots were produced (1 or 3 for a genuine cubic, fewer
/// when the leading coefficients vanish). Each root gets one Newton step
/// against the original polynomial to shave off branch roundoff.
pub fn real_cubic_roots(c: &[f64; 4], roots: &mut [f64; 3]) -> usize {
    if c[3].abs() < 1e-30 {
        return real_quadratic_roots(c, roots);
    }

    let a = c[2] / c[3];
    let b = c[1] / c[3];
    let d = c[0] / c[3];

    // Depressed form t^3 + p t + q with x = t - a/3.
    let shift = a / 3.0;
    let p = b - a * a / 3.0;
    let q = 2.0 * a * a * a / 27.0 - a * b / 3.0 + d;

    let count;
    if p == 0.0 && q == 0.0 {
        roots[0] = -shift;
        count = 1;
    } else {
        let disc = q * q / 4.0 + p * p * p / 27.0;
        if disc > 0.0 {
            let sq = disc.sqrt();
            let t = (-q / 2.0 + sq).cbrt() + (-q / 2.0 - sq).cbrt();
            roots[0] = t - shift;
            count = 1;
        } else {
            // Three real roots. cosphi can drift just outside [-1, 1] when
            // the discriminant sits near zero.
            let m = 2.0 * (-p / 3.0).sqrt();
            let cosphi = (3.0 * q / (p * m)).clamp(-1.0, 1.0);
            let phi = cosphi.acos() / 3.0;
            for (k, slot) in roots.iter_mut().enumerate() {
                let angle = phi - 2.0 * std::f64::consts::PI * k as f64 / 3.0;
                *slot = m * angle.cos() - shift;
            }
            count = 3;
        }
    }

    for root in roots.iter_mut().take(count) {
        *root = newton_polish(c, *root);
    }
    count
}

fn real_quadratic_roots(c: &[f64; 4], roots: &mut [f64; 3]) -> usize {
    if c[2].abs() < 1e-30 {
        if c[1].abs() < 1e-30 {
            return 0;
        }
        roots[0] = -c[0] / c[1];
        return 1;
    }
    let disc = c[1] * c[1] - 4.0 * c[2] * c[0];
    if disc < 0.0 {
        return 0;
    }
    let sq = disc.sqrt();
    roots[0] = (-c[1] + sq) / (2.0 * c[2]);
    roots[1] = (-c[1] - sq) / (2.0 * c[2]);
    2
}

fn newton_polish(c: &[f64; 4], x: f64) -> f64 {
    let f = ((c[3] * x + c[2]) * x + c[1]) * x + c[0];
    let df = (3.0 * c[3] * x + 2.0 * c[2]) * x + c[1];
    if df.abs() > 1e-30 {
        let step = f / df;
        if step.is_finite() {
            return x - step;
        }
    }
    x
}
