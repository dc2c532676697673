//! Model scoring: truncated-quadratic gain plus inlier count.
//!
//! A single pass over the residual buffer counts inliers, records their
//! indices and accumulates a truncated-quadratic gain per correspondence. The
//! gain saturates at zero for residuals beyond (9/4) of the threshold, so
//! outliers cannot dominate the comparison. This is MSAC-style scoring.

/// Policy used when deciding whether one [`Score`] beats another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorePolicy {
    /// Compare accumulated gain only.
    GainOnly,
    /// Compare inlier counts, break ties on accumulated gain.
    InlierCountThenGain,
    /// Compare inlier counts only: classical consensus maximization.
    #[default]
    InlierCount,
}

/// Quality of a model hypothesis over the whole correspondence set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Score {
    /// Accumulated truncated-quadratic gain; larger is better.
    pub gain: f64,
    /// Number of correspondences with residual at or below the threshold.
    pub inlier_count: usize,
}

impl Score {
    /// The "no inliers" score every run starts from.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Whether `self` beats `other` under `policy`.
    pub fn beats(&self, other: &Score, policy: ScorePolicy) -> bool {
        match policy {
            ScorePolicy::GainOnly => other.gain < self.gain,
            ScorePolicy::InlierCountThenGain => {
                if self.inlier_count == other.inlier_count {
                    other.gain < self.gain
                } else {
                    other.inlier_count < self.inlier_count
                }
            }
            ScorePolicy::InlierCount => other.inlier_count < self.inlier_count,
        }
    }
}

/// Truncated-quadratic gain of one residual: zero at or beyond
/// `(9/4) * threshold`, rising linearly to one at zero residual.
#[inline]
pub fn truncated_quadratic_gain(residual: f64, threshold: f64) -> f64 {
    if threshold == 0.0 {
        return 0.0;
    }
    let cutoff = threshold * 9.0 / 4.0;
    if residual >= cutoff {
        0.0
    } else {
        1.0 - residual / cutoff
    }
}

/// Scan `residuals` once, pushing the indices of those at or below
/// `threshold` into `inliers` (cleared first) and returning the score.
pub fn collect_inliers(residuals: &[f64], threshold: f64, inliers: &mut Vec<usize>) -> Score {
    inliers.clear();
    let mut score = Score::zero();
    for (i, &r) in residuals.iter().enumerate() {
        score.gain += truncated_quadratic_gain(r, threshold);
        if r <= threshold {
            inliers.push(i);
            score.inlier_count += 1;
        }
    }
    score
}
