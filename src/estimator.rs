//! The locally-optimised RANSAC estimator for two-view fundamental-matrix
//! geometry.
//!
//! Each iteration draws a seven-point sample, solves the minimal problem,
//! screens candidates with the oriented-epipolar check and scores survivors
//! over the whole set. Once the warm-up phase is over, a sample that improves
//! the per-sample maximum triggers local optimization. An adaptive stopping
//! rule shrinks the iteration budget as the consensus grows.

use log::debug;

use crate::error::EstimateError;
use crate::geometry::{all_orientations_valid, sampson_errors};
use crate::optimiser::LocalOptimiser;
use crate::sampler::{SamplePool, UniformRandom};
use crate::scoring::{collect_inliers, Score};
use crate::settings::RansacSettings;
use crate::solver::{seven_point, MINIMAL_SAMPLE_SIZE};
use crate::types::{CorrespondenceSet, FundamentalMatrix};

/// A fundamental-matrix estimator.
pub trait Estimator {
    /// Human-readable name for logs and reports.
    fn name(&self) -> &'static str;

    /// Estimate a model from tentative correspondences.
    fn estimate(&self, data: &CorrespondenceSet) -> Result<Estimation, EstimateError>;
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Estimation {
    /// The best model found. All-zero when no sample ever produced a valid
    /// candidate.
    pub model: FundamentalMatrix,
    /// Quality of the model over the full set.
    pub score: Score,
    /// Indices of correspondences within the threshold under the model.
    pub inlier_indices: Vec<usize>,
    /// Complement of `inlier_indices`.
    pub outlier_indices: Vec<usize>,
    /// Number of main-loop iterations actually executed.
    pub iterations: usize,
}

impl Estimation {
    /// The inlier correspondences as `(x1, y1, x2, y2)` rows.
    pub fn inliers(&self, data: &CorrespondenceSet) -> Vec<[f64; 4]> {
        self.inlier_indices.iter().map(|&i| data.points(i)).collect()
    }

    /// The outlier correspondences as `(x1, y1, x2, y2)` rows.
    pub fn outliers(&self, data: &CorrespondenceSet) -> Vec<[f64; 4]> {
        self.outlier_indices.iter().map(|&i| data.points(i)).collect()
    }
}

/// Iteration budget that brings the probability of having missed an
/// all-inlier sample below `1 - confidence`, given `inlier_count` of
/// `total` correspondences. Never grows past `max_iterations`; callers only
/// ever shrink with it.
pub fn recalculate_max_iterations(
    inlier_count: usize,
    confidence: f64,
    total: usize,
    max_iterations: usize,
    epsilon: f64,
) -> usize {
    let mut a = 1.0f64;
    let mut b = 1.0f64;
    for i in 0..MINIMAL_SAMPLE_SIZE {
        a *= inlier_count.saturating_sub(i) as f64;
        b *= total.saturating_sub(i) as f64;
    }
    let fraction = a / b;

    if fraction < epsilon {
        max_iterations
    } else if 1.0 - fraction < epsilon {
        1
    } else {
        let needed = (1.0 - confidence).ln() / (1.0 - fraction).ln();
        needed.round().min(max_iterations as f64) as usize
    }
}

/// LO-RANSAC with the seven-point minimal solver.
#[derive(Debug, Default)]
pub struct LoRansacEstimator {
    settings: RansacSettings,
}

impl LoRansacEstimator {
    pub fn new(settings: RansacSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RansacSettings {
        &self.settings
    }
}

impl Estimator for LoRansacEstimator {
    fn name(&self) -> &'static str {
        "LoRansac"
    }

    fn estimate(&self, data: &CorrespondenceSet) -> Result<Estimation, EstimateError> {
        let n = data.len();
        if n < MINIMAL_SAMPLE_SIZE {
            return Err(EstimateError::TooFewCorrespondences(n));
        }

        let cfg = &self.settings;
        let mut rng = match cfg.seed {
            Some(seed) => UniformRandom::from_seed(seed),
            None => UniformRandom::new(),
        };
        let mut pool = SamplePool::new(n);
        let mut optimiser = LocalOptimiser::new(n);

        let mut best_model = [0.0f64; 9];
        let mut best_score = Score::zero();
        // Residuals of the adopted model; infinity marks "no model yet" so
        // the final partition yields no inliers in that case.
        let mut best_residuals = vec![f64::INFINITY; n];

        // Best score seen from a raw minimal sample, and its residuals; this
        // is what seeds local optimization.
        let mut single_score = Score::zero();
        let mut single_residuals = vec![f64::INFINITY; n];

        let mut residuals = vec![0.0f64; n];
        let mut inlier_scratch = Vec::with_capacity(n);

        let mut lo_ran = false;
        let mut budget = cfg.max_iterations;
        let mut iteration = 0;

        while iteration < budget {
            let mut new_maximum = false;
            let mut do_iterate = false;

            let sample = pool.draw(MINIMAL_SAMPLE_SIZE, &mut rng).to_vec();
            for f in seven_point(data, &sample, cfg.pivot_tolerance) {
                if !all_orientations_valid(&f, data, &sample, cfg.orientation_epsilon) {
                    continue;
                }

                sampson_errors(data, &f, &mut residuals);
                let score = collect_inliers(&residuals, cfg.threshold, &mut inlier_scratch);

                if score.beats(&best_score, cfg.score_policy) {
                    best_score = score;
                    best_model = f;
                    best_residuals.copy_from_slice(&residuals);
                    new_maximum = true;
                }
                if score.beats(&single_score, cfg.score_policy) {
                    single_score = score;
                    single_residuals.copy_from_slice(&residuals);
                    do_iterate = iteration > cfg.lo_warmup_iterations;
                }
            }

            if iteration >= cfg.lo_warmup_iterations
                && !lo_ran
                && single_score.inlier_count > MINIMAL_SAMPLE_SIZE
            {
                do_iterate = true;
            }

            if do_iterate && cfg.local_optimization {
                lo_ran = true;
                if let Some(refined) = optimiser.run(data, cfg, &mut rng, &single_residuals) {
                    if refined.score.beats(&best_score, cfg.score_policy) {
                        best_score = refined.score;
                        best_model = refined.model;
                        best_residuals.copy_from_slice(&refined.residuals);
                        new_maximum = true;
                    }
                }
            }

            if new_maximum {
                let recalculated = recalculate_max_iterations(
                    best_score.inlier_count,
                    cfg.confidence,
                    n,
                    cfg.max_iterations,
                    cfg.epsilon,
                );
                if recalculated < budget {
                    debug!(
                        "downsizing iteration budget {} -> {} ({} of {} inliers, confidence {})",
                        budget, recalculated, best_score.inlier_count, n, cfg.confidence
                    );
                    budget = recalculated;
                }
            }

            iteration += 1;
        }

        // If the warm-up never elapsed, run at least one local optimization.
        if cfg.local_optimization && !lo_ran && single_score.inlier_count > MINIMAL_SAMPLE_SIZE {
            if let Some(refined) = optimiser.run(data, cfg, &mut rng, &single_residuals) {
                if refined.score.beats(&best_score, cfg.score_policy) {
                    best_score = refined.score;
                    best_model = refined.model;
                    best_residuals.copy_from_slice(&refined.residuals);
                }
            }
        }

        let mut inlier_indices = Vec::with_capacity(best_score.inlier_count);
        let mut outlier_indices = Vec::new();
        for (i, &r) in best_residuals.iter().enumerate() {
            if r <= cfg.threshold {
                inlier_indices.push(i);
            } else {
                outlier_indices.push(i);
            }
        }

        Ok(Estimation {
            model: FundamentalMatrix(best_model),
            score: best_score,
            inlier_indices,
            outlier_indices,
            iterations: iteration,
        })
    }
}
