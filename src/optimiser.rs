//! Local optimization: the inner-RANSAC-with-iterated-least-squares step that
//! turns a promising minimal-sample hypothesis into a refined model.
//!
//! Triggered by the main loop once a sample beats the per-sample maximum, it
//! widens the inlier set under a relaxed threshold, refits, then repeats an
//! inner loop of subset draws, each followed by a few reweighted refits while
//! the relaxed threshold anneals back down to the real one.

use crate::geometry::{sampson_errors, sampson_errors_weighted};
use crate::sampler::{random_subset, UniformRandom};
use crate::scoring::{collect_inliers, Score};
use crate::settings::RansacSettings;
use crate::solver::fit_indices;
use crate::types::CorrespondenceSet;

/// Relaxation factor applied to the threshold when widening an inlier set.
const THRESHOLD_MULTIPLIER: f64 = 4.0;

/// Inner RANSAC repetitions per local optimization.
const INNER_REPEATS: usize = 10;

/// Reweighted least-squares rounds per inner repetition.
const REFIT_ROUNDS: usize = 4;

/// Largest subset size drawn for the inner refits.
const SUBSET_CAP: usize = 14;

/// Local optimization refuses to run on fewer widened inliers than this.
const MIN_WIDENED_INLIERS: usize = 16;

/// Any refit needs at least this many inliers to be worth doing.
const MIN_REFIT_INLIERS: usize = 8;

/// A refined model together with its score and full residual vector.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub score: Score,
    pub model: [f64; 9],
    pub residuals: Vec<f64>,
}

/// Scratch space reused across local optimizations of one run.
#[derive(Debug)]
pub struct LocalOptimiser {
    rows: Vec<f64>,
    residuals: Vec<f64>,
    weights: Vec<f64>,
    inliers: Vec<usize>,
    subset_pool: Vec<usize>,
}

impl LocalOptimiser {
    pub fn new(n: usize) -> Self {
        Self {
            rows: Vec::new(),
            residuals: vec![0.0; n],
            weights: vec![0.0; n],
            inliers: Vec::with_capacity(n),
            subset_pool: Vec::with_capacity(n),
        }
    }

    fn effective_limit(settings: &RansacSettings) -> usize {
        if settings.inliers_limit == 0 {
            usize::MAX
        } else {
            settings.inliers_limit
        }
    }

    /// Run one local optimization seeded by `seed_residuals`, the residual
    /// vector of the best model from the triggering sample. Returns `None`
    /// when the widened consensus is too small to optimise or the initial
    /// refit fails.
    pub fn run(
        &mut self,
        data: &CorrespondenceSet,
        settings: &RansacSettings,
        rng: &mut UniformRandom,
        seed_residuals: &[f64],
    ) -> Option<Refinement> {
        let threshold = settings.threshold;
        let relaxed = THRESHOLD_MULTIPLIER * threshold;

        // Widen under the relaxed threshold and refit once.
        collect_inliers(seed_residuals, relaxed, &mut self.inliers);
        let f = fit_indices(data, &self.inliers, None, &mut self.rows)?;
        sampson_errors(data, &f, &mut self.residuals);

        let base = collect_inliers(&self.residuals, threshold, &mut self.inliers);
        if base.inlier_count < MIN_WIDENED_INLIERS {
            return None;
        }

        // The inner iteration reuses the shared index buffer, so the base
        // consensus set gets its own copy.
        let base_inliers = self.inliers.clone();
        let sample_size = (base.inlier_count / 2).min(SUBSET_CAP);

        let mut best: Option<Refinement> = None;
        for _ in 0..INNER_REPEATS {
            self.subset_pool.clear();
            self.subset_pool.extend_from_slice(&base_inliers);
            let subset = random_subset(&mut self.subset_pool, sample_size, rng).to_vec();

            let f = match fit_indices(data, &subset, None, &mut self.rows) {
                Some(f) => f,
                None => continue,
            };
            sampson_errors(data, &f, &mut self.residuals);

            let candidate = self.iterate(data, settings, rng, f);
            let replace = match &best {
                Some(current) => candidate.score.beats(&current.score, settings.score_policy),
                None => true,
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }

    /// Iterated reweighted least squares from the model whose residuals are
    /// currently in `self.residuals`, annealing the relaxed threshold down to
    /// the real one over [`REFIT_ROUNDS`] rounds.
    fn iterate(
        &mut self,
        data: &CorrespondenceSet,
        settings: &RansacSettings,
        rng: &mut UniformRandom,
        seed_model: [f64; 9],
    ) -> Refinement {
        let threshold = settings.threshold;
        let limit = Self::effective_limit(settings);
        let mut relaxed = THRESHOLD_MULTIPLIER * threshold;
        let step = (relaxed - threshold) / REFIT_ROUNDS as f64;

        let mut best = Refinement {
            score: collect_inliers(&self.residuals, threshold, &mut self.inliers),
            model: seed_model,
            residuals: self.residuals.clone(),
        };
        if best.score.inlier_count < MIN_REFIT_INLIERS {
            return Refinement {
                score: Score::zero(),
                model: seed_model,
                residuals: self.residuals.clone(),
            };
        }

        let mut f = match self.capped_fit(data, rng, limit, None) {
            Some(f) => f,
            None => return best,
        };

        for _ in 0..REFIT_ROUNDS {
            sampson_errors_weighted(data, &f, &mut self.residuals, &mut self.weights);
            let score = collect_inliers(&self.residuals, threshold, &mut self.inliers);
            if score.beats(&best.score, settings.score_policy) {
                best.score = score;
                best.model = f;
                best.residuals.copy_from_slice(&self.residuals);
            }

            let widened = collect_inliers(&self.residuals, relaxed, &mut self.inliers);
            if widened.inlier_count < MIN_REFIT_INLIERS {
                return best;
            }

            let weights = std::mem::take(&mut self.weights);
            let refit = self.capped_fit(data, rng, limit, Some(&weights));
            self.weights = weights;
            match refit {
                Some(next) => f = next,
                None => return best,
            }
            relaxed -= step;
        }

        sampson_errors(data, &f, &mut self.residuals);
        let score = collect_inliers(&self.residuals, threshold, &mut self.inliers);
        if score.beats(&best.score, settings.score_policy) {
            best.score = score;
            best.model = f;
            best.residuals.copy_from_slice(&self.residuals);
        }
        best
    }

    /// Least-squares fit over the current inlier set, subsampled down to the
    /// configured limit when it is larger.
    fn capped_fit(
        &mut self,
        data: &CorrespondenceSet,
        rng: &mut UniformRandom,
        limit: usize,
        weights: Option<&[f64]>,
    ) -> Option<[f64; 9]> {
        if self.inliers.len() <= limit {
            return fit_indices(data, &self.inliers, weights, &mut self.rows);
        }
        self.subset_pool.clear();
        self.subset_pool.extend_from_slice(&self.inliers);
        let subset = random_subset(&mut self.subset_pool, limit, rng).to_vec();
        fit_indices(data, &subset, weights, &mut self.rows)
    }
}
