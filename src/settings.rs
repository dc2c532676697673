//! Estimator configuration.
//!
//! All tunables are gathered into one immutable value passed at estimator
//! construction, so independent concurrent runs cannot race on shared
//! defaults. The numeric tolerances are empirically tuned constants; they are
//! configurable here rather than re-derived.

use crate::scoring::ScorePolicy;

/// Default inlier threshold on the Sampson residual, in pixels.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default maximal number of main-loop iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 1_000_000;

/// Default probability that at least one all-inlier sample is drawn.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Configuration for a [`LoRansacEstimator`](crate::LoRansacEstimator) run.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacSettings {
    /// Inlier/outlier threshold on the Sampson residual.
    pub threshold: f64,
    /// Iteration budget; the adaptive stopping rule only ever shrinks it.
    pub max_iterations: usize,
    /// Target confidence in `[0, 1]` for the adaptive stopping rule.
    pub confidence: f64,
    /// Cap on the number of points used in least-squares refits; 0 means
    /// unlimited.
    pub inliers_limit: usize,
    /// When `false`, the estimator degrades to plain consensus-maximizing
    /// RANSAC with the same scorer.
    pub local_optimization: bool,
    /// Policy for comparing two scores.
    pub score_policy: ScorePolicy,
    /// Seed for the run's random stream; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Number of samples drawn before local optimization may trigger.
    pub lo_warmup_iterations: usize,
    /// Epsilon for the epipole component test in the orientation check.
    pub orientation_epsilon: f64,
    /// Pivot tolerance for the null-space Gaussian elimination.
    pub pivot_tolerance: f64,
    /// Double-precision epsilon used by the adaptive stopping rule.
    pub epsilon: f64,
}

impl Default for RansacSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            confidence: DEFAULT_CONFIDENCE,
            inliers_limit: 0,
            local_optimization: true,
            score_policy: ScorePolicy::InlierCount,
            seed: None,
            lo_warmup_iterations: 50,
            orientation_epsilon: 1.9984e-15,
            pivot_tolerance: 1e-12,
            epsilon: 2.2204e-16,
        }
    }
}

impl RansacSettings {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_inliers_limit(mut self, inliers_limit: usize) -> Self {
        self.inliers_limit = inliers_limit;
        self
    }

    pub fn with_local_optimization(mut self, local_optimization: bool) -> Self {
        self.local_optimization = local_optimization;
        self
    }

    pub fn with_score_policy(mut self, score_policy: ScorePolicy) -> Self {
        self.score_policy = score_policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
