//! # loransac - Locally-Optimised RANSAC for Two-View Geometry
//!
//! `loransac` estimates the fundamental matrix relating two views of a rigid
//! scene from tentative point correspondences contaminated by outliers. It
//! implements LO-RANSAC: plain RANSAC over seven-point minimal samples, with
//! a local optimization step that refits promising hypotheses by inner RANSAC
//! and iterated reweighted least squares.
//!
//! The dense linear algebra the solvers need (SVD, symmetric
//! eigendecomposition, null spaces, cubic roots) is implemented in
//! [`linalg`] rather than delegated, so the numerical behaviour is
//! self-contained and deterministic given a seed.
//!
//! ## Quick Start
//!
//! ```rust
//! use loransac::{CorrespondenceSet, Estimator, LoRansacEstimator, RansacSettings};
//!
//! // Two views of a 3D point cloud; camera 2 is translated by (0.2, 0, 1).
//! let mut rows = Vec::new();
//! for i in 0..40 {
//!     let a = i as f64 * 0.37;
//!     let (x, y, z) = (a.sin(), (2.0 * a).cos(), 3.0 + (1.3 * a).sin());
//!     rows.push([x / z, y / z, (x + 0.2) / (z + 1.0), y / (z + 1.0)]);
//! }
//! let data = CorrespondenceSet::from_points(&rows);
//!
//! let settings = RansacSettings::default().with_threshold(1e-6).with_seed(7);
//! let result = LoRansacEstimator::new(settings).estimate(&data).unwrap();
//!
//! assert!(result.inlier_indices.len() >= 35);
//! println!("{} inliers in {} iterations", result.inlier_indices.len(), result.iterations);
//! ```
//!
//! ## Anatomy of a Run
//!
//! - [`sampler`] draws uniform seven-point samples without replacement.
//! - [`solver`] turns a sample into one to three model candidates via the
//!   seven-point algorithm, and fits least-squares models for the optimiser.
//! - [`geometry`] provides Sampson residuals, Hartley conditioning, rank-2
//!   projection and the oriented-epipolar screen.
//! - [`scoring`] accumulates truncated-quadratic gain and inlier counts; the
//!   comparison policy is configurable through [`ScorePolicy`].
//! - [`optimiser`] runs the local optimization step.
//! - [`estimator`] ties it together under an adaptive iteration budget.
//!
//! Residuals are *squared* Sampson distances, and the threshold in
//! [`RansacSettings`] is compared against them directly.

pub mod error;
pub mod estimator;
pub mod geometry;
pub mod linalg;
pub mod optimiser;
pub mod sampler;
pub mod scoring;
pub mod settings;
pub mod solver;
pub mod types;

pub use error::EstimateError;
pub use estimator::{Estimation, Estimator, LoRansacEstimator};
pub use scoring::{Score, ScorePolicy};
pub use settings::RansacSettings;
pub use types::{CorrespondenceSet, FundamentalMatrix};
