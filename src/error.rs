//! Fatal input errors.
//!
//! Everything that can go wrong *during* a run — degenerate minimal samples,
//! failed orientation checks, decompositions that do not converge — is an
//! expected outcome handled by skipping to the next hypothesis. Only malformed
//! input is surfaced to the caller, and only before sampling starts.

use thiserror::Error;

/// Errors raised while ingesting correspondences, before any sampling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstimateError {
    /// The fundamental matrix needs a minimal sample of 7 correspondences.
    #[error("at least 7 correspondences are required, got {0}")]
    TooFewCorrespondences(usize),

    /// A correspondence row must hold 4 numbers (x1, y1, x2, y2) or 6
    /// (x1, y1, w1, x2, y2, w2).
    #[error("correspondence {index} has {len} coordinates, expected 4 or 6")]
    MalformedCorrespondence { index: usize, len: usize },
}
