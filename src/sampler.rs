//! Uniform sampling without replacement over an index pool.
//!
//! The pool is an owned permutation of `0..n` with a draw-and-swap scheme: a
//! uniformly random active slot is swapped to a shrinking excluded tail, so a
//! draw of `k` indices is O(k) and allocation-free. The drawn indices are the
//! last `k` entries of the pool. The pool stays a permutation across draws, so
//! it never needs resetting between iterations.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seedable uniform random generator owned by one estimator run.
///
/// Production runs seed from entropy; tests inject a fixed seed to make the
/// whole run reproducible.
#[derive(Debug)]
pub struct UniformRandom {
    rng: StdRng,
}

impl UniformRandom {
    /// Construct with an entropy seed.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Construct from a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A uniform index in `0..bound`; `bound` must be positive.
    #[inline]
    pub fn index_below(&mut self, bound: usize) -> usize {
        self.rng.random_range(0..bound)
    }
}

impl Default for UniformRandom {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw `count` distinct entries from the first `active` slots of `pool` by
/// swapping each pick to the excluded tail. Returns the drawn entries as the
/// slice `&pool[active - count..active]`.
///
/// Precondition: `count <= active <= pool.len()`.
pub fn draw_into_tail<'a>(
    pool: &'a mut [usize],
    active: usize,
    count: usize,
    rng: &mut UniformRandom,
) -> &'a [usize] {
    debug_assert!(count <= active && active <= pool.len());
    for i in 0..count {
        let slot = rng.index_below(active - i);
        pool.swap(slot, active - i - 1);
    }
    &pool[active - count..active]
}

/// Index pool for drawing minimal samples over the full correspondence set.
#[derive(Debug)]
pub struct SamplePool {
    indices: Vec<usize>,
}

impl SamplePool {
    pub fn new(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Draw `count` distinct indices uniformly without replacement.
    pub fn draw(&mut self, count: usize, rng: &mut UniformRandom) -> &[usize] {
        let active = self.indices.len();
        draw_into_tail(&mut self.indices, active, count, rng)
    }
}

/// Draw a random `count`-element subset of `pool` (the same draw-and-swap
/// primitive over an arbitrary index slice); used by local optimization to
/// subsample inlier sets. Returns the tail slice holding the subset.
pub fn random_subset<'a>(
    pool: &'a mut [usize],
    count: usize,
    rng: &mut UniformRandom,
) -> &'a [usize] {
    let active = pool.len();
    draw_into_tail(pool, active, count, rng)
}
