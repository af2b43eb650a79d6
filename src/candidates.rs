//! Quasi-random candidate pools using scrambled Sobol sequences.
//!
//! [`SobolCandidates`] produces points in `[0, 1)^d` from a Sobol sequence
//! scrambled via the Burley 2020 algorithm. Points spread across the unit
//! cube far more evenly than independent uniform draws, so a smaller pool
//! gives the same coverage.
//!
//! The generator keeps a cursor into the sequence: consecutive calls to
//! [`draw`](SobolCandidates::draw) continue where the previous one stopped,
//! so one generator never hands out the same point twice.
//!
//! `sobol_burley` supports 2^16 points per seed. Past that, the cursor moves
//! on to a fresh scramble of the sequence.

use sobol_burley::sample;

/// Number of dimensions supported by one `sobol_burley` seed.
const DIMS_PER_SEED: usize = 256;

/// Number of points supported by one `sobol_burley` seed.
const POINTS_PER_SEED: u64 = 1 << 16;

/// Stateful scrambled-Sobol candidate generator.
#[derive(Clone, Debug)]
pub struct SobolCandidates {
    dims: usize,
    seed: u32,
    next_index: u64,
}

impl SobolCandidates {
    /// Creates a generator for `dims` dimensions, drawing its scramble seed
    /// from `rng`.
    #[must_use]
    pub fn new(dims: usize, rng: &mut fastrand::Rng) -> Self {
        Self::with_seed(dims, rng.u32(..))
    }

    /// Creates a generator with an explicit scramble seed.
    ///
    /// Equal seeds give identical sequences.
    #[must_use]
    pub fn with_seed(dims: usize, seed: u32) -> Self {
        Self {
            dims,
            seed,
            next_index: 0,
        }
    }

    /// Dimensionality of the generated points.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of points drawn so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.next_index
    }

    /// Draws the next `n` points of the sequence.
    #[must_use]
    pub fn draw(&mut self, n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|_| {
                let index = self.next_index;
                self.next_index += 1;
                self.point(index)
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn point(&self, index: u64) -> Vec<f64> {
        // Indices past the table restart it under a decorrelated seed.
        let round = (index / POINTS_PER_SEED) as u32;
        let local = (index % POINTS_PER_SEED) as u32;
        let base = self.seed.wrapping_add(round.wrapping_mul(0x85EB_CA6B));
        (0..self.dims)
            .map(|d| {
                // Dimensions past the table reuse it under a decorrelated seed.
                let block = (d / DIMS_PER_SEED) as u32;
                let dim = (d % DIMS_PER_SEED) as u32;
                let seed = base.wrapping_add(block.wrapping_mul(0x9E37_79B9));
                f64::from(sample(local, dim, seed))
            })
            .collect()
    }
}
