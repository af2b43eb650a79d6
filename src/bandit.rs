//! Multi-armed bandit over categorical assignments.
//!
//! [`CategoricalBandit`] runs one EXP3 agent per categorical position
//! (nominal or ordinal dimension). Each category is an arm. Selection
//! probabilities mix the exponential weights with uniform exploration:
//!
//! ```text
//! p_c = (1 - γ) w_c / Σ w + γ / C
//! γ   = min(1, sqrt(C ln(C / b) / ((e - 1) b T)))   if C > b
//! γ   = min(1, sqrt(C ln C / ((e - 1) b T)))         otherwise
//! ```
//!
//! where `C` is the number of categories, `b` the batch size and
//! `T = 2/3 · max_n_iter` the expected number of rounds. After each round every chosen arm receives an
//! importance-weighted reward `r / p_c`, where `r` is the observed label
//! min-max normalized over everything seen so far (lower labels score
//! higher rewards).
//!
//! The bandit stays passive until it has seen `n_init` observations:
//! [`initialize`](CategoricalBandit::initialize) and
//! [`observe`](CategoricalBandit::observe) are no-ops below that threshold,
//! leaving the initial design to whoever produced it.

use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reward bookkeeping for one arm (one category of one position).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArmStatistics {
    /// Number of observations in which this category was chosen.
    pub pulls: u64,
    /// Sum of normalized rewards received.
    pub reward_sum: f64,
}

impl ArmStatistics {
    /// Mean normalized reward, or `None` if the arm was never pulled.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_reward(&self) -> Option<f64> {
        (self.pulls > 0).then(|| self.reward_sum / self.pulls as f64)
    }
}

/// Tuning knobs for [`CategoricalBandit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BanditConfig {
    /// Assignments drawn per round, used to set the exploration rate.
    pub batch_size: usize,
    /// Expected number of rounds, used to set the exploration rate.
    pub max_n_iter: usize,
    /// Observations required before the bandit starts learning.
    pub n_init: usize,
    /// Resampling attempts used to avoid repeated assignments when the
    /// black box is noiseless.
    pub resample_tol: usize,
    /// Whether repeated assignments can yield new information.
    pub noisy_black_box: bool,
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            max_n_iter: 200,
            n_init: 20,
            resample_tol: 500,
            noisy_black_box: true,
        }
    }
}

/// EXP3 bandit over the categorical sub-vector.
#[derive(Clone, Debug)]
pub struct CategoricalBandit {
    n_levels: Vec<usize>,
    config: BanditConfig,
    gammas: Vec<f64>,
    log_weights: Vec<Vec<f64>>,
    arms: Vec<Vec<ArmStatistics>>,
    observed: HashSet<Vec<usize>>,
    y_min: f64,
    y_max: f64,
    initialized: bool,
    rng: fastrand::Rng,
}

impl CategoricalBandit {
    /// Creates a bandit for positions with the given category counts.
    #[must_use]
    pub fn new(n_levels: Vec<usize>, config: BanditConfig, rng: fastrand::Rng) -> Self {
        let gammas = n_levels
            .iter()
            .map(|&c| exploration_rate(c, config.batch_size, config.max_n_iter))
            .collect();
        let log_weights = n_levels.iter().map(|&c| vec![0.0; c]).collect();
        let arms = n_levels
            .iter()
            .map(|&c| vec![ArmStatistics::default(); c])
            .collect();
        Self {
            n_levels,
            config,
            gammas,
            log_weights,
            arms,
            observed: HashSet::new(),
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
            initialized: false,
            rng,
        }
    }

    /// Category counts per position.
    #[must_use]
    pub fn n_levels(&self) -> &[usize] {
        &self.n_levels
    }

    /// The configuration this bandit was built with.
    #[must_use]
    pub fn config(&self) -> &BanditConfig {
        &self.config
    }

    /// Whether [`initialize`](Self::initialize) has taken effect.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Arm statistics per position and category.
    #[must_use]
    pub fn arm_statistics(&self) -> &[Vec<ArmStatistics>] {
        &self.arms
    }

    /// Exploration rate of each position.
    #[must_use]
    pub fn gammas(&self) -> &[f64] {
        &self.gammas
    }

    /// Current selection probabilities for one position.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn probabilities(&self, position: usize) -> Vec<f64> {
        let log_w = &self.log_weights[position];
        let gamma = self.gammas[position];
        let k = log_w.len() as f64;
        let max = log_w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = log_w.iter().map(|&l| (l - max).exp()).collect();
        let total: f64 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return vec![1.0 / k; log_w.len()];
        }
        weights
            .iter()
            .map(|w| (1.0 - gamma) * w / total + gamma / k)
            .collect()
    }

    /// Proposes `n` assignments, repetition allowed.
    ///
    /// For a noiseless black box, assignments already observed or already in
    /// this batch are redrawn up to `resample_tol` times.
    #[must_use]
    pub fn suggest(&mut self, n: usize) -> Vec<Vec<usize>> {
        let probs: Vec<Vec<f64>> = (0..self.n_levels.len())
            .map(|pos| self.probabilities(pos))
            .collect();

        let mut batch: Vec<Vec<usize>> = Vec::with_capacity(n);
        for _ in 0..n {
            let mut assignment = self.sample_assignment(&probs);
            if !self.config.noisy_black_box {
                let mut attempts = 0;
                while attempts < self.config.resample_tol
                    && (self.observed.contains(&assignment) || batch.contains(&assignment))
                {
                    assignment = self.sample_assignment(&probs);
                    attempts += 1;
                }
            }
            batch.push(assignment);
        }
        batch
    }

    /// Seeds arm statistics from the initial design.
    ///
    /// Does nothing and returns `Ok(false)` if fewer than `n_init`
    /// observations are given or the bandit is already initialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] or [`Error::InvalidCategory`] if
    /// an assignment does not fit the categorical positions.
    pub fn initialize(&mut self, points: &[Vec<usize>], labels: &[f64]) -> Result<bool> {
        if self.initialized || points.len() < self.config.n_init {
            return Ok(false);
        }
        self.update(points, labels)?;
        self.initialized = true;
        trace_debug!(n_points = points.len(), "categorical bandit initialized");
        Ok(true)
    }

    /// Updates arm statistics from one round of observations.
    ///
    /// Does nothing and returns `Ok(false)` before initialization.
    ///
    /// # Errors
    ///
    /// See [`initialize`](Self::initialize).
    pub fn observe(&mut self, points: &[Vec<usize>], labels: &[f64]) -> Result<bool> {
        if !self.initialized {
            return Ok(false);
        }
        self.update(points, labels)?;
        Ok(true)
    }

    fn sample_assignment(&mut self, probs: &[Vec<f64>]) -> Vec<usize> {
        probs
            .iter()
            .map(|p| {
                let r = self.rng.f64();
                let mut cdf = 0.0;
                for (c, pc) in p.iter().enumerate() {
                    cdf += pc;
                    if r < cdf {
                        return c;
                    }
                }
                p.len() - 1
            })
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn update(&mut self, points: &[Vec<usize>], labels: &[f64]) -> Result<()> {
        if points.len() != labels.len() {
            return Err(Error::DimensionMismatch {
                expected: points.len(),
                got: labels.len(),
            });
        }
        for point in points {
            self.check_assignment(point)?;
        }

        for &y in labels.iter().filter(|y| y.is_finite()) {
            self.y_min = self.y_min.min(y);
            self.y_max = self.y_max.max(y);
        }

        let probs: Vec<Vec<f64>> = (0..self.n_levels.len())
            .map(|pos| self.probabilities(pos))
            .collect();

        for (point, &y) in points.iter().zip(labels) {
            self.observed.insert(point.clone());
            if !y.is_finite() {
                continue;
            }
            let reward = self.normalized_reward(y);
            for (pos, &c) in point.iter().enumerate() {
                let arm = &mut self.arms[pos][c];
                arm.pulls += 1;
                arm.reward_sum += reward;

                let k = self.n_levels[pos] as f64;
                let estimate = reward / probs[pos][c];
                self.log_weights[pos][c] += self.gammas[pos] * estimate / k;
            }
        }
        Ok(())
    }

    fn normalized_reward(&self, y: f64) -> f64 {
        let range = self.y_max - self.y_min;
        if range > f64::EPSILON {
            (self.y_max - y) / range
        } else {
            0.5
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn check_assignment(&self, point: &[usize]) -> Result<()> {
        if point.len() != self.n_levels.len() {
            return Err(Error::DimensionMismatch {
                expected: self.n_levels.len(),
                got: point.len(),
            });
        }
        for (position, (&c, &n)) in point.iter().zip(&self.n_levels).enumerate() {
            if c >= n {
                return Err(Error::InvalidCategory {
                    position,
                    value: c as f64,
                });
            }
        }
        Ok(())
    }
}

/// Batched EXP3 exploration rate for `n_arms` arms, `batch_size` plays per
/// round and `max_n_iter` rounds.
#[allow(clippy::cast_precision_loss)]
fn exploration_rate(n_arms: usize, batch_size: usize, max_n_iter: usize) -> f64 {
    let c = n_arms as f64;
    let b = batch_size.max(1) as f64;
    let t = (2.0 * max_n_iter as f64 / 3.0).max(1.0);
    let spread = if c > b { (c / b).ln() } else { c.ln() };
    (c * spread / ((core::f64::consts::E - 1.0) * b * t))
        .sqrt()
        .min(1.0)
}
