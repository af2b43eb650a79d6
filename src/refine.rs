//! Gradient refinement of the numeric sub-vector.
//!
//! For a fixed categorical assignment, [`GradientRefiner`] produces numeric
//! sub-vectors that (approximately) minimize the acquisition value:
//!
//! 1. From the second point on, the previously produced point is
//!    hallucinated into a private model snapshot so later points see it.
//! 2. A Sobol pool of `n_cand` candidates is scored and ranked.
//! 3. The best `n_restarts` candidates seed `n_iter` steps of a
//!    [`ContinuousOptimizer`]; after every step discrete coordinates snap to
//!    their grid and all coordinates are clipped to `[0, 1]`. The restart
//!    with the lowest final score wins.
//!
//! With `n_restarts == 0`, a single pool is drawn for the whole call and
//! each point takes the best not-yet-used candidate of it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::acquisition::Acquisition;
use crate::candidates::SobolCandidates;
use crate::error::{Error, Result};
use crate::layout::VariableLayout;
use crate::model::{Model, ModelHandle};
use crate::space::nearest_index;

/// First-order optimizer used for local search.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContinuousOptimizer {
    /// Adaptive moment estimation.
    Adam {
        /// Step size.
        lr: f64,
        /// Decay rate of the first-moment estimate.
        beta1: f64,
        /// Decay rate of the second-moment estimate.
        beta2: f64,
        /// Denominator stabilizer.
        eps: f64,
    },
    /// Plain gradient descent.
    Sgd {
        /// Step size.
        lr: f64,
    },
}

impl ContinuousOptimizer {
    /// Adam with the usual `(0.9, 0.999, 1e-8)` moment settings.
    #[must_use]
    pub fn adam(lr: f64) -> Self {
        Self::Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }

    /// Plain gradient descent.
    #[must_use]
    pub fn sgd(lr: f64) -> Self {
        Self::Sgd { lr }
    }

    /// Resolves an optimizer by name (`"adam"` or `"sgd"`, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOptimizer`] for any other name and
    /// [`Error::InvalidLearningRate`] if `lr` is not positive and finite.
    pub fn from_name(name: &str, lr: f64) -> Result<Self> {
        let optimizer = match name.to_ascii_lowercase().as_str() {
            "adam" => Self::adam(lr),
            "sgd" => Self::sgd(lr),
            _ => return Err(Error::UnknownOptimizer(name.to_owned())),
        };
        optimizer.validate()?;
        Ok(optimizer)
    }

    /// The configured step size.
    #[must_use]
    pub fn lr(&self) -> f64 {
        match *self {
            Self::Adam { lr, .. } | Self::Sgd { lr } => lr,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let lr = self.lr();
        if lr.is_finite() && lr > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidLearningRate(lr))
        }
    }

    /// Starts a fresh optimizer state over `n_params` parameters.
    #[must_use]
    pub fn start(&self, n_params: usize) -> LocalSearch {
        LocalSearch {
            optimizer: *self,
            m: vec![0.0; n_params],
            v: vec![0.0; n_params],
            t: 0,
        }
    }
}

/// Result of a single optimizer step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Parameters were updated.
    Applied,
    /// The gradient or the update was not finite; nothing changed.
    NonFinite,
}

/// Per-restart optimizer state.
#[derive(Clone, Debug)]
pub struct LocalSearch {
    optimizer: ContinuousOptimizer,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl LocalSearch {
    /// Takes one descent step on `params` using `grad`.
    ///
    /// Leaves both the parameters and the optimizer state untouched when the
    /// step would introduce non-finite values.
    pub fn step(&mut self, params: &mut [f64], grad: &[f64]) -> StepOutcome {
        if grad.len() != params.len() || grad.iter().any(|g| !g.is_finite()) {
            return StepOutcome::NonFinite;
        }

        match self.optimizer {
            ContinuousOptimizer::Sgd { lr } => {
                let next: Vec<f64> = params.iter().zip(grad).map(|(p, g)| p - lr * g).collect();
                if next.iter().any(|p| !p.is_finite()) {
                    return StepOutcome::NonFinite;
                }
                params.copy_from_slice(&next);
            }
            ContinuousOptimizer::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => {
                let t = self.t + 1;
                let bias1 = 1.0 - beta1.powi(t);
                let bias2 = 1.0 - beta2.powi(t);
                let m: Vec<f64> = self
                    .m
                    .iter()
                    .zip(grad)
                    .map(|(m, g)| beta1 * m + (1.0 - beta1) * g)
                    .collect();
                let v: Vec<f64> = self
                    .v
                    .iter()
                    .zip(grad)
                    .map(|(v, g)| beta2 * v + (1.0 - beta2) * g * g)
                    .collect();
                let next: Vec<f64> = params
                    .iter()
                    .zip(m.iter().zip(&v))
                    .map(|(p, (m, v))| p - lr * (m / bias1) / ((v / bias2).sqrt() + eps))
                    .collect();
                if next.iter().any(|p| !p.is_finite()) {
                    return StepOutcome::NonFinite;
                }
                params.copy_from_slice(&next);
                self.m = m;
                self.v = v;
                self.t = t;
            }
        }
        StepOutcome::Applied
    }
}

/// Settings shared by every refinement call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RefinerConfig {
    pub(crate) n_cand: usize,
    pub(crate) n_restarts: usize,
    pub(crate) n_iter: usize,
    pub(crate) optimizer: ContinuousOptimizer,
}

/// Local search over the numeric sub-vector for a fixed categorical assignment.
pub(crate) struct GradientRefiner<'a> {
    pub(crate) layout: &'a VariableLayout,
    /// Normalized grids of the discrete dims, aligned with `layout.disc_in_numeric()`.
    pub(crate) grids: &'a [Vec<f64>],
    pub(crate) config: &'a RefinerConfig,
}

impl GradientRefiner<'_> {
    /// Produces `count` numeric sub-vectors paired with `categorical`.
    ///
    /// `model` is only read; hallucinations go to a private snapshot.
    pub(crate) fn refine(
        &self,
        categorical: &[f64],
        count: usize,
        model: &dyn Model,
        acq: &dyn Acquisition,
        sobol: &mut SobolCandidates,
    ) -> Result<Vec<Vec<f64>>> {
        if self.config.n_restarts == 0 {
            self.refine_from_pool(categorical, count, model, acq, sobol)
        } else {
            self.refine_with_restarts(categorical, count, model, acq, sobol)
        }
    }

    fn refine_with_restarts(
        &self,
        categorical: &[f64],
        count: usize,
        model: &dyn Model,
        acq: &dyn Acquisition,
        sobol: &mut SobolCandidates,
    ) -> Result<Vec<Vec<f64>>> {
        let mut handle = ModelHandle::new(model, false);
        let mut output: Vec<Vec<f64>> = Vec::with_capacity(count);

        for _ in 0..count {
            if let Some(last) = output.last() {
                handle.hallucinate(&[self.layout.merge(last, categorical)])?;
            }
            let model = handle.get();

            let candidates = self.draw_projected(sobol);
            let scores = acq.evaluate(&self.layout.merge_broadcast(&candidates, categorical), model);
            let ranked = rank_ascending(&scores);

            let mut best: Option<(f64, Vec<f64>)> = None;
            for &idx in ranked.iter().take(self.config.n_restarts) {
                let (x, value) = self.descend(candidates[idx].clone(), categorical, model, acq);
                let better = match &best {
                    None => true,
                    Some((best_value, _)) => score_key(value) < score_key(*best_value),
                };
                if better {
                    best = Some((value, x));
                }
            }

            let (_, x) = best.ok_or(Error::Internal("no restart produced a candidate"))?;
            output.push(x);
        }
        Ok(output)
    }

    fn refine_from_pool(
        &self,
        categorical: &[f64],
        count: usize,
        model: &dyn Model,
        acq: &dyn Acquisition,
        sobol: &mut SobolCandidates,
    ) -> Result<Vec<Vec<f64>>> {
        if count > self.config.n_cand {
            return Err(Error::InsufficientCandidates {
                n_suggestions: count,
                n_restarts: self.config.n_restarts,
                n_cand: self.config.n_cand,
            });
        }

        let mut handle = ModelHandle::new(model, false);
        let candidates = self.draw_projected(sobol);
        let full = self.layout.merge_broadcast(&candidates, categorical);
        let mut used = vec![false; candidates.len()];
        let mut output: Vec<Vec<f64>> = Vec::with_capacity(count);

        for _ in 0..count {
            if let Some(last) = output.last() {
                handle.hallucinate(&[self.layout.merge(last, categorical)])?;
            }
            let scores = acq.evaluate(&full, handle.get());
            let idx = rank_ascending(&scores)
                .into_iter()
                .find(|&i| !used[i])
                .ok_or(Error::Internal("candidate pool exhausted"))?;
            used[idx] = true;
            output.push(candidates[idx].clone());
        }
        Ok(output)
    }

    /// Runs one restart from `x`, returning the final point and its score.
    fn descend(
        &self,
        mut x: Vec<f64>,
        categorical: &[f64],
        model: &dyn Model,
        acq: &dyn Acquisition,
    ) -> (Vec<f64>, f64) {
        let dims = self.layout.numeric_dims();
        let mut search = self.config.optimizer.start(x.len());
        let mut skipped = 0_usize;

        for _ in 0..self.config.n_iter {
            let point = self.layout.merge(&x, categorical);
            let grad = acq.gradient(&point, dims, model);
            if search.step(&mut x, &grad) == StepOutcome::NonFinite {
                skipped += 1;
            }
            self.project(&mut x);
        }

        if skipped > 0 {
            trace_debug!(skipped, "skipped non-finite gradient steps");
        }

        let value = acq
            .evaluate(&[self.layout.merge(&x, categorical)], model)
            .first()
            .copied()
            .unwrap_or(f64::NAN);
        (x, value)
    }

    fn draw_projected(&self, sobol: &mut SobolCandidates) -> Vec<Vec<f64>> {
        let mut candidates = sobol.draw(self.config.n_cand);
        for x in &mut candidates {
            self.project(x);
        }
        candidates
    }

    /// Snaps discrete coordinates to their grid, then clips to `[0, 1]`.
    fn project(&self, x: &mut [f64]) {
        for (&pos, grid) in self.layout.disc_in_numeric().iter().zip(self.grids) {
            x[pos] = grid[nearest_index(grid, x[pos])];
        }
        for v in x.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
    }
}

/// Non-finite scores rank last.
fn score_key(v: f64) -> f64 {
    if v.is_finite() { v } else { f64::INFINITY }
}

/// Indices of `scores` from lowest to highest; ties keep input order.
fn rank_ascending(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| score_key(scores[a]).total_cmp(&score_key(scores[b])));
    order
}
