//! Batch acquisition optimizer for mixed search spaces.
//!
//! [`MabAcqOptimizer`] proposes a batch of points per round by combining a
//! categorical bandit with gradient refinement of the numeric coordinates.
//!
//! # Algorithm overview
//!
//! The dispatch depends on the shape of the search space:
//!
//! - **Mixed** — the [`CategoricalBandit`] proposes `n` assignments, which
//!   are grouped in first-seen order. Before each group after the first, the
//!   previous group's last point is hallucinated into the private model
//!   snapshot; the group is then refined for its multiplicity.
//! - **Numeric only** — the whole batch is refined with an empty
//!   categorical sub-vector.
//! - **Categorical only** — the bandit's assignments are returned directly.
//!
//! After the batch has been evaluated, call
//! [`post_observe`](MabAcqOptimizer::post_observe) so the bandit can learn
//! from the outcomes. The bandit starts learning once `n_init` observations
//! are available.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `batch_size` | 1 | Expected number of suggestions per round (bandit exploration rate) |
//! | `max_n_iter` | 200 | Expected number of rounds (bandit exploration rate) |
//! | `mab_resample_tol` | 500 | Resampling attempts for repeated assignments |
//! | `noisy_black_box` | `true` | Whether repeated assignments are worth evaluating |
//! | `n_init` | 20 | Observations before the bandit starts learning |
//! | `n_cand` | 5000 | Sobol candidates per refined point |
//! | `n_restarts` | 5 | Local-search restarts per refined point |
//! | `cont_optimizer` | `"adam"` | `"adam"` or `"sgd"` |
//! | `cont_lr` | 1e-3 | Local-search step size |
//! | `cont_n_iter` | 100 | Local-search steps per restart |
//! | `seed` | random | RNG seed for reproducibility |
//!
//! # Example
//!
//! ```
//! use mabopt::acquisition::LowerConfidenceBound;
//! use mabopt::model::{Model, Posterior};
//! use mabopt::space::SearchSpace;
//! use mabopt::MabAcqOptimizer;
//!
//! #[derive(Clone)]
//! struct Bowl;
//!
//! impl Model for Bowl {
//!     fn predict(&self, points: &[Vec<f64>]) -> Vec<Posterior> {
//!         points
//!             .iter()
//!             .map(|p| Posterior { mean: (p[0] - 0.3).powi(2) + p[1], std: 0.1 })
//!             .collect()
//!     }
//!     fn append_and_refit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> mabopt::Result<()> {
//!         Ok(())
//!     }
//!     fn snapshot(&self) -> Box<dyn Model> {
//!         Box::new(self.clone())
//!     }
//! }
//!
//! let space = SearchSpace::builder()
//!     .continuous("x", 0.0, 1.0)
//!     .nominal("kind", 3)
//!     .build()
//!     .unwrap();
//!
//! let mut optimizer = MabAcqOptimizer::builder(space)
//!     .batch_size(2)
//!     .n_cand(64)
//!     .n_restarts(2)
//!     .cont_n_iter(20)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let batch = optimizer
//!     .optimize(2, &Bowl, &LowerConfidenceBound::default(), None)
//!     .unwrap();
//! assert_eq!(batch.len(), 2);
//! assert!(batch.advisory().is_none());
//! ```

use core::fmt;
use core::slice;

use crate::acquisition::Acquisition;
use crate::bandit::{BanditConfig, CategoricalBandit};
use crate::buffer::DataBuffer;
use crate::candidates::SobolCandidates;
use crate::error::{Error, Result};
use crate::layout::VariableLayout;
use crate::model::{Model, ModelHandle};
use crate::refine::{ContinuousOptimizer, GradientRefiner, RefinerConfig};
use crate::space::{CategoricalSubspace, SearchSpace};

/// Default expected batch size.
const DEFAULT_BATCH_SIZE: usize = 1;
/// Default expected number of optimization rounds.
const DEFAULT_MAX_N_ITER: usize = 200;
/// Default resampling budget for repeated categorical assignments.
const DEFAULT_RESAMPLE_TOL: usize = 500;
/// Default number of observations before the bandit learns.
const DEFAULT_N_INIT: usize = 20;
/// Default Sobol pool size.
const DEFAULT_N_CAND: usize = 5000;
/// Default number of local-search restarts.
const DEFAULT_N_RESTARTS: usize = 5;
/// Default local-search optimizer.
const DEFAULT_CONT_OPTIMIZER: &str = "adam";
/// Default local-search step size.
const DEFAULT_CONT_LR: f64 = 1e-3;
/// Default number of local-search steps.
const DEFAULT_CONT_N_ITER: usize = 100;

/// A trust-region controller.
///
/// [`MabAcqOptimizer`] does not support trust regions: passing any manager
/// to [`optimize`](MabAcqOptimizer::optimize) fails with
/// [`Error::TrustRegionUnsupported`].
pub trait TrustRegionManager {
    /// Center of the current region, as a normalized point.
    fn center(&self) -> &[f64];

    /// Current radius.
    fn radius(&self) -> f64;
}

/// Non-fatal notice attached to a [`Batch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advisory {
    /// The optimizer was configured for a different batch size than requested.
    /// Results are valid, but bandit exploration was tuned for `configured`.
    BatchSizeMismatch {
        /// Batch size given to the builder.
        configured: usize,
        /// Number of suggestions requested.
        requested: usize,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatchSizeMismatch {
                configured,
                requested,
            } => write!(
                f,
                "optimizer was built with batch_size {configured} but {requested} suggestions \
                 were requested; build it with the real batch size for better performance"
            ),
        }
    }
}

/// The points proposed for one round.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    points: Vec<Vec<f64>>,
    advisory: Option<Advisory>,
}

impl Batch {
    /// The proposed normalized points, in production order.
    #[must_use]
    pub fn points(&self) -> &[Vec<f64>] {
        &self.points
    }

    /// Consumes the batch and returns its points.
    #[must_use]
    pub fn into_points(self) -> Vec<Vec<f64>> {
        self.points
    }

    /// Advisory raised while building the batch, if any.
    #[must_use]
    pub fn advisory(&self) -> Option<&Advisory> {
        self.advisory.as_ref()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the batch holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Batch acquisition optimizer combining a categorical bandit with
/// gradient refinement of numeric coordinates.
///
/// Build one with [`MabAcqOptimizer::builder`].
pub struct MabAcqOptimizer {
    space: SearchSpace,
    layout: VariableLayout,
    subspace: CategoricalSubspace,
    grids: Vec<Vec<f64>>,
    refiner: RefinerConfig,
    batch_size: usize,
    sobol: Option<SobolCandidates>,
    bandit: Option<CategoricalBandit>,
}

impl MabAcqOptimizer {
    /// Creates a builder over `space`.
    #[must_use]
    pub fn builder(space: SearchSpace) -> MabAcqOptimizerBuilder {
        MabAcqOptimizerBuilder::new(space)
    }

    /// The search space.
    #[must_use]
    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// The sub-vector layout.
    #[must_use]
    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    /// The categorical bandit, if the space has categorical dimensions.
    #[must_use]
    pub fn bandit(&self) -> Option<&CategoricalBandit> {
        self.bandit.as_ref()
    }

    /// The batch size this optimizer was configured for.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Proposes `n_suggestions` normalized points.
    ///
    /// `model` is never mutated: when more than one point is requested a
    /// private snapshot absorbs all hallucinated observations.
    ///
    /// # Errors
    ///
    /// - [`Error::TrustRegionUnsupported`] if `trust_region` is `Some`.
    /// - [`Error::InsufficientCandidates`] unless
    ///   `(n_restarts == 0 && n_cand >= n_suggestions) || n_restarts >= n_suggestions`.
    /// - Any error returned by the model while refitting on hallucinations.
    pub fn optimize(
        &mut self,
        n_suggestions: usize,
        model: &dyn Model,
        acq: &dyn Acquisition,
        trust_region: Option<&dyn TrustRegionManager>,
    ) -> Result<Batch> {
        if trust_region.is_some() {
            return Err(Error::TrustRegionUnsupported);
        }

        let RefinerConfig {
            n_cand, n_restarts, ..
        } = self.refiner;
        if !((n_restarts == 0 && n_cand >= n_suggestions) || n_restarts >= n_suggestions) {
            return Err(Error::InsufficientCandidates {
                n_suggestions,
                n_restarts,
                n_cand,
            });
        }

        let advisory = (self.batch_size != n_suggestions).then_some(Advisory::BatchSizeMismatch {
            configured: self.batch_size,
            requested: n_suggestions,
        });
        if advisory.is_some() {
            trace_warn!(
                configured = self.batch_size,
                requested = n_suggestions,
                "batch size differs from the configured one"
            );
        }

        trace_info!(
            n_suggestions,
            n_numeric = self.space.num_numeric(),
            n_categorical = self.space.num_categorical(),
            "optimizing acquisition"
        );

        let Self {
            layout,
            subspace,
            grids,
            refiner,
            sobol,
            bandit,
            ..
        } = self;
        let refiner = GradientRefiner {
            layout: &*layout,
            grids: grids.as_slice(),
            config: &*refiner,
        };
        let mut handle = ModelHandle::new(model, n_suggestions > 1);

        let points = match (sobol.as_mut(), bandit.as_mut()) {
            (Some(sobol), Some(bandit)) => {
                let assignments = subspace.transform(&bandit.suggest(n_suggestions));
                let mut points: Vec<Vec<f64>> = Vec::with_capacity(n_suggestions);

                for (categorical, count) in group_first_seen(assignments) {
                    if let Some(last) = points.last() {
                        handle.hallucinate(slice::from_ref(last))?;
                    }
                    trace_debug!(count, ?categorical, "refining categorical group");
                    let numeric =
                        refiner.refine(&categorical, count, handle.get(), acq, sobol)?;
                    points.extend(layout.merge_broadcast(&numeric, &categorical));
                }
                points
            }
            (Some(sobol), None) => {
                let numeric = refiner.refine(&[], n_suggestions, handle.get(), acq, sobol)?;
                layout.merge_broadcast(&numeric, &[])
            }
            (None, Some(bandit)) => {
                let assignments = subspace.transform(&bandit.suggest(n_suggestions));
                assignments
                    .iter()
                    .map(|categorical| layout.merge(&[], categorical))
                    .collect()
            }
            (None, None) => return Err(Error::Internal("search space has no usable dimensions")),
        };

        if points.len() != n_suggestions {
            return Err(Error::Internal("batch has the wrong number of points"));
        }
        trace_info!(n_points = points.len(), "batch ready");
        Ok(Batch { points, advisory })
    }

    /// Feeds one round of outcomes to the categorical bandit.
    ///
    /// `buffer` must already contain this round's observations. While it
    /// holds fewer than `n_init` points nothing happens. The first time the
    /// threshold is reached the bandit is initialized from the whole buffer;
    /// afterwards only `x` and `y` are used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCategory`] or [`Error::DimensionMismatch`] if a
    /// point's categorical coordinates are not valid codes.
    pub fn post_observe(&mut self, x: &[Vec<f64>], y: &[f64], buffer: &DataBuffer) -> Result<()> {
        let Some(bandit) = self.bandit.as_mut() else {
            return Ok(());
        };
        if buffer.len() < bandit.config().n_init {
            return Ok(());
        }

        let project = |points: &[Vec<f64>]| -> Result<Vec<Vec<usize>>> {
            for p in points {
                if p.len() != self.layout.num_dims() {
                    return Err(Error::DimensionMismatch {
                        expected: self.layout.num_dims(),
                        got: p.len(),
                    });
                }
            }
            let (_, categorical) = self.layout.split_batch(points);
            self.subspace.inverse_transform(&categorical)
        };

        if bandit.is_initialized() {
            bandit.observe(&project(x)?, y)?;
        } else {
            bandit.initialize(&project(buffer.x())?, buffer.y())?;
        }
        Ok(())
    }
}

/// Groups assignments by value, keeping first-seen order.
fn group_first_seen(assignments: Vec<Vec<f64>>) -> Vec<(Vec<f64>, usize)> {
    let mut groups: Vec<(Vec<f64>, usize)> = Vec::new();
    for assignment in assignments {
        match groups.iter_mut().find(|(a, _)| *a == assignment) {
            Some((_, count)) => *count += 1,
            None => groups.push((assignment, 1)),
        }
    }
    groups
}

/// Builder for [`MabAcqOptimizer`].
///
/// All options have defaults; see the [module documentation](self).
#[derive(Debug, Clone)]
pub struct MabAcqOptimizerBuilder {
    space: SearchSpace,
    batch_size: usize,
    max_n_iter: usize,
    mab_resample_tol: usize,
    noisy_black_box: bool,
    n_init: usize,
    n_cand: usize,
    n_restarts: usize,
    cont_optimizer: String,
    cont_lr: f64,
    cont_n_iter: usize,
    continuous_optimizer: Option<ContinuousOptimizer>,
    rng: Option<fastrand::Rng>,
}

impl MabAcqOptimizerBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new(space: SearchSpace) -> Self {
        Self {
            space,
            batch_size: DEFAULT_BATCH_SIZE,
            max_n_iter: DEFAULT_MAX_N_ITER,
            mab_resample_tol: DEFAULT_RESAMPLE_TOL,
            noisy_black_box: true,
            n_init: DEFAULT_N_INIT,
            n_cand: DEFAULT_N_CAND,
            n_restarts: DEFAULT_N_RESTARTS,
            cont_optimizer: DEFAULT_CONT_OPTIMIZER.to_owned(),
            cont_lr: DEFAULT_CONT_LR,
            cont_n_iter: DEFAULT_CONT_N_ITER,
            continuous_optimizer: None,
            rng: None,
        }
    }

    /// Sets the number of suggestions expected per round.
    ///
    /// The bandit's exploration rate is tuned for this many plays per round.
    ///
    /// Default: 1.
    #[must_use]
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Sets the expected number of rounds, which tunes bandit exploration.
    ///
    /// Default: 200.
    #[must_use]
    pub fn max_n_iter(mut self, n: usize) -> Self {
        self.max_n_iter = n;
        self
    }

    /// Sets how often a repeated categorical assignment is redrawn when the
    /// black box is noiseless.
    ///
    /// Default: 500.
    #[must_use]
    pub fn mab_resample_tol(mut self, n: usize) -> Self {
        self.mab_resample_tol = n;
        self
    }

    /// Declares whether the objective is noisy.
    ///
    /// Default: `true` (repeated assignments are allowed).
    #[must_use]
    pub fn noisy_black_box(mut self, noisy: bool) -> Self {
        self.noisy_black_box = noisy;
        self
    }

    /// Sets the number of observations before the bandit starts learning.
    ///
    /// Default: 20.
    #[must_use]
    pub fn n_init(mut self, n: usize) -> Self {
        self.n_init = n;
        self
    }

    /// Sets the Sobol pool size per refined point.
    ///
    /// Default: 5000.
    #[must_use]
    pub fn n_cand(mut self, n: usize) -> Self {
        self.n_cand = n;
        self
    }

    /// Sets the number of local-search restarts per refined point.
    ///
    /// With 0, the best raw Sobol candidates are returned without local search.
    ///
    /// Default: 5.
    #[must_use]
    pub fn n_restarts(mut self, n: usize) -> Self {
        self.n_restarts = n;
        self
    }

    /// Selects the local-search optimizer by name (`"adam"` or `"sgd"`).
    ///
    /// Unknown names are rejected by [`build`](Self::build).
    ///
    /// Default: `"adam"`.
    #[must_use]
    pub fn cont_optimizer(mut self, name: impl Into<String>) -> Self {
        self.cont_optimizer = name.into();
        self
    }

    /// Sets the local-search step size.
    ///
    /// Default: 1e-3.
    #[must_use]
    pub fn cont_lr(mut self, lr: f64) -> Self {
        self.cont_lr = lr;
        self
    }

    /// Sets the number of local-search steps per restart.
    ///
    /// Default: 100.
    #[must_use]
    pub fn cont_n_iter(mut self, n: usize) -> Self {
        self.cont_n_iter = n;
        self
    }

    /// Uses a fully specified local-search optimizer, overriding
    /// [`cont_optimizer`](Self::cont_optimizer) and [`cont_lr`](Self::cont_lr).
    #[must_use]
    pub fn continuous_optimizer(mut self, optimizer: ContinuousOptimizer) -> Self {
        self.continuous_optimizer = Some(optimizer);
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(fastrand::Rng::with_seed(seed));
        self
    }

    /// Uses `rng` as the source of all randomness.
    #[must_use]
    pub fn rng(mut self, rng: fastrand::Rng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Validates the configuration and builds the optimizer.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedVariable`] if the space has a permutation dimension.
    /// - [`Error::CandidatesBelowRestarts`] if `n_cand < n_restarts`.
    /// - [`Error::UnknownOptimizer`] for an unknown optimizer name.
    /// - [`Error::InvalidLearningRate`] for a non-positive learning rate.
    pub fn build(self) -> Result<MabAcqOptimizer> {
        let space = self.space;
        let layout = VariableLayout::new(&space)?;
        if self.n_cand < self.n_restarts {
            return Err(Error::CandidatesBelowRestarts {
                n_cand: self.n_cand,
                n_restarts: self.n_restarts,
            });
        }
        let optimizer = match self.continuous_optimizer {
            Some(optimizer) => {
                optimizer.validate()?;
                optimizer
            }
            None => ContinuousOptimizer::from_name(&self.cont_optimizer, self.cont_lr)?,
        };

        let mut rng = self.rng.unwrap_or_else(fastrand::Rng::new);
        let subspace = CategoricalSubspace::new(&space);

        let sobol = (space.num_numeric() > 0)
            .then(|| SobolCandidates::new(space.num_numeric(), &mut rng));
        let bandit = (!subspace.is_empty()).then(|| {
            CategoricalBandit::new(
                subspace.n_levels().to_vec(),
                BanditConfig {
                    batch_size: self.batch_size,
                    max_n_iter: self.max_n_iter,
                    n_init: self.n_init,
                    resample_tol: self.mab_resample_tol,
                    noisy_black_box: self.noisy_black_box,
                },
                rng.fork(),
            )
        });

        Ok(MabAcqOptimizer {
            grids: space.discrete_grids().to_vec(),
            space,
            layout,
            subspace,
            refiner: RefinerConfig {
                n_cand: self.n_cand,
                n_restarts: self.n_restarts,
                n_iter: self.cont_n_iter,
                optimizer,
            },
            batch_size: self.batch_size,
            sobol,
            bandit,
        })
    }
}
