#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Batch acquisition optimization over mixed search spaces.
//!
//! Given a surrogate [`Model`](model::Model) and an
//! [`Acquisition`](acquisition::Acquisition) function, [`MabAcqOptimizer`]
//! proposes a batch of points to evaluate next. Categorical coordinates are
//! chosen by an EXP3-style multi-armed bandit that learns from observed
//! outcomes; numeric coordinates are refined by gradient descent from the
//! best Sobol candidates. Batches are diversified by hallucinating earlier
//! points into a private copy of the model.
//!
//! # Getting Started
//!
//! ```
//! use mabopt::prelude::*;
//!
//! #[derive(Clone)]
//! struct Sphere;
//!
//! impl Model for Sphere {
//!     fn predict(&self, points: &[Vec<f64>]) -> Vec<Posterior> {
//!         points
//!             .iter()
//!             .map(|p| Posterior {
//!                 mean: p.iter().map(|v| (v - 0.5).powi(2)).sum(),
//!                 std: 0.1,
//!             })
//!             .collect()
//!     }
//!     fn append_and_refit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<()> {
//!         Ok(())
//!     }
//!     fn snapshot(&self) -> Box<dyn Model> {
//!         Box::new(self.clone())
//!     }
//! }
//!
//! let space = SearchSpace::builder()
//!     .continuous("x", -5.0, 5.0)
//!     .integer("n", 1, 8)
//!     .build()
//!     .unwrap();
//!
//! let mut optimizer = MabAcqOptimizer::builder(space)
//!     .n_cand(128)
//!     .n_restarts(2)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let batch = optimizer
//!     .optimize(1, &Sphere, &LowerConfidenceBound::default(), None)
//!     .unwrap();
//! let raw = optimizer.space().to_raw(&batch.points()[0]).unwrap();
//! println!("next point: {raw:?}");
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`SearchSpace`](space::SearchSpace) | Variables and their normalized encoding. |
//! | [`VariableLayout`](layout::VariableLayout) | Split/merge between full points and numeric/categorical sub-vectors. |
//! | [`CategoricalBandit`](bandit::CategoricalBandit) | Per-position EXP3 bandit over categorical assignments. |
//! | [`SobolCandidates`](candidates::SobolCandidates) | Scrambled Sobol stream for numeric candidates. |
//! | [`ContinuousOptimizer`](refine::ContinuousOptimizer) | Adam or SGD for local search. |
//! | [`MabAcqOptimizer`] | Ties everything together and builds batches. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `gp` | [`GaussianProcess`](gp::GaussianProcess) surrogate with a Matérn 5/2 kernel | off |
//! | `serde` | `Serialize`/`Deserialize` on search spaces, optimizer settings and bandit statistics | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key optimization points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod bandit;
pub mod buffer;
pub mod candidates;
mod error;
#[cfg(feature = "gp")]
pub mod gp;
pub mod layout;
pub mod model;
pub mod optimizer;
pub mod refine;
pub mod space;

pub use error::{Error, Result};
pub use optimizer::{Advisory, Batch, MabAcqOptimizer, MabAcqOptimizerBuilder, TrustRegionManager};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use mabopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::{Acquisition, ExpectedImprovement, LowerConfidenceBound};
    pub use crate::bandit::{ArmStatistics, BanditConfig, CategoricalBandit};
    pub use crate::buffer::DataBuffer;
    pub use crate::candidates::SobolCandidates;
    pub use crate::error::{Error, Result};
    #[cfg(feature = "gp")]
    pub use crate::gp::GaussianProcess;
    pub use crate::layout::VariableLayout;
    pub use crate::model::{Model, Posterior};
    pub use crate::optimizer::{
        Advisory, Batch, MabAcqOptimizer, MabAcqOptimizerBuilder, TrustRegionManager,
    };
    pub use crate::refine::{ContinuousOptimizer, LocalSearch, StepOutcome};
    pub use crate::space::{CategoricalSubspace, SearchSpace, SearchSpaceBuilder, Variable, VariableKind};
}
