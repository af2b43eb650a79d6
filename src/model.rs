//! Surrogate-model interface consumed by the acquisition optimizer.
//!
//! The optimizer never fits model hyper-parameters. It needs three things
//! from a surrogate: posterior predictions at normalized points, the ability
//! to absorb extra (pseudo-)observations, and an owned snapshot that can be
//! mutated without touching the caller's instance.

use crate::error::Result;

/// Posterior mean and standard deviation at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Posterior {
    /// Predictive mean.
    pub mean: f64,
    /// Predictive standard deviation (non-negative).
    pub std: f64,
}

/// A regression surrogate over normalized points.
///
/// Points use the layout of [`SearchSpace`](crate::space::SearchSpace):
/// numeric coordinates in `[0, 1]` and categorical codes as integers.
pub trait Model: Send + Sync {
    /// Predicts the posterior at every point.
    fn predict(&self, points: &[Vec<f64>]) -> Vec<Posterior>;

    /// Appends observations to the training set and refits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFit`](crate::Error::ModelFit) if refitting fails.
    fn append_and_refit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Returns an independent copy that can be modified freely.
    fn snapshot(&self) -> Box<dyn Model>;
}

/// Inserts `points` into `model` with their predicted means as labels
/// ("kriging believer") and refits.
pub(crate) fn hallucinate(model: &mut dyn Model, points: &[Vec<f64>]) -> Result<()> {
    let labels: Vec<f64> = model.predict(points).iter().map(|p| p.mean).collect();
    trace_debug!(n_points = points.len(), "hallucinating observations");
    model.append_and_refit(points, &labels)
}

/// Borrow-or-own handle to the model used during one batch call.
///
/// Starts out borrowing the caller's model and switches to a private
/// snapshot the first time it has to be mutated.
pub(crate) enum ModelHandle<'a> {
    Borrowed(&'a dyn Model),
    Owned(Box<dyn Model>),
}

impl<'a> ModelHandle<'a> {
    /// Borrows the model; takes a snapshot immediately when `private` is set.
    pub(crate) fn new(model: &'a dyn Model, private: bool) -> Self {
        if private {
            Self::Owned(model.snapshot())
        } else {
            Self::Borrowed(model)
        }
    }

    pub(crate) fn get(&self) -> &dyn Model {
        match self {
            Self::Borrowed(m) => *m,
            Self::Owned(m) => m.as_ref(),
        }
    }

    /// Hallucinates `points` into the private snapshot, creating it if needed.
    pub(crate) fn hallucinate(&mut self, points: &[Vec<f64>]) -> Result<()> {
        if let Self::Borrowed(m) = *self {
            *self = Self::Owned(m.snapshot());
        }
        match self {
            Self::Owned(m) => hallucinate(m.as_mut(), points),
            Self::Borrowed(_) => Err(crate::Error::Internal("model snapshot missing")),
        }
    }
}
