//! Acquisition functions.
//!
//! An [`Acquisition`] scores candidate points against a [`Model`]. The
//! optimizer always *minimizes* the score, so functions that are naturally
//! maximized (such as Expected Improvement) are returned negated.
//!
//! Gradients are taken with respect to a caller-chosen subset of
//! coordinates. The default [`Acquisition::gradient`] uses central finite
//! differences, which works with any model; implementations with an
//! analytic gradient can override it.

use crate::model::{Model, Posterior};

/// Step used by the finite-difference gradient.
const FD_STEP: f64 = 1e-5;

/// A scalar criterion over candidate points; lower is better.
pub trait Acquisition: Send + Sync {
    /// Scores every point.
    fn evaluate(&self, points: &[Vec<f64>], model: &dyn Model) -> Vec<f64>;

    /// Gradient of the score at `point` with respect to the coordinates in `dims`.
    ///
    /// The returned vector is aligned with `dims`.
    fn gradient(&self, point: &[f64], dims: &[usize], model: &dyn Model) -> Vec<f64> {
        let mut probes = Vec::with_capacity(2 * dims.len());
        for &d in dims {
            let mut hi = point.to_vec();
            let mut lo = point.to_vec();
            hi[d] += FD_STEP;
            lo[d] -= FD_STEP;
            probes.push(hi);
            probes.push(lo);
        }
        let values = self.evaluate(&probes, model);
        values
            .chunks_exact(2)
            .map(|pair| (pair[0] - pair[1]) / (2.0 * FD_STEP))
            .collect()
    }
}

/// Lower confidence bound: `mean - beta * std`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LowerConfidenceBound {
    /// Exploration weight.
    pub beta: f64,
}

impl Default for LowerConfidenceBound {
    fn default() -> Self {
        Self { beta: 2.0 }
    }
}

impl Acquisition for LowerConfidenceBound {
    fn evaluate(&self, points: &[Vec<f64>], model: &dyn Model) -> Vec<f64> {
        model
            .predict(points)
            .iter()
            .map(|p| p.mean - self.beta * p.std)
            .collect()
    }
}

/// Negated Expected Improvement below the incumbent `best_y`.
///
/// `EI(x) = (best_y - mean) Φ(z) + std φ(z)` with `z = (best_y - mean) / std`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpectedImprovement {
    /// Best (lowest) observed objective value.
    pub best_y: f64,
}

impl Acquisition for ExpectedImprovement {
    fn evaluate(&self, points: &[Vec<f64>], model: &dyn Model) -> Vec<f64> {
        model
            .predict(points)
            .iter()
            .map(|&p| -expected_improvement(p, self.best_y))
            .collect()
    }
}

fn expected_improvement(posterior: Posterior, f_best: f64) -> f64 {
    let Posterior { mean, std } = posterior;
    if std < 1e-12 {
        return (f_best - mean).max(0.0);
    }
    let z = (f_best - mean) / std;
    let improvement = (f_best - mean) * norm_cdf(z) + std * norm_pdf(z);
    improvement.max(0.0)
}

/// Standard normal PDF.
fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Abramowitz-Stegun rational approximation).
fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;

    let poly = 0.319_381_530 * t - 0.356_563_782 * t2 + 1.781_477_937 * t3 - 1.821_255_978 * t4
        + 1.330_274_429 * t5;
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}
