//! Gaussian Process surrogate.
//!
//! A zero-mean GP with a **Matérn 5/2 kernel** and ARD lengthscales, fitted
//! by Cholesky decomposition. Targets are standardized before fitting and
//! predictions are returned on the original scale.
//!
//! # Feature flag
//!
//! Requires the **`gp`** feature (adds the `nalgebra` dependency):
//!
//! ```toml
//! [dependencies]
//! mabopt = { version = "...", features = ["gp"] }
//! ```
//!
//! # Examples
//!
//! ```
//! use mabopt::gp::GaussianProcess;
//! use mabopt::model::Model;
//!
//! let x = vec![vec![0.1], vec![0.5], vec![0.9]];
//! let y = vec![1.0, 0.0, 1.0];
//! let gp = GaussianProcess::fit(&x, &y).unwrap();
//!
//! let post = gp.predict(&[vec![0.5]]);
//! assert!((post[0].mean - 0.0).abs() < 1e-2);
//! ```

use nalgebra::{DMatrix, DVector, Dyn, linalg::Cholesky};

use crate::error::{Error, Result};
use crate::model::{Model, Posterior};

/// Default observation noise added to the kernel diagonal.
const DEFAULT_NOISE_VAR: f64 = 1e-6;

/// Precomputed √5 constant.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Gaussian Process regression model implementing [`Model`].
#[derive(Clone, Debug)]
pub struct GaussianProcess {
    noise_variance: f64,
    x_train: Vec<Vec<f64>>,
    y_train: Vec<f64>,
    fitted: Option<FittedGp>,
}

/// Factorization of the current training set.
#[derive(Clone, Debug)]
struct FittedGp {
    /// Cholesky factor L of K + σ²I.
    cholesky: Cholesky<f64, Dyn>,
    /// α = (K + σ²I)^{-1} y.
    alpha: DVector<f64>,
    lengthscales: Vec<f64>,
    y_mean: f64,
    y_std: f64,
}

impl Default for GaussianProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianProcess {
    /// Creates an unfitted GP. Until data arrives it predicts the prior
    /// (mean 0, std 1).
    #[must_use]
    pub fn new() -> Self {
        Self::with_noise_variance(DEFAULT_NOISE_VAR)
    }

    /// Creates an unfitted GP with the given observation noise.
    #[must_use]
    pub fn with_noise_variance(noise_variance: f64) -> Self {
        Self {
            noise_variance,
            x_train: Vec::new(),
            y_train: Vec::new(),
            fitted: None,
        }
    }

    /// Fits a GP with default noise to `x` and `y`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFit`] if the data is inconsistent or the kernel
    /// matrix is not positive definite.
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        let mut gp = Self::new();
        gp.append_and_refit(x, y)?;
        Ok(gp)
    }

    /// Number of training points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.y_train.len()
    }

    /// Returns `true` if the GP has no training data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y_train.is_empty()
    }

    fn predict_one(&self, x: &[f64]) -> Posterior {
        let Some(fit) = &self.fitted else {
            return Posterior {
                mean: 0.0,
                std: 1.0,
            };
        };
        let k_star = DVector::from_fn(self.x_train.len(), |i, _| {
            matern52(x, &self.x_train[i], &fit.lengthscales)
        });

        // Mean: k*^T α
        let mean = k_star.dot(&fit.alpha);

        // Variance: k(x*, x*) - k*^T (K + σ²I)^{-1} k*
        let v = fit.cholesky.solve(&k_star);
        let var = (1.0 - k_star.dot(&v)).max(0.0);

        Posterior {
            mean: mean * fit.y_std + fit.y_mean,
            std: var.sqrt() * fit.y_std,
        }
    }
}

impl Model for GaussianProcess {
    fn predict(&self, points: &[Vec<f64>]) -> Vec<Posterior> {
        points.iter().map(|p| self.predict_one(p)).collect()
    }

    fn append_and_refit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.len() != y.len() {
            return Err(Error::ModelFit(format!(
                "{} points but {} targets",
                x.len(),
                y.len()
            )));
        }
        if let Some(expected) = self.x_train.first().or(x.first()).map(Vec::len)
            && let Some(bad) = x.iter().find(|p| p.len() != expected)
        {
            return Err(Error::DimensionMismatch {
                expected,
                got: bad.len(),
            });
        }

        let mut x_train = self.x_train.clone();
        let mut y_train = self.y_train.clone();
        x_train.extend_from_slice(x);
        y_train.extend_from_slice(y);

        let fitted = fit_gp(&x_train, &y_train, self.noise_variance)?;
        trace_debug!(n_train = y_train.len(), "gaussian process refitted");

        self.x_train = x_train;
        self.y_train = y_train;
        self.fitted = fitted;
        Ok(())
    }

    fn snapshot(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}

/// Matérn 5/2 kernel with ARD lengthscales and unit signal variance.
///
/// `k(x1, x2) = (1 + √5 r + 5/3 r²) exp(-√5 r)`
/// where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`
fn matern52(x1: &[f64], x2: &[f64], lengthscales: &[f64]) -> f64 {
    let r_sq: f64 = x1
        .iter()
        .zip(x2)
        .zip(lengthscales)
        .map(|((a, b), l)| ((a - b) / l).powi(2))
        .sum();
    let r = r_sq.sqrt();
    let sqrt5_r = SQRT_5 * r;
    (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
}

#[allow(clippy::cast_precision_loss)]
fn fit_gp(x_train: &[Vec<f64>], y_train: &[f64], noise_var: f64) -> Result<Option<FittedGp>> {
    let n = y_train.len();
    if n == 0 {
        return Ok(None);
    }
    if y_train.iter().any(|y| !y.is_finite()) {
        return Err(Error::ModelFit("non-finite target".into()));
    }

    // Standardize y
    let y_mean = y_train.iter().sum::<f64>() / n as f64;
    let y_var = if n > 1 {
        y_train.iter().map(|&y| (y - y_mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        1.0
    };
    let y_std = y_var.sqrt().max(1e-10);
    let y_standardized = DVector::from_iterator(n, y_train.iter().map(|&y| (y - y_mean) / y_std));

    // ARD lengthscales: per-dimension std dev of training X, clamped
    let d = x_train[0].len();
    let lengthscales: Vec<f64> = (0..d)
        .map(|j| {
            let mean_j = x_train.iter().map(|x| x[j]).sum::<f64>() / n as f64;
            let var_j = x_train
                .iter()
                .map(|x| (x[j] - mean_j).powi(2))
                .sum::<f64>()
                / n as f64;
            var_j.sqrt().max(0.01)
        })
        .collect();

    let k = DMatrix::from_fn(n, n, |i, j| {
        let k = matern52(&x_train[i], &x_train[j], &lengthscales);
        if i == j { k + noise_var } else { k }
    });
    let cholesky = Cholesky::new(k)
        .ok_or_else(|| Error::ModelFit("kernel matrix is not positive definite".into()))?;
    let alpha = cholesky.solve(&y_standardized);

    Ok(Some(FittedGp {
        cholesky,
        alpha,
        lengthscales,
        y_mean,
        y_std,
    }))
}
