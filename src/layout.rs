//! Mapping between full points and the optimizer's sub-vector representation.
//!
//! The gradient refiner works on the *numeric* sub-vector (continuous
//! dimensions first, then discrete dimensions) and the bandit on the
//! *categorical* sub-vector (nominal and ordinal dimensions in ascending
//! dimension order). [`VariableLayout`] is the fixed permutation between
//! those and the full point.

use crate::error::{Error, Result};
use crate::space::SearchSpace;

/// Fixed bijection between full-point indices and sub-vector positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableLayout {
    numeric_dims: Vec<usize>,
    categorical_dims: Vec<usize>,
    /// `inverse[d]` is the position of dimension `d` in `numeric ++ categorical`.
    inverse: Vec<usize>,
    disc_in_numeric: Vec<usize>,
}

impl VariableLayout {
    /// Builds the layout for `space`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVariable`] if the space has a permutation
    /// dimension.
    pub fn new(space: &SearchSpace) -> Result<Self> {
        if let Some(&dim) = space.perm_dims().first() {
            return Err(Error::UnsupportedVariable {
                dim,
                kind: "permutation",
            });
        }
        let numeric_dims: Vec<usize> = space
            .cont_dims()
            .iter()
            .chain(space.disc_dims())
            .copied()
            .collect();
        let categorical_dims = space.categorical_dims();

        let mut inverse = vec![0; numeric_dims.len() + categorical_dims.len()];
        for (pos, &dim) in numeric_dims.iter().chain(&categorical_dims).enumerate() {
            inverse[dim] = pos;
        }

        let disc_in_numeric = (0..space.num_disc()).map(|i| i + space.num_cont()).collect();

        Ok(Self {
            numeric_dims,
            categorical_dims,
            inverse,
            disc_in_numeric,
        })
    }

    /// Total number of dimensions.
    #[must_use]
    pub fn num_dims(&self) -> usize {
        self.inverse.len()
    }

    /// Full-point indices of the numeric sub-vector, in sub-vector order.
    #[must_use]
    pub fn numeric_dims(&self) -> &[usize] {
        &self.numeric_dims
    }

    /// Full-point indices of the categorical sub-vector, in sub-vector order.
    #[must_use]
    pub fn categorical_dims(&self) -> &[usize] {
        &self.categorical_dims
    }

    /// Positions of the discrete dimensions inside the numeric sub-vector.
    #[must_use]
    pub fn disc_in_numeric(&self) -> &[usize] {
        &self.disc_in_numeric
    }

    /// Splits a full point into `(numeric, categorical)` sub-vectors.
    ///
    /// # Panics
    ///
    /// Panics if `point.len()` differs from [`num_dims`](Self::num_dims).
    #[must_use]
    pub fn split(&self, point: &[f64]) -> (Vec<f64>, Vec<f64>) {
        assert_eq!(point.len(), self.num_dims(), "point has wrong length");
        let numeric = self.numeric_dims.iter().map(|&d| point[d]).collect();
        let categorical = self.categorical_dims.iter().map(|&d| point[d]).collect();
        (numeric, categorical)
    }

    /// Merges a numeric and a categorical sub-vector into a full point.
    ///
    /// # Panics
    ///
    /// Panics if the combined length differs from [`num_dims`](Self::num_dims).
    #[must_use]
    pub fn merge(&self, numeric: &[f64], categorical: &[f64]) -> Vec<f64> {
        assert_eq!(
            numeric.len() + categorical.len(),
            self.num_dims(),
            "sub-vectors do not add up to the number of dimensions"
        );
        self.inverse
            .iter()
            .map(|&pos| {
                if pos < numeric.len() {
                    numeric[pos]
                } else {
                    categorical[pos - numeric.len()]
                }
            })
            .collect()
    }

    /// Splits every row of a batch.
    #[must_use]
    pub fn split_batch(&self, points: &[Vec<f64>]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        points.iter().map(|p| self.split(p)).unzip()
    }

    /// Merges row-aligned numeric and categorical batches.
    ///
    /// # Panics
    ///
    /// Panics if the batches have different row counts or a row pair has the
    /// wrong combined length.
    #[must_use]
    pub fn merge_batch(&self, numeric: &[Vec<f64>], categorical: &[Vec<f64>]) -> Vec<Vec<f64>> {
        assert_eq!(numeric.len(), categorical.len(), "batch row counts differ");
        numeric
            .iter()
            .zip(categorical)
            .map(|(n, c)| self.merge(n, c))
            .collect()
    }

    /// Pairs one categorical assignment with every numeric row.
    #[must_use]
    pub fn merge_broadcast(&self, numeric: &[Vec<f64>], categorical: &[f64]) -> Vec<Vec<f64>> {
        numeric.iter().map(|n| self.merge(n, categorical)).collect()
    }
}
