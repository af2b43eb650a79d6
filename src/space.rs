//! Search-space description for mixed-variable problems.
//!
//! A [`SearchSpace`] is an ordered list of [`Variable`]s. The optimizer works
//! entirely in *normalized* coordinates:
//!
//! | Kind | Normalized value |
//! |------|------------------|
//! | [`Continuous`](VariableKind::Continuous) | `[0, 1]`, linear in `[low, high]` |
//! | [`Discrete`](VariableKind::Discrete) | one of a finite grid inside `[0, 1]` |
//! | [`Ordinal`](VariableKind::Ordinal) | integer level code `0..n_levels` |
//! | [`Nominal`](VariableKind::Nominal) | integer category code `0..n_categories` |
//!
//! [`SearchSpace::to_raw`] and [`SearchSpace::from_raw`] convert between
//! normalized points and user units.
//!
//! # Example
//!
//! ```
//! use mabopt::space::SearchSpace;
//!
//! let space = SearchSpace::builder()
//!     .continuous("lr", 1e-4, 1e-1)
//!     .integer("layers", 1, 8)
//!     .nominal("activation", 3)
//!     .ordinal("width", 4)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(space.num_dims(), 4);
//! assert_eq!(space.num_numeric(), 2);
//! assert_eq!(space.num_categorical(), 2);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tolerance used when matching a value against a discrete grid.
const GRID_TOL: f64 = 1e-9;

/// The type of a single search-space dimension.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VariableKind {
    /// A real-valued variable in `[low, high]`.
    Continuous {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
    },
    /// A numeric variable restricted to a finite, sorted set of values.
    Discrete {
        /// Allowed raw values, ascending and deduplicated.
        values: Vec<f64>,
    },
    /// An ordered categorical variable with `n_levels` levels.
    Ordinal {
        /// Number of levels.
        n_levels: usize,
    },
    /// An unordered categorical variable with `n_categories` categories.
    Nominal {
        /// Number of categories.
        n_categories: usize,
    },
    /// A permutation of `length` items. Described for completeness; the
    /// bandit acquisition optimizer rejects spaces containing it.
    Permutation {
        /// Number of items being permuted.
        length: usize,
    },
}

impl VariableKind {
    /// Short human-readable name of the variable type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Continuous { .. } => "continuous",
            Self::Discrete { .. } => "discrete",
            Self::Ordinal { .. } => "ordinal",
            Self::Nominal { .. } => "nominal",
            Self::Permutation { .. } => "permutation",
        }
    }
}

/// A named search-space dimension.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Variable {
    /// Label used in error messages and reports.
    pub name: String,
    /// The variable type and its domain.
    pub kind: VariableKind,
}

/// An immutable, validated description of a mixed search space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchSpace {
    variables: Vec<Variable>,
    /// Normalized grid for each discrete dimension, aligned with `disc_dims`.
    discrete_grids: Vec<Vec<f64>>,
    cont_dims: Vec<usize>,
    disc_dims: Vec<usize>,
    nominal_dims: Vec<usize>,
    ordinal_dims: Vec<usize>,
    perm_dims: Vec<usize>,
}

impl SearchSpace {
    /// Creates a builder for a search space.
    #[must_use]
    pub fn builder() -> SearchSpaceBuilder {
        SearchSpaceBuilder::default()
    }

    /// Creates a search space from a list of variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySearchSpace`] if `variables` is empty,
    /// [`Error::InvalidBounds`] for a continuous variable with `low > high`
    /// or non-finite bounds, and [`Error::EmptyChoices`] for a discrete,
    /// ordinal, nominal or permutation variable without values.
    pub fn new(variables: Vec<Variable>) -> Result<Self> {
        if variables.is_empty() {
            return Err(Error::EmptySearchSpace);
        }

        let mut variables = variables;
        let mut space = Self {
            variables: Vec::new(),
            discrete_grids: Vec::new(),
            cont_dims: Vec::new(),
            disc_dims: Vec::new(),
            nominal_dims: Vec::new(),
            ordinal_dims: Vec::new(),
            perm_dims: Vec::new(),
        };

        for (dim, var) in variables.iter_mut().enumerate() {
            match &mut var.kind {
                VariableKind::Continuous { low, high } => {
                    if !low.is_finite() || !high.is_finite() || *low > *high {
                        return Err(Error::InvalidBounds {
                            low: *low,
                            high: *high,
                        });
                    }
                    space.cont_dims.push(dim);
                }
                VariableKind::Discrete { values } => {
                    values.retain(|v| v.is_finite());
                    values.sort_by(f64::total_cmp);
                    values.dedup();
                    if values.is_empty() {
                        return Err(Error::EmptyChoices {
                            name: var.name.clone(),
                        });
                    }
                    space.discrete_grids.push(normalized_grid(values));
                    space.disc_dims.push(dim);
                }
                VariableKind::Ordinal { n_levels } => {
                    require_choices(&var.name, *n_levels)?;
                    space.ordinal_dims.push(dim);
                }
                VariableKind::Nominal { n_categories } => {
                    require_choices(&var.name, *n_categories)?;
                    space.nominal_dims.push(dim);
                }
                VariableKind::Permutation { length } => {
                    require_choices(&var.name, *length)?;
                    space.perm_dims.push(dim);
                }
            }
        }

        space.variables = variables;
        Ok(space)
    }

    /// All variables in dimension order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Total number of dimensions.
    #[must_use]
    pub fn num_dims(&self) -> usize {
        self.variables.len()
    }

    /// Number of continuous dimensions.
    #[must_use]
    pub fn num_cont(&self) -> usize {
        self.cont_dims.len()
    }

    /// Number of discrete-numeric dimensions.
    #[must_use]
    pub fn num_disc(&self) -> usize {
        self.disc_dims.len()
    }

    /// Number of nominal dimensions.
    #[must_use]
    pub fn num_nominal(&self) -> usize {
        self.nominal_dims.len()
    }

    /// Number of ordinal dimensions.
    #[must_use]
    pub fn num_ordinal(&self) -> usize {
        self.ordinal_dims.len()
    }

    /// Number of permutation dimensions.
    #[must_use]
    pub fn num_perm(&self) -> usize {
        self.perm_dims.len()
    }

    /// Number of continuous plus discrete dimensions.
    #[must_use]
    pub fn num_numeric(&self) -> usize {
        self.num_cont() + self.num_disc()
    }

    /// Number of nominal plus ordinal dimensions.
    #[must_use]
    pub fn num_categorical(&self) -> usize {
        self.num_nominal() + self.num_ordinal()
    }

    /// Indices of the continuous dimensions.
    #[must_use]
    pub fn cont_dims(&self) -> &[usize] {
        &self.cont_dims
    }

    /// Indices of the discrete-numeric dimensions.
    #[must_use]
    pub fn disc_dims(&self) -> &[usize] {
        &self.disc_dims
    }

    /// Indices of the nominal dimensions.
    #[must_use]
    pub fn nominal_dims(&self) -> &[usize] {
        &self.nominal_dims
    }

    /// Indices of the ordinal dimensions.
    #[must_use]
    pub fn ordinal_dims(&self) -> &[usize] {
        &self.ordinal_dims
    }

    /// Indices of the permutation dimensions.
    #[must_use]
    pub fn perm_dims(&self) -> &[usize] {
        &self.perm_dims
    }

    /// Indices of nominal and ordinal dimensions, sorted ascending.
    #[must_use]
    pub fn categorical_dims(&self) -> Vec<usize> {
        let mut dims: Vec<usize> = self
            .nominal_dims
            .iter()
            .chain(&self.ordinal_dims)
            .copied()
            .collect();
        dims.sort_unstable();
        dims
    }

    /// Normalized grids of the discrete dimensions, aligned with [`disc_dims`](Self::disc_dims).
    #[must_use]
    pub fn discrete_grids(&self) -> &[Vec<f64>] {
        &self.discrete_grids
    }

    /// Number of levels of a nominal or ordinal dimension.
    #[must_use]
    pub fn n_levels(&self, dim: usize) -> Option<usize> {
        match self.variables.get(dim)?.kind {
            VariableKind::Ordinal { n_levels } => Some(n_levels),
            VariableKind::Nominal { n_categories } => Some(n_categories),
            _ => None,
        }
    }

    /// Returns `true` if `point` is a valid normalized point of this space.
    ///
    /// Continuous values must lie in `[0, 1]`, discrete values on their
    /// normalized grid, and categorical values must be integer codes in range.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        if point.len() != self.num_dims() {
            return false;
        }
        let mut grid_idx = 0;
        self.variables.iter().zip(point).all(|(var, &x)| {
            if !x.is_finite() {
                return false;
            }
            match &var.kind {
                VariableKind::Continuous { .. } => (0.0..=1.0).contains(&x),
                VariableKind::Discrete { .. } => {
                    let grid = &self.discrete_grids[grid_idx];
                    grid_idx += 1;
                    grid.iter().any(|g| (g - x).abs() < GRID_TOL)
                }
                VariableKind::Ordinal { n_levels: n }
                | VariableKind::Nominal { n_categories: n }
                | VariableKind::Permutation { length: n } => is_code(x, *n),
            }
        })
    }

    /// Converts a normalized point to user units.
    ///
    /// Discrete values snap to the nearest allowed value; categorical codes
    /// pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `point` has the wrong length.
    pub fn to_raw(&self, point: &[f64]) -> Result<Vec<f64>> {
        self.check_len(point)?;
        let mut grid_idx = 0;
        Ok(self
            .variables
            .iter()
            .zip(point)
            .map(|(var, &x)| match &var.kind {
                VariableKind::Continuous { low, high } => from_normalized(x, *low, *high),
                VariableKind::Discrete { values } => {
                    let grid = &self.discrete_grids[grid_idx];
                    grid_idx += 1;
                    values[nearest_index(grid, x)]
                }
                _ => x,
            })
            .collect())
    }

    /// Converts a point in user units to normalized coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `raw` has the wrong length.
    pub fn from_raw(&self, raw: &[f64]) -> Result<Vec<f64>> {
        self.check_len(raw)?;
        let mut grid_idx = 0;
        Ok(self
            .variables
            .iter()
            .zip(raw)
            .map(|(var, &v)| match &var.kind {
                VariableKind::Continuous { low, high } => to_normalized(v, *low, *high),
                VariableKind::Discrete { values } => {
                    let grid = &self.discrete_grids[grid_idx];
                    grid_idx += 1;
                    grid[nearest_index(values, v)]
                }
                _ => v,
            })
            .collect())
    }

    fn check_len(&self, point: &[f64]) -> Result<()> {
        if point.len() == self.num_dims() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.num_dims(),
                got: point.len(),
            })
        }
    }
}

/// Builder for a [`SearchSpace`].
///
/// Variables are appended in call order, which fixes their dimension index.
#[derive(Clone, Debug, Default)]
pub struct SearchSpaceBuilder {
    variables: Vec<Variable>,
}

impl SearchSpaceBuilder {
    /// Appends a variable of arbitrary kind.
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, kind: VariableKind) -> Self {
        self.variables.push(Variable {
            name: name.into(),
            kind,
        });
        self
    }

    /// Appends a continuous variable in `[low, high]`.
    #[must_use]
    pub fn continuous(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.variable(name, VariableKind::Continuous { low, high })
    }

    /// Appends a discrete variable over the given values.
    #[must_use]
    pub fn discrete(self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.variable(
            name,
            VariableKind::Discrete {
                values: values.into(),
            },
        )
    }

    /// Appends an integer variable over `low..=high`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn integer(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        let values = (low..=high).map(|v| v as f64).collect::<Vec<_>>();
        self.discrete(name, values)
    }

    /// Appends an ordinal variable with `n_levels` levels.
    #[must_use]
    pub fn ordinal(self, name: impl Into<String>, n_levels: usize) -> Self {
        self.variable(name, VariableKind::Ordinal { n_levels })
    }

    /// Appends a nominal variable with `n_categories` categories.
    #[must_use]
    pub fn nominal(self, name: impl Into<String>, n_categories: usize) -> Self {
        self.variable(name, VariableKind::Nominal { n_categories })
    }

    /// Appends a permutation variable over `length` items.
    #[must_use]
    pub fn permutation(self, name: impl Into<String>, length: usize) -> Self {
        self.variable(name, VariableKind::Permutation { length })
    }

    /// Validates the variables and builds the [`SearchSpace`].
    ///
    /// # Errors
    ///
    /// See [`SearchSpace::new`].
    pub fn build(self) -> Result<SearchSpace> {
        SearchSpace::new(self.variables)
    }
}

/// Adapter between raw categorical assignments and their numeric encoding.
///
/// Covers the categorical sub-vector only (nominal and ordinal dimensions in
/// ascending dimension order). An assignment is one category index per
/// position; the encoding stores each index as an `f64` code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoricalSubspace {
    n_levels: Vec<usize>,
}

impl CategoricalSubspace {
    /// Builds the categorical sub-space of `space`.
    #[must_use]
    pub fn new(space: &SearchSpace) -> Self {
        let n_levels = space
            .categorical_dims()
            .into_iter()
            .filter_map(|dim| space.n_levels(dim))
            .collect();
        Self { n_levels }
    }

    /// Number of levels for each categorical position.
    #[must_use]
    pub fn n_levels(&self) -> &[usize] {
        &self.n_levels
    }

    /// Number of categorical positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_levels.len()
    }

    /// Returns `true` if the space has no categorical positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_levels.is_empty()
    }

    /// Encodes raw assignments as categorical sub-vectors.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn transform(&self, assignments: &[Vec<usize>]) -> Vec<Vec<f64>> {
        assignments
            .iter()
            .map(|a| a.iter().map(|&c| c as f64).collect())
            .collect()
    }

    /// Decodes categorical sub-vectors back into raw assignments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a row of the wrong length and
    /// [`Error::InvalidCategory`] for a value that is not an in-range integer code.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn inverse_transform(&self, encoded: &[Vec<f64>]) -> Result<Vec<Vec<usize>>> {
        encoded
            .iter()
            .map(|row| {
                if row.len() != self.n_levels.len() {
                    return Err(Error::DimensionMismatch {
                        expected: self.n_levels.len(),
                        got: row.len(),
                    });
                }
                row.iter()
                    .zip(&self.n_levels)
                    .enumerate()
                    .map(|(position, (&value, &n))| {
                        if is_code(value, n) {
                            Ok(value as usize)
                        } else {
                            Err(Error::InvalidCategory { position, value })
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Convert a raw value to normalized [0, 1] using bounds.
pub(crate) fn to_normalized(value: f64, lo: f64, hi: f64) -> f64 {
    if (hi - lo).abs() < 1e-15 {
        0.5
    } else {
        (value - lo) / (hi - lo)
    }
}

/// Convert a normalized [0, 1] value back to raw units.
pub(crate) fn from_normalized(value: f64, lo: f64, hi: f64) -> f64 {
    lo + value * (hi - lo)
}

/// Index of the grid value closest to `x`. `grid` must be non-empty.
pub(crate) fn nearest_index(grid: &[f64], x: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, g) in grid.iter().enumerate() {
        let dist = (g - x).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

fn require_choices(name: &str, n: usize) -> Result<()> {
    if n == 0 {
        Err(Error::EmptyChoices {
            name: name.to_owned(),
        })
    } else {
        Ok(())
    }
}

fn normalized_grid(values: &[f64]) -> Vec<f64> {
    let lo = values[0];
    let hi = values[values.len() - 1];
    if values.len() == 1 {
        return vec![0.0];
    }
    values.iter().map(|&v| to_normalized(v, lo, hi)).collect()
}

#[allow(clippy::cast_precision_loss)]
fn is_code(x: f64, n: usize) -> bool {
    x.fract() == 0.0 && x >= 0.0 && x < n as f64
}
