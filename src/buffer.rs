//! Append-only store of evaluated points.

/// Observed points (normalized) and their objective values, in arrival order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataBuffer {
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
}

impl DataBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch of observations.
    ///
    /// # Panics
    ///
    /// Panics if `x` and `y` have different lengths.
    pub fn append(&mut self, x: &[Vec<f64>], y: &[f64]) {
        assert_eq!(x.len(), y.len(), "x and y must have the same length");
        self.x.extend_from_slice(x);
        self.y.extend_from_slice(y);
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Returns `true` if nothing has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Observed points.
    #[must_use]
    pub fn x(&self) -> &[Vec<f64>] {
        &self.x
    }

    /// Observed objective values, aligned with [`x`](Self::x).
    #[must_use]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Lowest finite objective value observed so far.
    #[must_use]
    pub fn best_y(&self) -> Option<f64> {
        self.y
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .min_by(f64::total_cmp)
    }
}
