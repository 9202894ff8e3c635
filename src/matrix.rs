//! The probability matrix driving the Markov chain.
//!
//! States are operation indices. `P[i][j]` is the probability that operation
//! `j` follows operation `i`. The matrix is resolved once when a run starts
//! (override, explicit config, or the workload default) and is immutable and
//! shared read-only afterwards.

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A `k × k` row-stochastic transition matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix(pub Vec<Vec<f64>>);

impl Matrix {
    /// A matrix in which every row is the one-hot vector at `index`: whatever
    /// the current state, the next operation is always `index`. Used for the
    /// single-operation override.
    pub fn single_operation(operations: usize, index: usize) -> Self {
        let row: Vec<f64> = (0..operations).map(|j| if j == index { 1.0 } else { 0.0 }).collect();
        Matrix(vec![row; operations])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate a user-supplied matrix against the workload's operation
    /// count: it must be square of dimension `operations`, and each row must
    /// sum to exactly 1.0.
    ///
    /// The row-sum check is strict `f64` equality, matching the contract of
    /// the upstream tool this is compatible with. A row summing to
    /// `1.0 - 1e-12` is rejected.
    pub fn validate(&self, operations: usize) -> Result<(), Error> {
        if self.0.len() != operations || self.0.iter().any(|row| row.len() != operations) {
            return Err(Error::MatrixShape {
                expected: operations,
            });
        }
        for (i, row) in self.0.iter().enumerate() {
            let sum: f64 = row.iter().sum();
            if sum != 1.0 {
                return Err(Error::RowSum { row: i, sum });
            }
        }
        Ok(())
    }

    /// Pick the next operation from row `current` with a uniform draw
    /// `u ∈ [0, 1)`: walk the row accumulating probability and return the
    /// first index whose cumulative sum exceeds `u`. If accumulation falls
    /// slightly short of 1.0 the last index is the fallback.
    pub fn next_operation(&self, current: usize, draw: f64) -> usize {
        let row = &self.0[current];
        let mut cumulative = 0.0;
        for (j, p) in row.iter().enumerate() {
            cumulative += p;
            if draw < cumulative {
                return j;
            }
        }
        row.len() - 1
    }

    /// Sample the next operation using the user's own RNG.
    pub fn sample(&self, current: usize, rng: &mut SmallRng) -> usize {
        self.next_operation(current, rng.gen::<f64>())
    }
}

/// Resolve the matrix for a run, in precedence order:
///
/// 1. `only_operation` set and no explicit matrix: collapse the chain to that
///    one operation (fails if the name is unknown).
/// 2. Explicit matrix: validate against the operation count.
/// 3. Neither: the workload's built-in `default`.
///
/// Setting both is rejected, mirroring the config cross-check in
/// [`crate::config::Config::validate`].
pub fn resolve(
    operations: &[&'static str],
    only_operation: Option<&str>,
    explicit: Option<&Matrix>,
    default: Matrix,
) -> Result<Matrix, Error> {
    match (only_operation, explicit) {
        (Some(_), Some(_)) => Err(Error::ConflictingChain),
        (Some(name), None) => {
            let index = operations
                .iter()
                .position(|op| *op == name)
                .ok_or_else(|| Error::UnknownOperation(name.to_string()))?;
            Ok(Matrix::single_operation(operations.len(), index))
        }
        (None, Some(matrix)) => {
            matrix.validate(operations.len())?;
            Ok(matrix.clone())
        }
        (None, None) => Ok(default),
    }
}
