use std::collections::HashMap;

use nalgebra::DMatrix;
use thiserror::Error;

use crate::{constants::INDEPENDENCE_TOLERANCE, error::Error as EngineError};

/// Errors raised by the [IndependenceBuffer]
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IndependenceError {
    #[error("independence buffer not allocated")]
    NotAllocated,
    #[error("too many parameters (max={0})")]
    RowOverflow(usize),
    #[error("too many independent ambiguities (max={0})")]
    ColumnOverflow(usize),
    #[error("degenerate candidate")]
    Degenerate,
}

/// Outcome of [IndependenceBuffer::try_insert]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Independence {
    /// Linearly independent: stored in the basis
    Independent,
    /// Linear combination of previously accepted candidates
    Dependent,
}

/// [IndependenceBuffer] is an incremental Gram-Schmidt orthogonalization
/// of double difference incidence vectors. Each candidate has a +1 entry for its
/// first parameter and a -1 entry for the second one.
#[derive(Debug, Clone, Default)]
pub struct IndependenceBuffer {
    /// Orthonormal basis, one column per accepted candidate
    basis: DMatrix<f64>,
    /// Filter index to basis row
    rows: HashMap<usize, usize>,
    /// Number of accepted candidates
    count: usize,
}

impl IndependenceBuffer {
    /// True once allocated
    pub fn is_allocated(&self) -> bool {
        self.basis.nrows() > 0 && self.basis.ncols() > 0
    }

    /// (Re)allocates this [IndependenceBuffer]
    /// - rows: maximal number of distinct parameters
    /// - cols: maximal number of simultaneous ambiguities
    pub fn allocate(&mut self, rows: usize, cols: usize) -> Result<(), EngineError> {
        if rows == 0 || cols == 0 {
            return Err(EngineError::Configuration(format!(
                "invalid independence workspace ({}x{})",
                rows, cols
            )));
        }

        self.basis = DMatrix::zeros(rows, cols);
        self.rows.clear();
        self.count = 0;
        Ok(())
    }

    /// Releases this [IndependenceBuffer], which will require a new allocation.
    pub fn release(&mut self) {
        *self = Self::default();
    }

    /// Starts a new selection, keeping the allocation
    pub fn begin(&mut self) {
        self.basis.fill(0.0);
        self.rows.clear();
        self.count = 0;
    }

    /// Number of independent candidates
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn row(&mut self, index: usize) -> Result<usize, IndependenceError> {
        if let Some(row) = self.rows.get(&index) {
            return Ok(*row);
        }

        let row = self.rows.len();
        if row >= self.basis.nrows() {
            return Err(IndependenceError::RowOverflow(self.basis.nrows()));
        }

        self.rows.insert(index, row);
        Ok(row)
    }

    /// Tries to insert the candidate x\[i\] - x\[j\].
    pub fn try_insert(&mut self, i: usize, j: usize) -> Result<Independence, IndependenceError> {
        if !self.is_allocated() {
            return Err(IndependenceError::NotAllocated);
        }

        if i == j {
            return Err(IndependenceError::Degenerate);
        }

        let (ri, rj) = (self.row(i)?, self.row(j)?);

        // projection onto current basis
        let coefficients = (0..self.count)
            .map(|k| self.basis[(ri, k)] - self.basis[(rj, k)])
            .collect::<Vec<_>>();

        let projected = coefficients.iter().map(|c| c * c).sum::<f64>();

        if (2.0 - projected).abs() < INDEPENDENCE_TOLERANCE {
            return Ok(Independence::Dependent);
        }

        if self.count >= self.basis.ncols() {
            return Err(IndependenceError::ColumnOverflow(self.basis.ncols()));
        }

        let used = self.rows.len();
        let mut residual = vec![0.0; used];
        residual[ri] += 1.0;
        residual[rj] -= 1.0;

        for (k, c_k) in coefficients.iter().enumerate() {
            for (row, r) in residual.iter_mut().enumerate() {
                *r -= c_k * self.basis[(row, k)];
            }
        }

        let norm = residual.iter().map(|r| r * r).sum::<f64>().sqrt();
        if norm < INDEPENDENCE_TOLERANCE {
            return Ok(Independence::Dependent);
        }

        for (row, r) in residual.iter().enumerate() {
            self.basis[(row, self.count)] = r / norm;
        }

        self.count += 1;
        Ok(Independence::Independent)
    }
}
