//! Local lattice operators: a matrix and the site groups it acts on.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::error::{NqsError, Result};

/// A lattice operator: a dense matrix over the local Hilbert space of a
/// group of sites, plus the ordered list of site groups it is applied to.
///
/// The matrix dimension must be `dim^span` where `dim` is the number of
/// local eigenvalues and `span` the length of every site group. Hermiticity
/// is conventional, not enforced. Operators are immutable during
/// estimation: build once, `add_site` the groups, then share by reference.
#[derive(Clone, Debug)]
pub struct Operator {
    pub matrix: DMatrix<Complex64>,
    pub sites: Vec<Vec<usize>>,
}

impl Operator {
    pub fn new(matrix: DMatrix<Complex64>) -> Self {
        assert_eq!(matrix.nrows(), matrix.ncols(), "operator matrix must be square");
        Self { matrix, sites: Vec::new() }
    }

    /// Build from a real matrix, promoting entries to complex.
    pub fn from_real(matrix: DMatrix<f64>) -> Self {
        Self::new(matrix.map(|x| Complex64::new(x, 0.0)))
    }

    /// Append a site group. All groups of one operator must share a span.
    pub fn add_site(&mut self, group: Vec<usize>) -> Result<()> {
        if let Some(first) = self.sites.first() {
            if group.len() != first.len() {
                return Err(NqsError::SiteSpanMismatch {
                    expected: first.len(),
                    got: group.len(),
                });
            }
        }
        self.sites.push(group);
        Ok(())
    }

    /// Number of sites each group spans.
    pub fn span(&self) -> Option<usize> {
        self.sites.first().map(|g| g.len())
    }

    /// Check the operator against a lattice of `lattice_size` sites with
    /// `dim` local eigenvalues. Returns the span.
    ///
    /// Fatal on dimension mismatch or out-of-range sites; called by the
    /// local estimator before any computation.
    pub fn validate(&self, dim: usize, lattice_size: usize) -> Result<usize> {
        let span = self.span().unwrap_or(0);
        if span == 0 || dim.pow(span as u32) != self.matrix.nrows() {
            return Err(NqsError::OperatorShape {
                rows: self.matrix.nrows(),
                span,
                dim,
            });
        }
        for group in &self.sites {
            for &site in group {
                if site >= lattice_size {
                    return Err(NqsError::SiteOutOfRange { site, lattice_size });
                }
            }
        }
        Ok(span)
    }
}
