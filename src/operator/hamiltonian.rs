//! Hamiltonian construction for 1-D spin lattices.
//!
//! Local operator templates are replicated across the lattice either as
//! term lists for the local estimator or as dense Kronecker sums for exact
//! small-lattice checks. Basis ordering: eigenvalue index `k` occupies
//! one-hot slot `k`, and in multi-site products the first site is the most
//! significant digit.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use super::Operator;

/// Boundary conditions for a 1-D lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Boundary {
    Open,
    Periodic,
}

/// Pauli X in the local eigenbasis.
pub fn sigma_x() -> DMatrix<Complex64> {
    DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]).map(|x| Complex64::new(x, 0.0))
}

/// Pauli Z in the local eigenbasis. Slot `k` carries eigenvalue
/// `evals[k]`, so with the default `evals = [-1, 1]` the diagonal is
/// `(-1, 1)`.
pub fn sigma_z() -> DMatrix<Complex64> {
    DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 0.0, 1.0]).map(|x| Complex64::new(x, 0.0))
}

/// Identity on a `dim`-dimensional local space.
pub fn identity(dim: usize) -> DMatrix<Complex64> {
    DMatrix::identity(dim, dim)
}

/// Transverse-field Ising Hamiltonian as a term list for the local
/// estimator: `H = -b Σ_i σx_i - j Σ_i σz_i σz_{i+1}`.
pub fn transverse_ising(lattice_size: usize, b: f64, j: f64, boundary: Boundary) -> Vec<Operator> {
    let field = Complex64::new(-b, 0.0);
    let mut transverse = Operator::new(sigma_x() * field);
    for i in 0..lattice_size {
        transverse.add_site(vec![i]).expect("uniform single-site groups");
    }

    let coupling = Complex64::new(-j, 0.0);
    let mut ising = Operator::new(sigma_z().kronecker(&sigma_z()) * coupling);
    for i in 0..lattice_size - 1 {
        ising.add_site(vec![i, i + 1]).expect("uniform bond groups");
    }
    if boundary == Boundary::Periodic && lattice_size > 2 {
        ising.add_site(vec![lattice_size - 1, 0]).expect("uniform bond groups");
    }

    vec![transverse, ising]
}

/// Dense Kronecker sum of a local operator replicated across the lattice.
///
/// `factors` are the single-site factors of the local term (one entry per
/// spanned site); the term is placed at every position, with periodic
/// boundaries adding the wrap-around terms that split the factors across
/// the seam.
pub fn kron_operator_sum(
    factors: &[DMatrix<Complex64>],
    dim: usize,
    n_sites: usize,
    boundary: Boundary,
) -> DMatrix<Complex64> {
    let nops = factors.len();
    assert!(nops >= 1 && nops <= n_sites, "term must fit on the lattice");

    let mut local = factors[0].clone();
    for f in &factors[1..] {
        local = local.kronecker(f);
    }

    let full = dim.pow(n_sites as u32);
    let mut matrix = DMatrix::<Complex64>::zeros(full, full);

    for j in 0..=(n_sites - nops) {
        let left = identity(dim.pow(j as u32));
        let right = identity(dim.pow((n_sites - j - nops) as u32));
        matrix += left.kronecker(&local).kronecker(&right);
    }

    if boundary == Boundary::Periodic {
        for k in 0..nops.saturating_sub(1) {
            // Last k+1 factors wrap to the start of the chain, the first
            // nops-1-k factors stay at the end.
            let mut end_ops = factors[nops - 1].clone();
            for i in 0..k {
                end_ops = factors[nops - 2 - i].kronecker(&end_ops);
            }
            let mut begin_ops = factors[0].clone();
            for i in 0..(nops - 2 - k) {
                begin_ops = begin_ops.kronecker(&factors[i + 1]);
            }
            let middle = identity(dim.pow((n_sites - nops) as u32));
            matrix += end_ops.kronecker(&middle).kronecker(&begin_ops);
        }
    }

    matrix
}

/// All `dim^L` configurations of the lattice, one per row, ordered so that
/// row `b` matches basis slot `b` (site 0 most significant digit).
pub fn enumerate_basis(lattice_size: usize, evals: &[f64]) -> DMatrix<f64> {
    let dim = evals.len();
    let total = dim.pow(lattice_size as u32);
    DMatrix::from_fn(total, lattice_size, |b, site| {
        let digit = (b / dim.pow((lattice_size - 1 - site) as u32)) % dim;
        evals[digit]
    })
}

/// Exact expectation `ψ† H ψ / ψ†ψ` over an enumerated basis.
pub fn exact_expectation(h: &DMatrix<Complex64>, psi: &DVector<Complex64>) -> Complex64 {
    let norm: Complex64 = psi.iter().map(|a| a.conj() * a).sum();
    let h_psi = h * psi;
    let quad: Complex64 = psi.iter().zip(h_psi.iter()).map(|(a, b)| a.conj() * b).sum();
    quad / norm
}
