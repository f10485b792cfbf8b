//! Local-operator estimator.
//!
//! For an operator `O` and a configuration batch sampled from `|Ψ|²`, the
//! local estimator at sample `s` and site group `i` is
//! `Σ_{s'} ⟨s|O|s'⟩ · Ψ(s')/Ψ(s)` over the configurations `s'` differing
//! from `s` only on that group. Averaging the row sums over the batch
//! gives the Monte Carlo estimate of `⟨ψ|O|ψ⟩/⟨ψ|ψ⟩`.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::Result;
use crate::operator::Operator;
use crate::wavefunction::{Psi, WaveFunctionForm};

impl Psi {
    /// Per-sample, per-site-group local estimator of `operator`.
    ///
    /// Returns a dense `[n_samples, n_site_groups]` table. Operator and
    /// batch dimensions are validated before any computation; a mismatch
    /// is a fatal configuration error.
    pub fn o_local(&self, operator: &Operator, s: &DMatrix<f64>) -> Result<DMatrix<Complex64>> {
        let dim = self.dim();
        let span = operator.validate(dim, self.lattice_size)?;
        let base = self.amplitudes(s)?;
        let n_samples = s.nrows();
        let n_groups = operator.sites.len();
        let dim_span = dim.pow(span as u32);

        let mut o_loc = DMatrix::<Complex64>::zeros(n_samples, n_groups);
        for (i, group) in operator.sites.iter().enumerate() {
            // One-hot encode the acted-on local configuration of every
            // sample: eigenvalue index k occupies slot k, the group's
            // first site is the most significant digit.
            let mut basis = DMatrix::<Complex64>::zeros(n_samples, dim_span);
            for n in 0..n_samples {
                let mut slot = 0;
                for &site in group {
                    slot = slot * dim + self.eval_index(s[(n, site)])?;
                }
                basis[(n, slot)] = Complex64::new(1.0, 0.0);
            }

            // Transformed amplitudes over every target local configuration.
            let xformed = &basis * &operator.matrix;

            for k in 0..dim_span {
                if xformed.column(k).iter().all(|c| c.norm_sqr() == 0.0) {
                    continue;
                }

                // Substitute target slot k into the acted-on sites.
                let mut s_prime = s.clone();
                for (j, &site) in group.iter().enumerate() {
                    let digit = (k / dim.pow((span - 1 - j) as u32)) % dim;
                    let value = self.evals[digit];
                    for n in 0..n_samples {
                        s_prime[(n, site)] = value;
                    }
                }

                let prime = self.amplitudes(&s_prime)?;
                for n in 0..n_samples {
                    let ratio = match self.form {
                        WaveFunctionForm::Real => prime[n] / base[n],
                        // Log-ratio guards against under/overflow of the
                        // raw amplitudes.
                        _ => (prime[n].ln() - base[n].ln()).exp(),
                    };
                    o_loc[(n, i)] += xformed[(n, k)] * ratio;
                }
            }
        }
        Ok(o_loc)
    }

    /// Row-summed local estimator accumulated over a list of operators,
    /// e.g. the terms of a Hamiltonian.
    pub fn local_energies(
        &self,
        operators: &[Operator],
        s: &DMatrix<f64>,
    ) -> Result<DVector<Complex64>> {
        let mut e_loc = DVector::<Complex64>::zeros(s.nrows());
        for op in operators {
            let o_loc = self.o_local(op, s)?;
            for n in 0..s.nrows() {
                e_loc[n] += o_loc.row(n).sum();
            }
        }
        Ok(e_loc)
    }
}
