//! Metropolis-Hastings sampling over the composed amplitude.
//!
//! Single-site-flip chain: propose a uniformly random site, rotate its
//! eigenvalue by a fixed angle in a random direction, and accept with
//! probability `min(1, |Ψ(s')/Ψ(s)|²)`. Rejections repeat the previous
//! configuration. Burn-in and thinning are caller policy; the chain
//! returns every state it visits.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::wavefunction::Psi;

/// Configuration for the Metropolis-Hastings sampler.
#[derive(Clone, Debug)]
pub struct MetropolisSampler {
    /// Chain length, including the initial state
    pub n_samples: usize,
    /// Eigenvalue rotation angle per proposal; defaults to `2π/|evals|`
    pub rotation: Option<f64>,
    /// RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for MetropolisSampler {
    fn default() -> Self {
        Self { n_samples: 1000, rotation: None, seed: None }
    }
}

impl MetropolisSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set chain length.
    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = n;
        self
    }

    /// Set the proposal rotation angle.
    pub fn with_rotation(mut self, rot: f64) -> Self {
        self.rotation = Some(rot);
        self
    }

    /// Seed the RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Acceptance probability `min(1, |Ψ(s')/Ψ(s)|²)`, computed through
    /// the log-ratio for numerical stability.
    pub fn acceptance(psi: &Psi, current: &DMatrix<f64>, proposal: &DMatrix<f64>) -> Result<f64> {
        let a_cur = psi.amplitudes(current)?;
        let a_new = psi.amplitudes(proposal)?;
        let ln_ratio = 2.0 * (a_new[0].norm().ln() - a_cur[0].norm().ln());
        Ok(ln_ratio.exp().min(1.0))
    }

    /// Run the chain from an i.i.d. uniform initial configuration.
    pub fn sample(&self, psi: &Psi) -> Result<DMatrix<f64>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.sample_with_rng(psi, &mut rng)
    }

    /// Run the chain with a caller-provided RNG.
    pub fn sample_with_rng(&self, psi: &Psi, rng: &mut StdRng) -> Result<DMatrix<f64>> {
        self.sample_from(psi, None, rng)
    }

    /// Run the chain from an explicit initial configuration.
    pub fn sample_from(
        &self,
        psi: &Psi,
        s0: Option<DVector<f64>>,
        rng: &mut StdRng,
    ) -> Result<DMatrix<f64>> {
        let l = psi.lattice_size;
        let rot = self.rotation.unwrap_or(2.0 * std::f64::consts::PI / psi.dim() as f64);

        let initial = match s0 {
            Some(s) => s,
            None => DVector::from_fn(l, |_, _| {
                psi.evals[rng.gen_range(0..psi.dim())]
            }),
        };

        let mut samples = DMatrix::zeros(self.n_samples, l);
        for site in 0..l {
            samples[(0, site)] = initial[site];
        }

        let mut current = DMatrix::zeros(1, l);
        current.row_mut(0).copy_from(&initial.transpose());

        for n in 0..self.n_samples - 1 {
            let pos = rng.gen_range(0..l);
            let mut proposal = current.clone();
            let direction = if rng.gen::<f64>() >= 0.5 { rot } else { -rot };
            proposal[(0, pos)] =
                (Complex64::from_polar(1.0, direction) * proposal[(0, pos)]).re;

            let a = Self::acceptance(psi, &current, &proposal)?;
            if a >= 1.0 || rng.gen::<f64>() < a {
                current = proposal;
            }
            for site in 0..l {
                samples[(n + 1, site)] = current[(0, site)];
            }
        }
        Ok(samples)
    }
}
