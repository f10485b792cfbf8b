//! Exact ancestral sampling through the autoregressive factorization.
//!
//! Each site is drawn from its Born-rule conditional in lattice order, so
//! samples are exact and independent: no rejection, no burn-in, no
//! autocorrelation.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::wavefunction::{Psi, QnadeOutput};

/// Configuration for the ancestral sampler.
#[derive(Clone, Debug)]
pub struct AncestralSampler {
    /// Number of independent samples to draw
    pub n_samples: usize,
    /// RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for AncestralSampler {
    fn default() -> Self {
        Self { n_samples: 1000, seed: None }
    }
}

impl AncestralSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of samples.
    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = n;
        self
    }

    /// Seed the RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Draw samples with their joint amplitudes. Only defined for
    /// autoregressive wavefunctions.
    pub fn sample(&self, psi: &Psi) -> Result<QnadeOutput> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.sample_with_rng(psi, &mut rng)
    }

    /// Draw samples with a caller-provided RNG.
    pub fn sample_with_rng(&self, psi: &Psi, rng: &mut StdRng) -> Result<QnadeOutput> {
        psi.qnade_sample(self.n_samples, rng)
    }
}
