//! VMC optimization driver.
//!
//! Ties the pieces together: sample a batch from `|Ψ|²`, evaluate the
//! local energies of the Hamiltonian terms, compute the configured
//! parameter update and descend. Ancestral sampling is used for
//! autoregressive wavefunctions, a Metropolis chain otherwise.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::operator::Operator;
use crate::sampling::MetropolisSampler;
use crate::wavefunction::Psi;
use super::{autoregressive_gradient, energy_gradient, sr_update, SrConfig};

/// Which parameter-update rule the driver applies each iteration.
#[derive(Copy, Clone, Debug)]
pub enum UpdateRule {
    /// Plain score-function energy gradient
    EnergyGradient,
    /// Natural gradient through the regularized geometric tensor
    StochasticReconfiguration(SrConfig),
    /// Site-factorized gradient for autoregressive wavefunctions
    Autoregressive,
}

/// Configuration for the VMC optimization loop.
#[derive(Clone, Debug)]
pub struct VmcOptimizer {
    /// Samples drawn per iteration
    pub n_samples: usize,
    /// Number of optimization iterations
    pub max_iterations: usize,
    /// Step size for the parameter update
    pub learning_rate: f64,
    /// Update rule applied each iteration
    pub update: UpdateRule,
    /// Fixed reference energy; defaults to the per-batch sample mean
    pub e0: Option<f64>,
    /// RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Per-iteration progress output
    pub verbose: bool,
}

impl Default for VmcOptimizer {
    fn default() -> Self {
        Self {
            n_samples: 2000,
            max_iterations: 100,
            learning_rate: 0.03,
            update: UpdateRule::EnergyGradient,
            e0: None,
            seed: None,
            verbose: true,
        }
    }
}

impl VmcOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set samples per iteration.
    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = n;
        self
    }

    /// Set number of iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Set learning rate.
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set the update rule.
    pub fn with_update(mut self, update: UpdateRule) -> Self {
        self.update = update;
        self
    }

    /// Fix the reference energy instead of using the sample mean.
    pub fn with_e0(mut self, e0: f64) -> Self {
        self.e0 = Some(e0);
        self
    }

    /// Seed the sampler RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set verbosity.
    pub fn with_verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    fn sample(&self, psi: &Psi, rng: &mut StdRng) -> Result<nalgebra::DMatrix<f64>> {
        if psi.autoregressive {
            Ok(psi.qnade_sample(self.n_samples, rng)?.samples)
        } else {
            MetropolisSampler::new()
                .with_n_samples(self.n_samples)
                .sample_with_rng(psi, rng)
        }
    }

    /// Run the optimization, mutating the wavefunction parameters in
    /// place, and return the energy trace.
    pub fn run(&self, psi: &mut Psi, hamiltonian: &[Operator]) -> Result<VmcResult> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let e0 = self.e0.map(|e| Complex64::new(e, 0.0));

        let mut energy_history = Vec::with_capacity(self.max_iterations);
        let mut variance_history = Vec::with_capacity(self.max_iterations);

        if self.verbose {
            println!("VMC optimization");
            println!("================");
            println!("  Samples/iter:    {}", self.n_samples);
            println!("  Learning rate:   {:.4}", self.learning_rate);
            println!("  Update rule:     {:?}", self.update);
            println!("  Max iterations:  {}", self.max_iterations);
            println!();
        }

        for iter in 0..self.max_iterations {
            let samples = self.sample(psi, &mut rng)?;
            let e_loc = psi.local_energies(hamiltonian, &samples)?;

            let n = e_loc.len() as f64;
            let energy = e_loc.iter().map(|e| e.re).sum::<f64>() / n;
            let variance = e_loc.iter().map(|e| (e.re - energy).powi(2)).sum::<f64>() / n;
            energy_history.push(energy);
            variance_history.push(variance);

            if self.verbose {
                let error = (variance / n).sqrt();
                println!(
                    "  Iter {:3}: E = {:10.5} ± {:.4}, σ² = {:.3}",
                    iter + 1,
                    energy,
                    error,
                    variance
                );
            }

            let update = match self.update {
                UpdateRule::EnergyGradient => energy_gradient(psi, &samples, &e_loc, e0)?,
                UpdateRule::StochasticReconfiguration(config) => {
                    sr_update(psi, &samples, &e_loc, e0, &config)?
                }
                UpdateRule::Autoregressive => {
                    autoregressive_gradient(psi, &samples, &e_loc, e0)?
                }
            };
            update.apply(psi, self.learning_rate);
        }

        // Final statistics with the optimized parameters.
        let samples = self.sample(psi, &mut rng)?;
        let e_loc = psi.local_energies(hamiltonian, &samples)?;
        let n = e_loc.len() as f64;
        let final_energy = e_loc.iter().map(|e| e.re).sum::<f64>() / n;
        let final_variance =
            e_loc.iter().map(|e| (e.re - final_energy).powi(2)).sum::<f64>() / n;

        if self.verbose {
            let error = (final_variance / n).sqrt();
            println!();
            println!("Final results:");
            println!("  Energy:    {:10.5} ± {:.4}", final_energy, error);
            println!("  Variance:  {:.4}", final_variance);
        }

        Ok(VmcResult {
            final_energy,
            final_variance,
            energy_history,
            variance_history,
        })
    }
}

/// Results from a VMC optimization run.
#[derive(Clone, Debug)]
pub struct VmcResult {
    /// Energy estimate after the last update
    pub final_energy: f64,
    /// Variance of the local energy after the last update
    pub final_variance: f64,
    /// Energy at each iteration
    pub energy_history: Vec<f64>,
    /// Variance at each iteration
    pub variance_history: Vec<f64>,
}
