//! NQS-VMC - Variational Monte Carlo with neural quantum states
//!
//! This crate approximates ground-state wavefunctions of quantum spin
//! lattices by optimizing neural-network ansätze. Complex amplitudes are
//! composed from two real-valued feed-forward networks, local operator
//! estimators are evaluated by enumerating basis transitions, and the
//! parameters are updated by plain energy gradients, stochastic
//! reconfiguration, or an autoregressive-specific gradient. Samples come
//! from a Metropolis-Hastings chain or, for autoregressive ansätze, an
//! exact ancestral sampler.

pub mod error;
pub mod estimator;
pub mod io;
pub mod network;
pub mod operator;
pub mod optimize;
pub mod sampling;
pub mod wavefunction;

// Re-export commonly used types at crate root
pub use error::{NqsError, Result};
pub use network::{Activation, Dense, FeedForward, Layer};
pub use operator::{
    enumerate_basis, exact_expectation, kron_operator_sum, sigma_x, sigma_z, transverse_ising,
    Boundary, Operator,
};
pub use optimize::{
    autoregressive_gradient, energy_gradient, sr_update, ParameterUpdate, SrConfig, UpdateRule,
    VmcOptimizer, VmcResult,
};
pub use sampling::{AncestralSampler, MetropolisSampler};
pub use io::{read_run_config, RunConfig};
pub use wavefunction::{Psi, QnadeMode, QnadeOutput, WaveFunctionForm};

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use num_complex::Complex64;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::network::{Activation, FeedForward};
    use crate::operator::{
        enumerate_basis, exact_expectation, kron_operator_sum, sigma_x, sigma_z, transverse_ising,
        Boundary,
    };
    use crate::sampling::{AncestralSampler, MetropolisSampler};
    use crate::wavefunction::{Psi, WaveFunctionForm};

    fn dense_tfim(l: usize, b: f64, j: f64, boundary: Boundary) -> DMatrix<Complex64> {
        kron_operator_sum(&[sigma_x()], 2, l, Boundary::Open) * Complex64::new(-b, 0.0)
            + kron_operator_sum(&[sigma_z(), sigma_z()], 2, l, boundary)
                * Complex64::new(-j, 0.0)
    }

    fn autoregressive_psi(l: usize, seed: u64) -> Psi {
        let mut rng = StdRng::seed_from_u64(seed);
        let widths = [l, 6, 2 * l];
        let real = FeedForward::random(&widths, Activation::Tanh, 0.4, &mut rng);
        let imag = FeedForward::random(&widths, Activation::Tanh, 0.4, &mut rng);
        Psi::new(real, Some(imag), WaveFunctionForm::Exponential, l, None, true).unwrap()
    }

    fn scalar_psi(l: usize, seed: u64) -> Psi {
        let mut rng = StdRng::seed_from_u64(seed);
        let real = FeedForward::random(&[l, 5, 1], Activation::Tanh, 0.4, &mut rng);
        let imag = FeedForward::random(&[l, 5, 1], Activation::Tanh, 0.4, &mut rng);
        Psi::new(real, Some(imag), WaveFunctionForm::Exponential, l, None, false).unwrap()
    }

    #[test]
    fn test_ancestral_energy_estimate_matches_exact_quadratic_form() {
        // L=3 transverse-field Ising, b=0.5, J=1, periodic boundary: the
        // Monte Carlo estimator over 10000 exact ancestral samples must
        // land within sampling error of the exact expectation computed by
        // dense matrix algebra over all 8 basis states.
        let (l, b, j) = (3, 0.5, 1.0);
        let psi = autoregressive_psi(l, 2024);
        let hamiltonian = transverse_ising(l, b, j, Boundary::Periodic);

        let basis = enumerate_basis(l, &psi.evals);
        let amps = psi.amplitudes(&basis).unwrap();
        let h = dense_tfim(l, b, j, Boundary::Periodic);
        let exact = exact_expectation(&h, &amps).re;

        let n_samples = 10000;
        let out = AncestralSampler::new()
            .with_n_samples(n_samples)
            .with_seed(512)
            .sample(&psi)
            .unwrap();
        let e_loc = psi.local_energies(&hamiltonian, &out.samples).unwrap();
        let estimated = e_loc.iter().map(|e| e.re).sum::<f64>() / n_samples as f64;

        assert!(
            (estimated - exact).abs() < 0.05 * exact.abs().max(1.0),
            "estimated {} vs exact {}",
            estimated,
            exact
        );
    }

    #[test]
    fn test_metropolis_energy_estimate_matches_exact_quadratic_form() {
        // Same consistency check through the Metropolis chain. The chain
        // is correlated, so the first quarter is discarded and the
        // tolerance is looser than for independent ancestral samples.
        let (l, b, j) = (3, 0.5, 1.0);
        let psi = scalar_psi(l, 404);
        let hamiltonian = transverse_ising(l, b, j, Boundary::Periodic);

        let basis = enumerate_basis(l, &psi.evals);
        let amps = psi.amplitudes(&basis).unwrap();
        let h = dense_tfim(l, b, j, Boundary::Periodic);
        let exact = exact_expectation(&h, &amps).re;

        let n_samples = 40000;
        let chain = MetropolisSampler::new()
            .with_n_samples(n_samples)
            .with_seed(99)
            .sample(&psi)
            .unwrap();
        let kept = chain.rows(n_samples / 4, 3 * n_samples / 4).into_owned();
        let e_loc = psi.local_energies(&hamiltonian, &kept).unwrap();
        let estimated = e_loc.iter().map(|e| e.re).sum::<f64>() / kept.nrows() as f64;

        assert!(
            (estimated - exact).abs() < 0.1 * exact.abs().max(1.0),
            "estimated {} vs exact {}",
            estimated,
            exact
        );
    }

    #[test]
    fn test_imaginary_part_of_energy_vanishes_on_full_basis() {
        // The TFIM is Hermitian, so the |Psi|^2-weighted local energy has
        // zero imaginary part when summed over the complete basis.
        let (l, b, j) = (3, 0.5, 1.0);
        let psi = autoregressive_psi(l, 8);
        let hamiltonian = transverse_ising(l, b, j, Boundary::Periodic);
        let basis = enumerate_basis(l, &psi.evals);

        let amps = psi.amplitudes(&basis).unwrap();
        let norm: f64 = amps.iter().map(|a| a.norm_sqr()).sum();
        let e_loc = psi.local_energies(&hamiltonian, &basis).unwrap();
        let energy: Complex64 = e_loc
            .iter()
            .zip(amps.iter())
            .map(|(e, a)| e * Complex64::new(a.norm_sqr() / norm, 0.0))
            .sum();
        assert_relative_eq!(energy.im, 0.0, epsilon = 1e-8);
    }
}
