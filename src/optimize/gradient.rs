//! Plain score-function energy gradient.
//!
//! Reproduces the estimator `∇_θ E = 2 Re⟨(E_loc − E)* · ∇_θ ln Ψ⟩`: the
//! per-sample network gradients are turned into log-derivatives of the
//! amplitude by the form-dependent channel multipliers, weighted by the
//! centered local energies, and batch-averaged.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::{NqsError, Result};
use crate::wavefunction::{Psi, WaveFunctionForm};
use super::{channel_force, energy_argument, ParameterUpdate};

/// Compute the energy-gradient update for one sampled batch.
///
/// `e_loc` are the per-sample local energies of the batch `s`; `e0` is
/// the reference energy, defaulting to the sample mean. The real form
/// skips the imaginary channel entirely.
pub fn energy_gradient(
    psi: &Psi,
    s: &DMatrix<f64>,
    e_loc: &DVector<Complex64>,
    e0: Option<Complex64>,
) -> Result<ParameterUpdate> {
    if psi.autoregressive {
        return Err(NqsError::AutoregressiveUnsupported);
    }
    if s.nrows() == 0 {
        return Err(NqsError::EmptyBatch);
    }

    let e_arg = energy_argument(e_loc, e0);
    let (m_r, m_i) = psi.log_derivative_multipliers(s)?;

    let weights = |m: &DVector<Complex64>| {
        DVector::from_fn(s.nrows(), |n, _| 2.0 * (e_arg[n] * m[n]).re)
    };

    let grads_r = psi.real_comp.per_sample_grad(s, 0);
    let real = channel_force(&weights(&m_r), &grads_r);

    let imag = match (&psi.imag_comp, m_i) {
        (Some(net), Some(m)) => channel_force(&weights(&m), &net.per_sample_grad(s, 0)),
        _ => Vec::new(),
    };

    Ok(ParameterUpdate { real, imag })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Activation, FeedForward};
    use crate::operator::{
        enumerate_basis, exact_expectation, kron_operator_sum, sigma_x, sigma_z, transverse_ising,
        Boundary,
    };
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scalar_psi(l: usize, form: WaveFunctionForm, seed: u64) -> Psi {
        let mut rng = StdRng::seed_from_u64(seed);
        let real = FeedForward::random(&[l, 4, 1], Activation::Tanh, 0.4, &mut rng);
        let imag = FeedForward::random(&[l, 4, 1], Activation::Tanh, 0.4, &mut rng);
        Psi::new(real, Some(imag), form, l, None, false).unwrap()
    }

    fn dense_tfim(l: usize, b: f64, j: f64) -> DMatrix<Complex64> {
        kron_operator_sum(&[sigma_x()], 2, l, Boundary::Open) * Complex64::new(-b, 0.0)
            + kron_operator_sum(&[sigma_z(), sigma_z()], 2, l, Boundary::Periodic)
                * Complex64::new(-j, 0.0)
    }

    /// Exact variational energy by basis enumeration.
    fn exact_energy(psi: &Psi, h: &DMatrix<Complex64>, basis: &DMatrix<f64>) -> f64 {
        let amps = psi.amplitudes(basis).unwrap();
        exact_expectation(h, &amps).re
    }

    #[test]
    fn test_score_function_gradient_matches_finite_difference() {
        // The |Psi|^2-weighted score-function estimator over the full
        // basis must agree with a finite-difference perturbation of the
        // exact variational energy.
        let (l, b, j) = (3, 0.5, 1.0);
        let mut psi = scalar_psi(l, WaveFunctionForm::Exponential, 77);
        let ops = transverse_ising(l, b, j, Boundary::Periodic);
        let h = dense_tfim(l, b, j);
        let basis = enumerate_basis(l, &psi.evals);

        let amps = psi.amplitudes(&basis).unwrap();
        let norm: f64 = amps.iter().map(|a| a.norm_sqr()).sum();
        let weights_born: Vec<f64> = amps.iter().map(|a| a.norm_sqr() / norm).collect();

        let e_loc = psi.local_energies(&ops, &basis).unwrap();
        let energy: Complex64 = e_loc
            .iter()
            .zip(weights_born.iter())
            .map(|(e, w)| e * Complex64::new(*w, 0.0))
            .sum();

        let e_arg = energy_argument(&e_loc, Some(energy));
        let (m_r, m_i) = psi.log_derivative_multipliers(&basis).unwrap();
        let grads_r = psi.real_comp.per_sample_grad(&basis, 0);
        let grads_i = psi.imag_comp.as_ref().unwrap().per_sample_grad(&basis, 0);
        let m_i = m_i.unwrap();

        let delta = 1e-3;
        let channels: [(&[DMatrix<f64>], &DVector<Complex64>, bool); 2] =
            [(&grads_r, &m_r, true), (&grads_i, &m_i, false)];
        for (grads, m, is_real) in channels {
            for (tensor, g) in grads.iter().enumerate() {
                for index in [0usize, g.ncols() - 1] {
                    // Weighted score-function gradient for this parameter.
                    let analytic: f64 = (0..basis.nrows())
                        .map(|n| weights_born[n] * 2.0 * (e_arg[n] * m[n]).re * g[(n, index)])
                        .sum();

                    // Central finite difference of the exact energy.
                    let net = if is_real {
                        &mut psi.real_comp
                    } else {
                        psi.imag_comp.as_mut().unwrap()
                    };
                    let orig = net.get_param(tensor, index);
                    net.set_param(tensor, index, orig + delta);
                    let plus = exact_energy(&psi, &h, &basis);
                    let net = if is_real {
                        &mut psi.real_comp
                    } else {
                        psi.imag_comp.as_mut().unwrap()
                    };
                    net.set_param(tensor, index, orig - delta);
                    let minus = exact_energy(&psi, &h, &basis);
                    let net = if is_real {
                        &mut psi.real_comp
                    } else {
                        psi.imag_comp.as_mut().unwrap()
                    };
                    net.set_param(tensor, index, orig);

                    let fd = (plus - minus) / (2.0 * delta);
                    if fd.abs() > 1e-6 {
                        assert_relative_eq!(analytic, fd, max_relative = 1e-2);
                    } else {
                        assert_relative_eq!(analytic, fd, epsilon = 1e-5);
                    }
                }
            }
        }
    }

    #[test]
    fn test_energy_gradient_rejects_autoregressive() {
        let mut rng = StdRng::seed_from_u64(2);
        let widths = [3, 5, 6];
        let real = FeedForward::random(&widths, Activation::Tanh, 0.4, &mut rng);
        let imag = FeedForward::random(&widths, Activation::Tanh, 0.4, &mut rng);
        let psi = Psi::new(real, Some(imag), WaveFunctionForm::Exponential, 3, None, true).unwrap();
        let basis = enumerate_basis(3, &psi.evals);
        let e_loc = DVector::from_element(8, Complex64::new(0.0, 0.0));
        assert!(energy_gradient(&psi, &basis, &e_loc, None).is_err());
    }

    #[test]
    fn test_real_form_skips_imaginary_channel() {
        let mut rng = StdRng::seed_from_u64(6);
        let real = FeedForward::random(&[2, 4, 1], Activation::Sigmoid, 0.4, &mut rng);
        let psi = Psi::new(real, None, WaveFunctionForm::Real, 2, None, false).unwrap();
        let basis = enumerate_basis(2, &psi.evals);
        let e_loc = psi
            .local_energies(&transverse_ising(2, 0.5, 1.0, Boundary::Open), &basis)
            .unwrap();
        let update = energy_gradient(&psi, &basis, &e_loc, None).unwrap();
        assert!(update.imag.is_empty());
        assert_eq!(update.real.len(), psi.real_comp.num_tensors());
    }

    #[test]
    fn test_gradient_step_lowers_exact_energy() {
        let (l, b, j) = (3, 0.5, 1.0);
        let mut psi = scalar_psi(l, WaveFunctionForm::Exponential, 123);
        let ops = transverse_ising(l, b, j, Boundary::Periodic);
        let h = dense_tfim(l, b, j);
        let basis = enumerate_basis(l, &psi.evals);

        // Resample batches i.i.d. from the exact Born distribution so the
        // descent sees unbiased gradient estimates.
        use rand::Rng;
        let mut rng = StdRng::seed_from_u64(3);
        let before = exact_energy(&psi, &h, &basis);
        for _ in 0..25 {
            let amps = psi.amplitudes(&basis).unwrap();
            let norm: f64 = amps.iter().map(|a| a.norm_sqr()).sum();
            let born: Vec<f64> = amps.iter().map(|a| a.norm_sqr() / norm).collect();
            let mut batch = DMatrix::<f64>::zeros(2000, l);
            for n in 0..2000 {
                let mut cumulative = 0.0;
                let r = rng.gen::<f64>();
                let mut slot = born.len() - 1;
                for (k, p) in born.iter().enumerate() {
                    cumulative += p;
                    if r < cumulative {
                        slot = k;
                        break;
                    }
                }
                for site in 0..l {
                    batch[(n, site)] = basis[(slot, site)];
                }
            }
            let e_loc = psi.local_energies(&ops, &batch).unwrap();
            let update = energy_gradient(&psi, &batch, &e_loc, None).unwrap();
            update.apply(&mut psi, 0.05);
        }
        let after = exact_energy(&psi, &h, &basis);
        assert!(
            after < before,
            "energy should decrease: {} -> {}",
            before,
            after
        );
    }
}
