//! Energy gradient for autoregressive wavefunctions.
//!
//! The joint amplitude is a product of per-site L2-normalized
//! conditionals `ψ_d = v_d / ‖v_d‖` with `v_d = exp(v_r + i·v_φ)`, so the
//! log-derivative splits per site into the selected logit's derivative
//! minus the normalizer derivative. Both pieces are assembled from
//! per-sample gradients of the individual output units, site by site,
//! and weighted by the centered local energies.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::{NqsError, Result};
use crate::wavefunction::Psi;
use super::{energy_argument, ParameterUpdate};

enum Channel {
    Real,
    Imag,
}

fn channel_gradient(
    psi: &Psi,
    channel: Channel,
    s: &DMatrix<f64>,
    conditionals: &DMatrix<Complex64>,
    e_arg: &DVector<Complex64>,
) -> Result<Vec<DVector<f64>>> {
    let net = match channel {
        Channel::Real => &psi.real_comp,
        Channel::Imag => psi.imag_comp.as_ref().expect("validated at construction"),
    };
    // Logit derivatives enter the amplitude as dv_r for the real channel
    // and i·dv_φ for the imaginary one.
    let factor = match channel {
        Channel::Real => Complex64::new(1.0, 0.0),
        Channel::Imag => Complex64::new(0.0, 1.0),
    };

    let n_samples = s.nrows();
    let n_evals = psi.dim();
    let n_tensors = net.num_tensors();
    let mut accumulated: Vec<DVector<f64>> = (0..n_tensors)
        .map(|t| DVector::zeros(net.tensor_len(t)))
        .collect();

    for d in 0..psi.lattice_size {
        // Born weights of this site's conditionals; exp_t[n][k] = |v_k|².
        let vi = conditionals.columns(d * n_evals, n_evals);
        let exp_t = DMatrix::from_fn(n_samples, n_evals, |n, k| vi[(n, k)].norm_sqr());
        let norm: DVector<f64> = DVector::from_fn(n_samples, |n, _| exp_t.row(n).sum());

        // Per-sample gradients of every output unit in this site's slice.
        let grads_by_eval: Vec<Vec<DMatrix<f64>>> = (0..n_evals)
            .map(|k| net.per_sample_grad(s, d * n_evals + k))
            .collect();

        let chosen: Vec<usize> = (0..n_samples)
            .map(|n| psi.eval_index(s[(n, d)]))
            .collect::<Result<_>>()?;

        for t in 0..n_tensors {
            let len = net.tensor_len(t);
            for p in 0..len {
                let mut total = 0.0;
                for n in 0..n_samples {
                    let mut selected = Complex64::new(0.0, 0.0);
                    let mut normalizer = 0.0;
                    for k in 0..n_evals {
                        let dv = factor * grads_by_eval[k][t][(n, p)];
                        // ‖v‖ depends only on the real logits.
                        normalizer += exp_t[(n, k)] * dv.re;
                        if chosen[n] == k {
                            selected += dv;
                        }
                    }
                    normalizer /= norm[n];
                    let o_site = selected - Complex64::new(normalizer, 0.0);
                    total += 2.0 * (e_arg[n] * o_site).re;
                }
                accumulated[t][p] += total / n_samples as f64;
            }
        }
    }
    Ok(accumulated)
}

/// Compute the autoregressive energy-gradient update for one sampled
/// batch. Requires an autoregressive wavefunction; the exponential
/// composition is guaranteed at construction.
pub fn autoregressive_gradient(
    psi: &Psi,
    s: &DMatrix<f64>,
    e_loc: &DVector<Complex64>,
    e0: Option<Complex64>,
) -> Result<ParameterUpdate> {
    if !psi.autoregressive {
        return Err(NqsError::NotAutoregressive);
    }
    if s.nrows() == 0 {
        return Err(NqsError::EmptyBatch);
    }

    let e_arg = energy_argument(e_loc, e0);
    let conditionals = psi.complex_out(s)?;

    let real = channel_gradient(psi, Channel::Real, s, &conditionals, &e_arg)?;
    let imag = channel_gradient(psi, Channel::Imag, s, &conditionals, &e_arg)?;

    Ok(ParameterUpdate { real, imag })
}
