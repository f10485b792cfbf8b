//! Stochastic reconfiguration (natural-gradient) update.
//!
//! Per component network and per parameter tensor, the quantum geometric
//! tensor is estimated from the per-sample log-derivatives
//! `O_k = m · ∂ out/∂θ_k`:
//!
//!   S = 2·Re( ⟨O† O⟩ − ⟨O⟩† ⟨O⟩ )
//!
//! regularized as `S + λ·diag(S) + ε·I` and inverted against the plain
//! energy-gradient force. A singular regularized tensor aborts the run
//! with a dump of S: it signals a degenerate parameterization, not a
//! transient numerical hiccup.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::{NqsError, Result};
use crate::network::FeedForward;
use crate::wavefunction::Psi;
use super::{channel_force, energy_argument, ParameterUpdate};

/// Regularization of the geometric tensor. Both the scaled-diagonal and
/// the fixed-identity terms are applied; either can be zeroed.
#[derive(Copy, Clone, Debug)]
pub struct SrConfig {
    /// Scale of the `λ·diag(S)` term
    pub lambda: f64,
    /// Fixed `ε·I` shift guarding outright singularity
    pub epsilon: f64,
}

impl Default for SrConfig {
    fn default() -> Self {
        Self { lambda: 1.0, epsilon: 1e-5 }
    }
}

/// One channel of the SR update: solve the regularized geometric tensor
/// against the force, tensor by tensor.
fn channel_sr(
    net: &FeedForward,
    s: &DMatrix<f64>,
    m: &DVector<Complex64>,
    force_weights: &DVector<f64>,
    config: &SrConfig,
) -> Result<Vec<DVector<f64>>> {
    let n_samples = s.nrows();
    let grads = net.per_sample_grad(s, 0);
    let forces = channel_force(force_weights, &grads);

    let mut updates = Vec::with_capacity(grads.len());
    for (g, force) in grads.iter().zip(forces.iter()) {
        let n_params = g.ncols();

        // O_k = m · per-sample gradient, one row per sample.
        let o_k = DMatrix::from_fn(n_samples, n_params, |n, p| m[n] * g[(n, p)]);
        let mean_ok = DVector::from_fn(n_params, |p, _| {
            o_k.column(p).sum() / Complex64::new(n_samples as f64, 0.0)
        });

        let t1 = o_k.adjoint() * &o_k / Complex64::new(n_samples as f64, 0.0);
        let outer = mean_ok.map(|c| c.conj()) * mean_ok.transpose();
        let s_mat = DMatrix::from_fn(n_params, n_params, |a, b| {
            2.0 * (t1[(a, b)] - outer[(a, b)]).re
        });

        let mut s_reg = s_mat.clone();
        for p in 0..n_params {
            s_reg[(p, p)] += config.lambda * s_mat[(p, p)] + config.epsilon;
        }

        let s_inv = s_reg
            .try_inverse()
            .ok_or_else(|| NqsError::singular_overlap(s_mat))?;
        updates.push(&s_inv * force);
    }
    Ok(updates)
}

/// Compute the stochastic-reconfiguration update for one sampled batch.
pub fn sr_update(
    psi: &Psi,
    s: &DMatrix<f64>,
    e_loc: &DVector<Complex64>,
    e0: Option<Complex64>,
    config: &SrConfig,
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

    let real = channel_sr(&psi.real_comp, s, &m_r, &weights(&m_r), config)?;
    let imag = match (&psi.imag_comp, m_i) {
        (Some(net), Some(m)) => channel_sr(net, s, &m, &weights(&m), config)?,
        _ => Vec::new(),
    };

    Ok(ParameterUpdate { real, imag })
}
