//! Optimization module - gradient rules for the variational energy.

mod autoregressive;
mod gradient;
mod sr;
mod vmc;

pub use autoregressive::autoregressive_gradient;
pub use gradient::energy_gradient;
pub use sr::{sr_update, SrConfig};
pub use vmc::{UpdateRule, VmcOptimizer, VmcResult};

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::wavefunction::Psi;

/// Flattened per-tensor gradients for both component networks, ready to
/// be applied as a descent step. Transient: built from one sample batch,
/// discarded after the update.
#[derive(Clone, Debug)]
pub struct ParameterUpdate {
    pub real: Vec<DVector<f64>>,
    pub imag: Vec<DVector<f64>>,
}

impl ParameterUpdate {
    /// Descend both component networks by `learning_rate` times the
    /// stored gradients. The only place model parameters are mutated.
    pub fn apply(&self, psi: &mut Psi, learning_rate: f64) {
        psi.real_comp.apply_gradient(&self.real, learning_rate);
        if let Some(imag) = psi.imag_comp.as_mut() {
            if !self.imag.is_empty() {
                imag.apply_gradient(&self.imag, learning_rate);
            }
        }
    }
}

/// `conj(E_loc) - conj(E0)`, the score-function energy argument. `e0`
/// defaults to the sample mean.
pub(crate) fn energy_argument(
    e_loc: &DVector<Complex64>,
    e0: Option<Complex64>,
) -> DVector<Complex64> {
    let e0 = e0.unwrap_or_else(|| e_loc.sum() / Complex64::new(e_loc.len() as f64, 0.0));
    e_loc.map(|e| e.conj() - e0.conj())
}

/// Batch-mean force for one channel: `mean_n(weights[n] · grads[n, :])`
/// per parameter tensor.
pub(crate) fn channel_force(
    weights: &DVector<f64>,
    grads: &[DMatrix<f64>],
) -> Vec<DVector<f64>> {
    let n = weights.len() as f64;
    grads
        .iter()
        .map(|g| {
            DVector::from_fn(g.ncols(), |p, _| {
                g.column(p)
                    .iter()
                    .zip(weights.iter())
                    .map(|(grad, w)| w * grad)
                    .sum::<f64>()
                    / n
            })
        })
        .collect()
}
