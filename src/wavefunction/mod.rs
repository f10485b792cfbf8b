//! Wavefunction module - neural quantum state amplitudes.

mod psi;
mod qnade;

pub use psi::{Psi, WaveFunctionForm};
pub use qnade::{QnadeMode, QnadeOutput};
