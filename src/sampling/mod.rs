//! Sampling module - Monte Carlo samplers over neural quantum states.

mod ancestral;
mod metropolis;

pub use ancestral::AncestralSampler;
pub use metropolis::MetropolisSampler;
