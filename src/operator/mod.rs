//! Operator module - lattice operators and Hamiltonian construction.

mod local;
mod hamiltonian;

pub use local::Operator;
pub use hamiltonian::{
    Boundary, enumerate_basis, exact_expectation, identity, kron_operator_sum, sigma_x, sigma_z,
    transverse_ising,
};
