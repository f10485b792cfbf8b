//! YAML run configuration for the VMC binary.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::operator::Boundary;
use crate::optimize::{SrConfig, UpdateRule};
use crate::wavefunction::WaveFunctionForm;

/// A full VMC run: lattice, Hamiltonian couplings, ansatz and optimizer
/// settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub lattice_size: usize,
    #[serde(default = "default_field")]
    pub field_b: f64,
    #[serde(default = "default_coupling")]
    pub coupling_j: f64,
    #[serde(default = "default_boundary")]
    pub boundary: String,
    #[serde(default = "default_form")]
    pub form: String,
    #[serde(default = "default_true")]
    pub autoregressive: bool,
    #[serde(default = "default_hidden")]
    pub hidden_width: usize,
    #[serde(default = "default_update")]
    pub update: String,
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_sr_lambda")]
    pub sr_lambda: f64,
    #[serde(default = "default_sr_epsilon")]
    pub sr_epsilon: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_field() -> f64 {
    0.5
}
fn default_coupling() -> f64 {
    1.0
}
fn default_boundary() -> String {
    "periodic".into()
}
fn default_form() -> String {
    "exponential".into()
}
fn default_true() -> bool {
    true
}
fn default_hidden() -> usize {
    8
}
fn default_update() -> String {
    "autoregressive".into()
}
fn default_n_samples() -> usize {
    2000
}
fn default_iterations() -> usize {
    100
}
fn default_learning_rate() -> f64 {
    0.03
}
fn default_sr_lambda() -> f64 {
    1.0
}
fn default_sr_epsilon() -> f64 {
    1e-5
}

impl RunConfig {
    /// Wavefunction form tag; unknown names fall back to euler with a
    /// warning.
    pub fn form(&self) -> WaveFunctionForm {
        WaveFunctionForm::parse(&self.form)
    }

    /// Boundary condition; anything other than "open" is periodic.
    pub fn boundary(&self) -> Boundary {
        if self.boundary.eq_ignore_ascii_case("open") {
            Boundary::Open
        } else {
            Boundary::Periodic
        }
    }

    /// Update rule; unknown names fall back to the plain gradient with a
    /// warning.
    pub fn update_rule(&self) -> UpdateRule {
        match self.update.to_lowercase().as_str() {
            "autoregressive" => UpdateRule::Autoregressive,
            "sr" | "stochastic_reconfiguration" => UpdateRule::StochasticReconfiguration(
                SrConfig { lambda: self.sr_lambda, epsilon: self.sr_epsilon },
            ),
            "gradient" | "energy_gradient" => UpdateRule::EnergyGradient,
            other => {
                log::warn!("unknown update rule \"{}\", using the energy gradient", other);
                UpdateRule::EnergyGradient
            }
        }
    }
}

/// Read a run configuration from a YAML file.
pub fn read_run_config(filename: &str) -> Result<RunConfig> {
    let file = std::fs::File::open(filename)?;
    let reader = std::io::BufReader::new(file);
    let config: RunConfig = serde_yaml::from_reader(reader)?;
    Ok(config)
}

// example of yaml file
// lattice_size: 3
// field_b: 0.5
// coupling_j: 1.0
// boundary: periodic
// form: exponential
// autoregressive: true
// hidden_width: 8
// update: autoregressive
// n_samples: 2000
// iterations: 100
// learning_rate: 0.03

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::UpdateRule;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config: RunConfig = serde_yaml::from_str("lattice_size: 4").unwrap();
        assert_eq!(config.lattice_size, 4);
        assert_eq!(config.hidden_width, 8);
        assert_eq!(config.boundary(), Boundary::Periodic);
        assert!(config.autoregressive);
        assert!(matches!(config.update_rule(), UpdateRule::Autoregressive));
    }

    #[test]
    fn test_sr_settings_flow_into_update_rule() {
        let yaml = "lattice_size: 3\nupdate: sr\nsr_lambda: 0.5\nsr_epsilon: 1e-4\nautoregressive: false";
        let config: RunConfig = serde_yaml::from_str(yaml).unwrap();
        match config.update_rule() {
            UpdateRule::StochasticReconfiguration(sr) => {
                assert_eq!(sr.lambda, 0.5);
                assert_eq!(sr.epsilon, 1e-4);
            }
            other => panic!("expected SR rule, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_update_rule_falls_back_to_gradient() {
        let yaml = "lattice_size: 3\nupdate: adam";
        let config: RunConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.update_rule(), UpdateRule::EnergyGradient));
    }
}
