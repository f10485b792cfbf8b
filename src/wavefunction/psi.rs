//! Complex wavefunction amplitudes composed from two real networks.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::{NqsError, Result};
use crate::network::FeedForward;

/// How the two real-valued component networks combine into a complex
/// amplitude. Decided once at construction; every composition and
/// gradient-multiplier rule dispatches on this tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaveFunctionForm {
    /// `real · exp(i · imag)`
    Euler,
    /// `real + i · imag`
    Vector,
    /// `exp(real + i · imag)`
    Exponential,
    /// `real` only, no imaginary component
    Real,
}

impl WaveFunctionForm {
    /// Parse a configuration string. Unrecognized names fall back to
    /// `Euler` with a warning; the run continues with the corrected tag.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "euler" => WaveFunctionForm::Euler,
            "vector" => WaveFunctionForm::Vector,
            "exponential" => WaveFunctionForm::Exponential,
            "real" => WaveFunctionForm::Real,
            other => {
                log::warn!(
                    "wavefunction form \"{}\" is ambiguous, using \"euler\": \
                     real·exp(i·imag); known forms are euler, vector, \
                     exponential, real",
                    other
                );
                WaveFunctionForm::Euler
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WaveFunctionForm::Euler => "euler",
            WaveFunctionForm::Vector => "vector",
            WaveFunctionForm::Exponential => "exponential",
            WaveFunctionForm::Real => "real",
        }
    }
}

/// A neural quantum state over a 1-D lattice of discrete spins.
///
/// Holds the real and imaginary component networks, the composition form,
/// the lattice size and the allowed local eigenvalues. All evaluation
/// methods are pure functions of the parameters and their input batch;
/// nothing is cached between calls.
#[derive(Clone, Debug)]
pub struct Psi {
    pub real_comp: FeedForward,
    pub imag_comp: Option<FeedForward>,
    pub form: WaveFunctionForm,
    pub lattice_size: usize,
    pub evals: Vec<f64>,
    pub autoregressive: bool,
}

impl Psi {
    /// Build a wavefunction, validating the component networks against the
    /// lattice. `evals` defaults to the spin-1/2 eigenvalues `[-1, 1]`.
    pub fn new(
        real_comp: FeedForward,
        imag_comp: Option<FeedForward>,
        form: WaveFunctionForm,
        lattice_size: usize,
        evals: Option<Vec<f64>>,
        autoregressive: bool,
    ) -> Result<Self> {
        let evals = evals.unwrap_or_else(|| vec![-1.0, 1.0]);
        if form != WaveFunctionForm::Real && imag_comp.is_none() {
            return Err(NqsError::MissingImagComponent { form: form.name() });
        }

        let expected_out = if autoregressive {
            lattice_size * evals.len()
        } else {
            1
        };
        let check = |component: &'static str, net: &FeedForward| -> Result<()> {
            if net.input_width() != lattice_size {
                return Err(NqsError::WidthMismatch {
                    component,
                    kind: "input",
                    expected: lattice_size,
                    got: net.input_width(),
                });
            }
            if net.output_width() != expected_out {
                return Err(NqsError::WidthMismatch {
                    component,
                    kind: "output",
                    expected: expected_out,
                    got: net.output_width(),
                });
            }
            if autoregressive && net.layers.len() < 2 {
                return Err(NqsError::AutoregressiveDepth);
            }
            Ok(())
        };
        check("real", &real_comp)?;
        if let Some(imag) = &imag_comp {
            check("imaginary", imag)?;
        }
        if autoregressive && form != WaveFunctionForm::Exponential {
            return Err(NqsError::AutoregressiveForm);
        }

        Ok(Self { real_comp, imag_comp, form, lattice_size, evals, autoregressive })
    }

    /// Number of local eigenvalues.
    pub fn dim(&self) -> usize {
        self.evals.len()
    }

    /// Index of a configuration value in the eigenvalue list.
    pub fn eval_index(&self, value: f64) -> Result<usize> {
        self.evals
            .iter()
            .position(|&e| (e - value).abs() < 1e-9)
            .ok_or(NqsError::UnknownEigenvalue { value })
    }

    fn check_batch(&self, s: &DMatrix<f64>) -> Result<()> {
        if s.nrows() == 0 {
            return Err(NqsError::EmptyBatch);
        }
        if s.ncols() != self.lattice_size {
            return Err(NqsError::WidthMismatch {
                component: "sample batch",
                kind: "column",
                expected: self.lattice_size,
                got: s.ncols(),
            });
        }
        Ok(())
    }

    /// Complex network output for a batch of configurations.
    ///
    /// Shape `[N, 1]` for scalar wavefunctions, `[N, L·|evals|]`
    /// unnormalized conditionals for autoregressive ones.
    pub fn complex_out(&self, s: &DMatrix<f64>) -> Result<DMatrix<Complex64>> {
        self.check_batch(s)?;
        let re = self.real_comp.forward(s);
        let out = match self.form {
            WaveFunctionForm::Real => re.map(|r| Complex64::new(r, 0.0)),
            WaveFunctionForm::Euler => {
                let im = self.imag_comp.as_ref().expect("validated").forward(s);
                re.zip_map(&im, |r, phi| r * Complex64::new(0.0, phi).exp())
            }
            WaveFunctionForm::Vector => {
                let im = self.imag_comp.as_ref().expect("validated").forward(s);
                re.zip_map(&im, |r, i| Complex64::new(r, i))
            }
            WaveFunctionForm::Exponential => {
                let im = self.imag_comp.as_ref().expect("validated").forward(s);
                re.zip_map(&im, |r, i| Complex64::new(r, i).exp())
            }
        };
        Ok(out)
    }

    /// Joint amplitude `Ψ(s)` per sample. Autoregressive wavefunctions
    /// evaluate through the full conditional factorization.
    pub fn amplitudes(&self, s: &DMatrix<f64>) -> Result<DVector<Complex64>> {
        if self.autoregressive {
            Ok(self.qnade_evaluate(s)?.amplitudes)
        } else {
            let out = self.complex_out(s)?;
            Ok(DVector::from_fn(out.nrows(), |n, _| out[(n, 0)]))
        }
    }

    /// Per-sample multipliers turning network parameter gradients into
    /// log-derivatives of the amplitude, for the real and imaginary
    /// channels. The imaginary multiplier is `None` in the real form.
    pub fn log_derivative_multipliers(
        &self,
        s: &DMatrix<f64>,
    ) -> Result<(DVector<Complex64>, Option<DVector<Complex64>>)> {
        self.check_batch(s)?;
        let n = s.nrows();
        let i_unit = Complex64::new(0.0, 1.0);
        match self.form {
            WaveFunctionForm::Vector => {
                let psi = self.complex_out(s)?;
                let m_r = DVector::from_fn(n, |k, _| 1.0 / psi[(k, 0)]);
                let m_i = m_r.map(|m| i_unit * m);
                Ok((m_r, Some(m_i)))
            }
            WaveFunctionForm::Euler | WaveFunctionForm::Real => {
                let re = self.real_comp.forward(s);
                let m_r = DVector::from_fn(n, |k, _| Complex64::new(1.0 / re[(k, 0)], 0.0));
                let m_i = match self.form {
                    WaveFunctionForm::Real => None,
                    _ => Some(DVector::from_element(n, i_unit)),
                };
                Ok((m_r, m_i))
            }
            WaveFunctionForm::Exponential => {
                let m_r = DVector::from_element(n, Complex64::new(1.0, 0.0));
                let m_i = DVector::from_element(n, i_unit);
                Ok((m_r, Some(m_i)))
            }
        }
    }
}
