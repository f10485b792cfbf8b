//! Autoregressive forward pass over the lattice (QNADE).
//!
//! The joint amplitude factors into per-site conditionals
//! `Ψ(s) = Π_d ψ_d(s_d | s_{<d})`. A single pass walks the lattice,
//! carrying hidden-activation accumulators through the NADE recurrence,
//! and either draws each site from the Born distribution of its
//! conditional or scores a supplied configuration. Sampling and scoring
//! share this code path, so a generated sample and its amplitude are
//! always consistent.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{NqsError, Result};
use crate::network::FeedForward;
use super::psi::Psi;

/// What the pass does at each site: draw new values or score given ones.
pub enum QnadeMode<'a> {
    Sample { n_samples: usize, rng: &'a mut StdRng },
    Evaluate { configs: &'a DMatrix<f64> },
}

/// Joint amplitudes and the site values they belong to (generated in
/// sample mode, echoed in evaluate mode).
#[derive(Clone, Debug)]
pub struct QnadeOutput {
    pub amplitudes: DVector<Complex64>,
    pub samples: DMatrix<f64>,
}

/// Inverse-transform sampling against a Born distribution.
///
/// Floating-point rounding can leave the cumulative sum a hair below the
/// drawn value at the boundary; the overflow clamps to the last category.
pub(crate) fn inverse_transform(probs: &[f64], r: f64) -> usize {
    let mut cumulative = 0.0;
    for (k, p) in probs.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return k;
        }
    }
    probs.len() - 1
}

/// Propagate a hidden accumulator through the remaining layers of an
/// autoregressive component, slicing the final layer to site `d`.
fn conditional_logits(net: &FeedForward, a: &DMatrix<f64>, d: usize, n_evals: usize) -> DMatrix<f64> {
    let mut x = net.layers[0].activation.apply(a);
    let last = net.layers.len() - 1;
    for (offset, layer) in net.layers[1..].iter().enumerate() {
        let l = offset + 1;
        if l == last {
            let rows = layer.dense.weight.rows(d * n_evals, n_evals);
            let bias = layer.dense.bias.rows(d * n_evals, n_evals);
            let mut z = &x * rows.transpose();
            for mut row in z.row_iter_mut() {
                row += bias.transpose();
            }
            x = layer.activation.apply(&z);
        } else {
            x = layer.activation.apply(&layer.dense.forward(&x));
        }
    }
    x
}

impl Psi {
    /// Run the autoregressive pass in the given mode.
    pub fn qnade_pass(&self, mode: QnadeMode) -> Result<QnadeOutput> {
        if !self.autoregressive {
            return Err(NqsError::NotAutoregressive);
        }
        let real = &self.real_comp;
        let imag = self.imag_comp.as_ref().expect("validated at construction");
        let l = self.lattice_size;
        let n_evals = self.dim();

        type ModeParts<'a> = (usize, Option<&'a DMatrix<f64>>, Option<&'a mut StdRng>);
        let (n_samples, configs, mut rng_ref): ModeParts = match mode {
            QnadeMode::Sample { n_samples, rng } => (n_samples, None, Some(rng)),
            QnadeMode::Evaluate { configs } => {
                if configs.ncols() != l {
                    return Err(NqsError::WidthMismatch {
                        component: "sample batch",
                        kind: "column",
                        expected: l,
                        got: configs.ncols(),
                    });
                }
                (configs.nrows(), Some(configs), None)
            }
        };
        if n_samples == 0 {
            return Err(NqsError::EmptyBatch);
        }

        // Accumulators start from each component's input-layer bias,
        // broadcast over the batch.
        let broadcast = |net: &FeedForward| {
            let bias = &net.layers[0].dense.bias;
            DMatrix::from_fn(n_samples, bias.len(), |_, h| bias[h])
        };
        let mut a_r = broadcast(real);
        let mut a_i = broadcast(imag);

        let mut amplitudes = DVector::from_element(n_samples, Complex64::new(1.0, 0.0));
        let mut samples = DMatrix::zeros(n_samples, l);

        for d in 0..l {
            let v_r = conditional_logits(real, &a_r, d, n_evals);
            let v_i = conditional_logits(imag, &a_i, d, n_evals);

            // Unnormalized conditional amplitudes, then L2 normalization
            // so each site's Born weights sum to one.
            let v = v_r.zip_map(&v_i, |r, i| Complex64::new(r, i).exp());
            let mut psi_d = v;
            for n in 0..n_samples {
                let norm: f64 = (0..n_evals).map(|k| psi_d[(n, k)].norm_sqr()).sum::<f64>().sqrt();
                for k in 0..n_evals {
                    psi_d[(n, k)] /= norm;
                }
                debug_assert!(
                    ((0..n_evals).map(|k| psi_d[(n, k)].norm_sqr()).sum::<f64>() - 1.0).abs()
                        < 1e-6,
                    "conditional amplitudes must be normalized"
                );
            }

            for n in 0..n_samples {
                let index = match (&mut rng_ref, configs) {
                    (Some(rng), None) => {
                        let born: Vec<f64> =
                            (0..n_evals).map(|k| psi_d[(n, k)].norm_sqr()).collect();
                        inverse_transform(&born, rng.gen::<f64>())
                    }
                    (None, Some(x)) => self.eval_index(x[(n, d)])?,
                    _ => unreachable!(),
                };
                let value = self.evals[index];
                samples[(n, d)] = value;
                amplitudes[n] *= psi_d[(n, index)];

                // NADE recurrence: fold the chosen value into the
                // accumulators through the input-weight column for site d.
                for (net, a) in [(real, &mut a_r), (imag, &mut a_i)] {
                    let w0 = &net.layers[0].dense.weight;
                    let b0 = &net.layers[0].dense.bias;
                    for h in 0..w0.nrows() {
                        a[(n, h)] += value * w0[(h, d)] + b0[h];
                    }
                }
            }
        }

        Ok(QnadeOutput { amplitudes, samples })
    }

    /// Score supplied configurations through the conditional factorization.
    pub fn qnade_evaluate(&self, configs: &DMatrix<f64>) -> Result<QnadeOutput> {
        self.qnade_pass(QnadeMode::Evaluate { configs })
    }

    /// Draw exact samples ancestrally, returning them with their joint
    /// amplitudes.
    pub fn qnade_sample(&self, n_samples: usize, rng: &mut StdRng) -> Result<QnadeOutput> {
        self.qnade_pass(QnadeMode::Sample { n_samples, rng })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Activation;
    use crate::operator::enumerate_basis;
    use crate::wavefunction::WaveFunctionForm;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn autoregressive_psi(l: usize, seed: u64) -> Psi {
        let mut rng = StdRng::seed_from_u64(seed);
        let widths = [l, 6, 2 * l];
        let real = FeedForward::random(&widths, Activation::Tanh, 0.4, &mut rng);
        let imag = FeedForward::random(&widths, Activation::Tanh, 0.4, &mut rng);
        Psi::new(real, Some(imag), WaveFunctionForm::Exponential, l, None, true).unwrap()
    }

    #[test]
    fn test_joint_probability_sums_to_one() {
        // Normalized conditionals at every site make the joint Born
        // distribution sum to one over the full basis.
        let psi = autoregressive_psi(3, 21);
        let basis = enumerate_basis(3, &psi.evals);
        let out = psi.qnade_evaluate(&basis).unwrap();
        let total: f64 = out.amplitudes.iter().map(|a| a.norm_sqr()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sampling_and_evaluation_agree() {
        let psi = autoregressive_psi(4, 33);
        let mut rng = StdRng::seed_from_u64(99);
        let sampled = psi.qnade_sample(50, &mut rng).unwrap();
        let scored = psi.qnade_evaluate(&sampled.samples).unwrap();
        for n in 0..50 {
            assert_relative_eq!(
                sampled.amplitudes[n].re,
                scored.amplitudes[n].re,
                epsilon = 1e-12
            );
            assert_relative_eq!(
                sampled.amplitudes[n].im,
                scored.amplitudes[n].im,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_samples_take_allowed_values() {
        let psi = autoregressive_psi(3, 55);
        let mut rng = StdRng::seed_from_u64(7);
        let out = psi.qnade_sample(200, &mut rng).unwrap();
        for value in out.samples.iter() {
            assert!(*value == -1.0 || *value == 1.0);
        }
    }

    #[test]
    fn test_sampled_frequencies_match_born_weights() {
        // With exact ancestral sampling the empirical distribution over
        // the 2^L basis states tracks |Psi|^2 closely.
        let psi = autoregressive_psi(2, 13);
        let basis = enumerate_basis(2, &psi.evals);
        let weights = psi.qnade_evaluate(&basis).unwrap();

        let mut rng = StdRng::seed_from_u64(101);
        let n_samples = 20000;
        let out = psi.qnade_sample(n_samples, &mut rng).unwrap();
        let mut counts = [0usize; 4];
        for n in 0..n_samples {
            let b = (psi.eval_index(out.samples[(n, 0)]).unwrap() << 1)
                | psi.eval_index(out.samples[(n, 1)]).unwrap();
            counts[b] += 1;
        }
        for b in 0..4 {
            let expected = weights.amplitudes[b].norm_sqr();
            let observed = counts[b] as f64 / n_samples as f64;
            assert!(
                (observed - expected).abs() < 0.02,
                "state {}: observed {} expected {}",
                b,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_inverse_transform_boundary_clamps_to_last_category() {
        // Cumulative sum that rounds below the draw leaves the overflow
        // on the final category.
        assert_eq!(inverse_transform(&[0.5, 0.49999999], 0.9999999999), 1);
        assert_eq!(inverse_transform(&[0.3, 0.3, 0.3], 1.0), 2);
        assert_eq!(inverse_transform(&[0.5, 0.5], 0.25), 0);
        assert_eq!(inverse_transform(&[0.5, 0.5], 0.75), 1);
    }

    #[test]
    fn test_qnade_rejects_non_autoregressive() {
        let mut rng = StdRng::seed_from_u64(3);
        let real = FeedForward::random(&[3, 4, 1], Activation::Tanh, 0.4, &mut rng);
        let imag = FeedForward::random(&[3, 4, 1], Activation::Tanh, 0.4, &mut rng);
        let psi = Psi::new(real, Some(imag), WaveFunctionForm::Exponential, 3, None, false).unwrap();
        let basis = enumerate_basis(3, &psi.evals);
        assert!(psi.qnade_evaluate(&basis).is_err());
    }
}
