//! Feed-forward networks with per-sample parameter gradients.
//!
//! The wavefunction components are small dense networks evaluated over a
//! batch of spin configurations. Gradient-based optimization of the energy
//! needs the gradient of each scalar output *per sample*, not just the
//! batch-mean gradient, so the reverse pass here keeps the leading batch
//! dimension on every parameter gradient.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Elementwise activation functions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Activation {
    Identity,
    Tanh,
    Sigmoid,
}

impl Activation {
    /// Apply the activation elementwise.
    pub fn apply(&self, z: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            Activation::Identity => z.clone(),
            Activation::Tanh => z.map(|x| x.tanh()),
            Activation::Sigmoid => z.map(|x| 1.0 / (1.0 + (-x).exp())),
        }
    }

    /// Derivative expressed through the activation output `y = f(z)`.
    pub fn derivative_from_output(&self, y: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            Activation::Identity => DMatrix::from_element(y.nrows(), y.ncols(), 1.0),
            Activation::Tanh => y.map(|v| 1.0 - v * v),
            Activation::Sigmoid => y.map(|v| v * (1.0 - v)),
        }
    }
}

/// Affine transform `y = x Wᵀ + b` with `W` stored `[out, in]`.
#[derive(Clone, Debug)]
pub struct Dense {
    pub weight: DMatrix<f64>,
    pub bias: DVector<f64>,
}

impl Dense {
    pub fn new(weight: DMatrix<f64>, bias: DVector<f64>) -> Self {
        assert_eq!(weight.nrows(), bias.len(), "bias length must match output rows");
        Self { weight, bias }
    }

    pub fn output_width(&self) -> usize {
        self.weight.nrows()
    }

    pub fn input_width(&self) -> usize {
        self.weight.ncols()
    }

    /// Batch forward: `x` is `[N, in]`, result `[N, out]`.
    pub fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = x * self.weight.transpose();
        for mut row in out.row_iter_mut() {
            row += self.bias.transpose();
        }
        out
    }
}

/// One network stage: a dense transform followed by an activation.
#[derive(Clone, Debug)]
pub struct Layer {
    pub dense: Dense,
    pub activation: Activation,
}

/// A stack of dense layers evaluated over configuration batches.
#[derive(Clone, Debug)]
pub struct FeedForward {
    pub layers: Vec<Layer>,
}

/// Cached intermediates from a forward pass, consumed by the reverse pass.
struct ForwardCache {
    /// Input to each dense layer, `inputs[l]` is `[N, in_l]`.
    inputs: Vec<DMatrix<f64>>,
    /// Post-activation output of each layer, `outputs[l]` is `[N, out_l]`.
    outputs: Vec<DMatrix<f64>>,
}

impl FeedForward {
    pub fn new(layers: Vec<Layer>) -> Self {
        for pair in layers.windows(2) {
            assert_eq!(
                pair[0].dense.output_width(),
                pair[1].dense.input_width(),
                "adjacent layer widths must chain"
            );
        }
        Self { layers }
    }

    /// Build a network from layer widths with normally distributed weights.
    ///
    /// Hidden layers use `hidden`, the final layer is linear.
    pub fn random(
        widths: &[usize],
        hidden: Activation,
        weight_scale: f64,
        rng: &mut StdRng,
    ) -> Self {
        assert!(widths.len() >= 2, "need at least an input and output width");
        let normal = Normal::new(0.0, weight_scale).unwrap();
        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(l, w)| {
                let (n_in, n_out) = (w[0], w[1]);
                let weight = DMatrix::from_fn(n_out, n_in, |_, _| normal.sample(rng));
                let bias = DVector::from_fn(n_out, |_, _| normal.sample(rng));
                let activation = if l + 2 == widths.len() {
                    Activation::Identity
                } else {
                    hidden
                };
                Layer { dense: Dense::new(weight, bias), activation }
            })
            .collect();
        Self::new(layers)
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, |l| l.dense.input_width())
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, |l| l.dense.output_width())
    }

    /// Batch forward pass: `s` is `[N, in]`, result `[N, out]`.
    pub fn forward(&self, s: &DMatrix<f64>) -> DMatrix<f64> {
        let mut x = s.clone();
        for layer in &self.layers {
            x = layer.activation.apply(&layer.dense.forward(&x));
        }
        x
    }

    fn forward_cached(&self, s: &DMatrix<f64>) -> ForwardCache {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut outputs = Vec::with_capacity(self.layers.len());
        let mut x = s.clone();
        for layer in &self.layers {
            inputs.push(x.clone());
            x = layer.activation.apply(&layer.dense.forward(&x));
            outputs.push(x.clone());
        }
        ForwardCache { inputs, outputs }
    }

    /// Number of parameter tensors (a weight and a bias per layer).
    pub fn num_tensors(&self) -> usize {
        2 * self.layers.len()
    }

    /// Flattened length of parameter tensor `k` (even: weight, odd: bias).
    pub fn tensor_len(&self, k: usize) -> usize {
        let layer = &self.layers[k / 2].dense;
        if k % 2 == 0 {
            layer.weight.nrows() * layer.weight.ncols()
        } else {
            layer.bias.len()
        }
    }

    /// Per-sample gradients of output column `output_col` with respect to
    /// every parameter tensor.
    ///
    /// Returns one `[N, tensor_len]` matrix per tensor, ordered
    /// `[w0, b0, w1, b1, ...]`. Weight entries are flattened column-major
    /// to match nalgebra storage, so row `n` of tensor `2l` holds
    /// `∂ out[n, c] / ∂ W_l[o, i]` at flat index `i·out_l + o`.
    pub fn per_sample_grad(&self, s: &DMatrix<f64>, output_col: usize) -> Vec<DMatrix<f64>> {
        let n_samples = s.nrows();
        let cache = self.forward_cached(s);
        let n_layers = self.layers.len();

        // Seed the reverse pass at the requested output unit.
        let last = &self.layers[n_layers - 1];
        let dact = last.activation.derivative_from_output(&cache.outputs[n_layers - 1]);
        let mut delta = DMatrix::zeros(n_samples, last.dense.output_width());
        for n in 0..n_samples {
            delta[(n, output_col)] = dact[(n, output_col)];
        }

        let mut grads = vec![DMatrix::zeros(0, 0); 2 * n_layers];
        for l in (0..n_layers).rev() {
            let layer = &self.layers[l];
            let x = &cache.inputs[l];
            let (n_out, n_in) = (layer.dense.output_width(), layer.dense.input_width());

            // dW[n, (o,i)] = delta[n, o] * x[n, i]; db[n, o] = delta[n, o]
            let mut gw = DMatrix::zeros(n_samples, n_out * n_in);
            for n in 0..n_samples {
                for i in 0..n_in {
                    for o in 0..n_out {
                        gw[(n, i * n_out + o)] = delta[(n, o)] * x[(n, i)];
                    }
                }
            }
            grads[2 * l] = gw;
            grads[2 * l + 1] = delta.clone();

            if l > 0 {
                let prev = &self.layers[l - 1];
                let dprev = prev.activation.derivative_from_output(&cache.outputs[l - 1]);
                delta = (&delta * &layer.dense.weight).component_mul(&dprev);
            }
        }
        grads
    }

    /// Gradient-descent step: subtract `learning_rate` times each flattened
    /// tensor gradient, in the same ordering as `per_sample_grad`.
    pub fn apply_gradient(&mut self, grads: &[DVector<f64>], learning_rate: f64) {
        assert_eq!(grads.len(), self.num_tensors(), "one gradient per parameter tensor");
        for (l, layer) in self.layers.iter_mut().enumerate() {
            let gw = &grads[2 * l];
            let (n_out, n_in) = (layer.dense.weight.nrows(), layer.dense.weight.ncols());
            for i in 0..n_in {
                for o in 0..n_out {
                    layer.dense.weight[(o, i)] -= learning_rate * gw[i * n_out + o];
                }
            }
            let gb = &grads[2 * l + 1];
            for o in 0..layer.dense.bias.len() {
                layer.dense.bias[o] -= learning_rate * gb[o];
            }
        }
    }

    /// Read one flattened parameter; used by finite-difference checks.
    pub fn get_param(&self, tensor: usize, index: usize) -> f64 {
        let layer = &self.layers[tensor / 2].dense;
        if tensor % 2 == 0 {
            layer.weight.as_slice()[index]
        } else {
            layer.bias[index]
        }
    }

    /// Write one flattened parameter; used by finite-difference checks.
    pub fn set_param(&mut self, tensor: usize, index: usize, value: f64) {
        let layer = &mut self.layers[tensor / 2].dense;
        if tensor % 2 == 0 {
            layer.weight.as_mut_slice()[index] = value;
        } else {
            layer.bias[index] = value;
        }
    }
}
