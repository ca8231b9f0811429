//! A small feed-forward regression network on `nalgebra` matrices.
//!
//! Layout convention: a batch is a `features × batch` matrix, so every layer
//! computes `Z = W · X + b` column-wise. Weights are Glorot-uniform, biases
//! start at zero.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(self, z: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            Activation::Relu => z.map(|v| v.max(0.0)),
            Activation::Linear => z.clone(),
        }
    }

    /// `dL/dZ` from `dL/dA` and the pre-activation `Z`.
    fn backprop(self, z: &DMatrix<f64>, d_a: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            Activation::Relu => d_a.zip_map(z, |g, v| if v > 0.0 { g } else { 0.0 }),
            Activation::Linear => d_a.clone(),
        }
    }
}

/// Fully connected layer: `weights` is `output × input`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub weights: DMatrix<f64>,
    pub bias: DVector<f64>,
    pub activation: Activation,
}

impl Dense {
    pub fn glorot<R: Rng + ?Sized>(input: usize, output: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (input + output).max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        Self {
            weights: DMatrix::from_fn(output, input, |_, _| dist.sample(rng)),
            bias: DVector::zeros(output),
            activation,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Returns `(Z, A)` for a `input × batch` matrix.
    fn forward(&self, x: &DMatrix<f64>) -> (DMatrix<f64>, DMatrix<f64>) {
        let mut z = &self.weights * x;
        for j in 0..z.ncols() {
            for i in 0..z.nrows() {
                z[(i, j)] += self.bias[i];
            }
        }
        let a = self.activation.apply(&z);
        (z, a)
    }
}

/// Gradients for one layer, shaped like the layer's parameters.
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub d_weights: DMatrix<f64>,
    pub d_bias: DVector<f64>,
}

/// Per-layer activations kept from a forward pass for backpropagation.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    input: DMatrix<f64>,
    layers: Vec<(DMatrix<f64>, DMatrix<f64>)>,
}

impl ForwardCache {
    /// Network output (`1 × batch`).
    pub fn output(&self) -> &DMatrix<f64> {
        self.layers
            .last()
            .map(|(_, a)| a)
            .unwrap_or(&self.input)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<Dense>,
}

impl Network {
    /// ReLU hidden layers followed by a single linear output unit.
    pub fn mlp<R: Rng + ?Sized>(input_dim: usize, hidden: &[usize], rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut prev = input_dim;
        for &units in hidden.iter().filter(|&&u| u > 0) {
            layers.push(Dense::glorot(prev, units, Activation::Relu, rng));
            prev = units;
        }
        layers.push(Dense::glorot(prev, 1, Activation::Linear, rng));
        Self { layers }
    }

    /// A single linear unit: the cold-start model.
    pub fn linear<R: Rng + ?Sized>(input_dim: usize, rng: &mut R) -> Self {
        Self::mlp(input_dim, &[], rng)
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(Dense::input_dim).unwrap_or(0)
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Dense] {
        &mut self.layers
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum()
    }

    /// Forward pass over a `features × batch` matrix; returns `1 × batch`.
    pub fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let mut a = x.clone();
        for layer in &self.layers {
            a = layer.forward(&a).1;
        }
        a
    }

    /// Raw (unclamped) output for one encoded input.
    pub fn predict_one(&self, features: &[f64]) -> f64 {
        let x = DMatrix::from_column_slice(features.len(), 1, features);
        self.forward(&x)[(0, 0)]
    }

    pub fn forward_cached(&self, x: &DMatrix<f64>) -> ForwardCache {
        let mut layers: Vec<(DMatrix<f64>, DMatrix<f64>)> = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let prev = if i == 0 { x } else { &layers[i - 1].1 };
            let out = layer.forward(prev);
            layers.push(out);
        }
        ForwardCache {
            input: x.clone(),
            layers,
        }
    }

    /// Backpropagate `dL/d output` through a cached forward pass.
    ///
    /// Returned gradients are ordered like `layers()`.
    pub fn backward(&self, cache: &ForwardCache, d_output: &DMatrix<f64>) -> Vec<LayerGradients> {
        let mut grads = Vec::with_capacity(self.layers.len());
        let mut d_a = d_output.clone();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let (z, _) = &cache.layers[i];
            let a_prev = if i == 0 { &cache.input } else { &cache.layers[i - 1].1 };

            let d_z = layer.activation.backprop(z, &d_a);
            let d_weights = &d_z * a_prev.transpose();
            let d_bias = d_z.column_sum();
            if i > 0 {
                d_a = layer.weights.transpose() * &d_z;
            }
            grads.push(LayerGradients { d_weights, d_bias });
        }

        grads.reverse();
        grads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn mlp_shapes_follow_hidden_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = Network::mlp(6, &[64, 16], &mut rng);
        let dims: Vec<(usize, usize)> = net.layers().iter().map(|l| (l.input_dim(), l.output_dim())).collect();
        assert_eq!(dims, vec![(6, 64), (64, 16), (16, 1)]);
        assert_eq!(net.input_dim(), 6);
        assert_eq!(net.parameter_count(), 6 * 64 + 64 + 64 * 16 + 16 + 16 + 1);
    }

    #[test]
    fn linear_network_is_one_dense_unit() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = Network::linear(2, &mut rng);
        assert_eq!(net.layers().len(), 1);
        assert_eq!(net.layers()[0].activation, Activation::Linear);
        assert!(net.predict_one(&[1.0, 1.0]).is_finite());
    }

    #[test]
    fn backward_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(3);
        let net = Network::mlp(3, &[4], &mut rng);
        let x = DMatrix::from_column_slice(3, 2, &[0.2, 0.7, 0.1, 0.9, 0.3, 0.5]);

        // L = sum(output), so dL/d output = 1.
        let cache = net.forward_cached(&x);
        let ones = DMatrix::from_element(1, 2, 1.0);
        let grads = net.backward(&cache, &ones);

        let eps = 1e-6;
        for (li, layer) in net.layers().iter().enumerate() {
            for idx in 0..layer.weights.len() {
                let mut plus = net.clone();
                plus.layers_mut()[li].weights.as_mut_slice()[idx] += eps;
                let mut minus = net.clone();
                minus.layers_mut()[li].weights.as_mut_slice()[idx] -= eps;
                let numeric = (plus.forward(&x).sum() - minus.forward(&x).sum()) / (2.0 * eps);
                let analytic = grads[li].d_weights.as_slice()[idx];
                assert!((numeric - analytic).abs() < 1e-5, "layer {li} w{idx}: {numeric} vs {analytic}");
            }
        }
    }

    #[test]
    fn cached_forward_matches_plain_forward() {
        let mut rng = StdRng::seed_from_u64(19);
        let net = Network::mlp(4, &[6, 3], &mut rng);
        let x = DMatrix::from_column_slice(4, 2, &[0.1, 0.0, 1.0, 0.4, 0.9, 1.0, 0.0, 0.2]);
        let cache = net.forward_cached(&x);
        assert_eq!(cache.output().shape(), (1, 2));
        assert!((cache.output() - net.forward(&x)).abs().max() < 1e-12);
    }

    #[test]
    fn network_round_trips_through_json() {
        let mut rng = StdRng::seed_from_u64(11);
        let net = Network::mlp(3, &[5], &mut rng);
        let json = serde_json::to_string(&net).unwrap();
        let back: Network = serde_json::from_str(&json).unwrap();
        let x = [0.1, 0.0, 0.4];
        assert!((back.predict_one(&x) - net.predict_one(&x)).abs() < 1e-12);
    }
}
