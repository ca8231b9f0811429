//! Adam optimizer over a `Network`'s dense layers.

use crate::models::{LayerGradients, Network};

#[derive(Debug, Clone)]
struct Moments {
    m_w: Vec<f64>,
    v_w: Vec<f64>,
    m_b: Vec<f64>,
    v_b: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    t: i32,
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(network: &Network, learning_rate: f64) -> Self {
        let moments = network
            .layers()
            .iter()
            .map(|l| Moments {
                m_w: vec![0.0; l.weights.len()],
                v_w: vec![0.0; l.weights.len()],
                m_b: vec![0.0; l.bias.len()],
                v_b: vec![0.0; l.bias.len()],
            })
            .collect();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-7,
            t: 0,
            moments,
        }
    }

    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update. `grads` must be ordered like `network.layers()`.
    pub fn step(&mut self, network: &mut Network, grads: &[LayerGradients]) {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return;
        }
        self.t = self.t.saturating_add(1);
        let b1t = 1.0 - self.beta1.powi(self.t);
        let b2t = 1.0 - self.beta2.powi(self.t);
        let cfg = (self.learning_rate, self.beta1, self.beta2, self.eps, b1t, b2t);

        for ((layer, g), m) in network
            .layers_mut()
            .iter_mut()
            .zip(grads)
            .zip(self.moments.iter_mut())
        {
            update(layer.weights.as_mut_slice(), g.d_weights.as_slice(), &mut m.m_w, &mut m.v_w, cfg);
            update(layer.bias.as_mut_slice(), g.d_bias.as_slice(), &mut m.m_b, &mut m.v_b, cfg);
        }
    }
}

fn update(
    params: &mut [f64],
    grads: &[f64],
    m: &mut [f64],
    v: &mut [f64],
    (lr, beta1, beta2, eps, b1t, b2t): (f64, f64, f64, f64, f64, f64),
) {
    for i in 0..params.len().min(grads.len()) {
        let g = grads[i];
        if !g.is_finite() {
            continue;
        }
        m[i] = beta1 * m[i] + (1.0 - beta1) * g;
        v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;
        let m_hat = m[i] / b1t.max(1e-12);
        let v_hat = v[i] / b2t.max(1e-12);
        params[i] -= lr * m_hat / (v_hat.sqrt() + eps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn first_step_moves_each_weight_by_about_lr() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut net = Network::linear(2, &mut rng);
        let before = net.layers()[0].weights.clone();

        let grads = vec![LayerGradients {
            d_weights: DMatrix::from_element(1, 2, 0.5),
            d_bias: nalgebra::DVector::from_element(1, -2.0),
        }];
        let mut adam = Adam::new(&net, 0.01);
        adam.step(&mut net, &grads);

        // With bias correction the first Adam step is ~lr * sign(g).
        let after = &net.layers()[0].weights;
        for (b, a) in before.iter().zip(after.iter()) {
            assert!(((b - a) - 0.01).abs() < 1e-6);
        }
        assert!((net.layers()[0].bias[0] - 0.01).abs() < 1e-6);
        assert_eq!(adam.steps(), 1);
    }
}
