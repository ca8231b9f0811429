//! Mini-batch training loop with a held-out validation split.
//!
//! Given:
//! - encoded inputs `x_i` (one-hot location ++ normalised experience)
//! - normalised targets `y_i` in `[0, 1]`
//!
//! we minimise mean absolute error with Adam, one epoch at a time, and stop
//! once the validation loss has not improved for `patience` epochs.
//!
//! By default the weights of the stopping epoch are kept. With
//! `restore_best` the best-validation weights are restored instead.
//!
//! With `timeout` set, the deadline is checked before every epoch and the run
//! ends with `timed_out` set once it passes.

use std::time::Instant;

use nalgebra::DMatrix;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::TrainingConfig;
use crate::fit::optimizer::Adam;
use crate::models::Network;

/// Outcome of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_val_loss: f64,
    pub final_train_loss: f64,
    pub final_val_loss: f64,
    /// Secondary metric, tracked but not optimised.
    pub final_val_mse: f64,
    pub stopped_early: bool,
    pub restored_best: bool,
    #[serde(default)]
    pub timed_out: bool,
    pub train_size: usize,
    pub val_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStopAction {
    Continue,
    NewBest,
    Stop,
}

/// Patience-based early stopping on a monitored loss.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best_loss: f64,
    best_epoch: usize,
    stale: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self {
            patience: patience.max(1),
            min_delta: min_delta.max(0.0),
            best_loss: f64::INFINITY,
            best_epoch: 0,
            stale: 0,
        }
    }

    /// An improvement must beat the best loss by more than `min_delta`.
    pub fn check(&mut self, loss: f64, epoch: usize) -> EarlyStopAction {
        if loss + self.min_delta < self.best_loss {
            self.best_loss = loss;
            self.best_epoch = epoch;
            self.stale = 0;
            return EarlyStopAction::NewBest;
        }
        self.stale += 1;
        if self.stale >= self.patience {
            EarlyStopAction::Stop
        } else {
            EarlyStopAction::Continue
        }
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }
}

/// Train `network` in place on `(inputs, targets)`.
///
/// `inputs[i]` must have `network.input_dim()` entries.
pub fn train_network<R: Rng + ?Sized>(
    network: &mut Network,
    inputs: &[Vec<f64>],
    targets: &[f64],
    config: &TrainingConfig,
    rng: &mut R,
) -> TrainingReport {
    let n = inputs.len().min(targets.len());
    let (train_idx, val_idx) = split_indices(n, config.validation_fraction, rng);

    let mut adam = Adam::new(network, config.learning_rate);
    let mut stopper = EarlyStopping::new(config.patience, config.min_delta);
    let mut best_network: Option<Network> = None;

    let batch_size = config.batch_size.max(1);
    let mut order = train_idx.clone();
    let mut report = TrainingReport {
        epochs_run: 0,
        best_epoch: 0,
        best_val_loss: f64::INFINITY,
        final_train_loss: f64::NAN,
        final_val_loss: f64::NAN,
        final_val_mse: f64::NAN,
        stopped_early: false,
        restored_best: false,
        timed_out: false,
        train_size: train_idx.len(),
        val_size: val_idx.len(),
    };

    if order.is_empty() {
        return report;
    }

    let deadline = config.timeout.map(|t| Instant::now() + t);

    for epoch in 0..config.max_epochs {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!(epoch, "Training deadline reached");
            report.timed_out = true;
            break;
        }
        order.shuffle(rng);

        let mut abs_sum = 0.0;
        for chunk in order.chunks(batch_size) {
            let (x, y) = batch(inputs, targets, chunk);
            let cache = network.forward_cached(&x);
            let pred = cache.output();

            abs_sum += (pred - &y).abs().sum();

            // d(MAE)/d(pred) = sign(pred - y) / batch
            let scale = 1.0 / chunk.len() as f64;
            let d_out = pred.zip_map(&y, |p, t| sign(p - t) * scale);
            let grads = network.backward(&cache, &d_out);
            adam.step(network, &grads);
        }
        let train_loss = abs_sum / order.len() as f64;

        // Without a validation split, monitor the training loss.
        let (val_loss, val_mse) = if val_idx.is_empty() {
            let (_, mse) = evaluate(network, inputs, targets, &train_idx);
            (train_loss, mse)
        } else {
            evaluate(network, inputs, targets, &val_idx)
        };

        report.epochs_run = epoch + 1;
        report.final_train_loss = train_loss;
        report.final_val_loss = val_loss;
        report.final_val_mse = val_mse;

        match stopper.check(val_loss, epoch) {
            EarlyStopAction::NewBest => {
                if config.restore_best {
                    best_network = Some(network.clone());
                }
            }
            EarlyStopAction::Continue => {}
            EarlyStopAction::Stop => {
                debug!(epoch, val_loss, best = stopper.best_loss(), "Early stopping");
                report.stopped_early = true;
                break;
            }
        }
    }

    report.best_epoch = stopper.best_epoch();
    report.best_val_loss = stopper.best_loss();

    if let Some(best) = best_network {
        *network = best;
        report.restored_best = true;
    }

    report
}

/// Shuffle `0..n` once and hold out the tail as validation.
///
/// The validation size is `n - floor(n * (1 - fraction))`; it is 0 when the
/// split would leave nothing to train on.
pub fn split_indices<R: Rng + ?Sized>(n: usize, fraction: f64, rng: &mut R) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(rng);

    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 0.5) } else { 0.0 };
    let train_n = ((n as f64) * (1.0 - fraction)).floor() as usize;
    if train_n == 0 || train_n >= n {
        return (idx, Vec::new());
    }
    let val = idx.split_off(train_n);
    (idx, val)
}

/// `(MAE, MSE)` over the rows in `idx`.
fn evaluate(network: &Network, inputs: &[Vec<f64>], targets: &[f64], idx: &[usize]) -> (f64, f64) {
    if idx.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let (x, y) = batch(inputs, targets, idx);
    let diff = network.forward(&x) - y;
    let n = idx.len() as f64;
    (diff.abs().sum() / n, diff.map(|d| d * d).sum() / n)
}

fn batch(inputs: &[Vec<f64>], targets: &[f64], idx: &[usize]) -> (DMatrix<f64>, DMatrix<f64>) {
    let dim = inputs.get(idx[0]).map(Vec::len).unwrap_or(0);
    let x = DMatrix::from_fn(dim, idx.len(), |r, c| inputs[idx[c]][r]);
    let y = DMatrix::from_fn(1, idx.len(), |_, c| targets[idx[c]]);
    (x, y)
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
