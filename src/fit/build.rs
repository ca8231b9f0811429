//! Snapshot construction policy.
//!
//! Responsibilities:
//!
//! - fall back to a degenerate snapshot when the population is too small
//! - learn vocabulary and ranges from the population
//! - reuse warm-start weights when they were trained on the same vocabulary
//! - otherwise train a fresh network

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::domain::{CompensationRecord, TrainingConfig};
use crate::fit::trainer::train_network;
use crate::math::MinMax;
use crate::models::{LocationVocabulary, ModelSnapshot, Network, SnapshotOrigin, encode_features, input_dim};

/// Weights recovered from the durable store.
#[derive(Debug, Clone)]
pub struct WarmStart {
    pub vocabulary: LocationVocabulary,
    pub network: Network,
}

pub fn rng_for(config: &TrainingConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// The cold-start snapshot: fallback-only vocabulary, unit ranges and a single
/// linear unit left at its initial weights.
pub fn degenerate_snapshot(config: &TrainingConfig) -> ModelSnapshot {
    let mut rng = rng_for(config);
    let vocabulary = LocationVocabulary::fallback_only();
    let network = Network::linear(input_dim(&vocabulary), &mut rng);
    ModelSnapshot::new(
        vocabulary,
        MinMax::unit(),
        MinMax::unit(),
        network,
        SnapshotOrigin::Degenerate,
        None,
    )
}

/// Build a snapshot from the population.
///
/// Records with a non-finite compensation are ignored.
pub fn fit_snapshot(
    records: &[CompensationRecord],
    config: &TrainingConfig,
    warm: Option<WarmStart>,
) -> ModelSnapshot {
    let usable: Vec<&CompensationRecord> = records.iter().filter(|r| r.compensation.is_finite()).collect();

    if usable.len() < config.min_records {
        info!(
            records = usable.len(),
            min_records = config.min_records,
            "Population too small, using degenerate snapshot"
        );
        return degenerate_snapshot(config);
    }

    let owned: Vec<CompensationRecord> = usable.iter().map(|r| (*r).clone()).collect();
    let vocabulary = LocationVocabulary::from_records(&owned);
    let xp_range = MinMax::from_values(owned.iter().map(CompensationRecord::xp));
    let output_range = MinMax::from_values(owned.iter().map(|r| r.compensation));

    if let Some(warm) = warm {
        if warm.vocabulary == vocabulary && warm.network.input_dim() == input_dim(&vocabulary) {
            info!(locations = vocabulary.len(), "Reusing stored weights, ranges recomputed");
            return ModelSnapshot::new(
                vocabulary,
                xp_range,
                output_range,
                warm.network,
                SnapshotOrigin::WarmStart,
                None,
            );
        }
        info!("Stored weights were trained on a different vocabulary, retraining");
    }

    let inputs: Vec<Vec<f64>> = owned
        .iter()
        .map(|r| encode_features(&vocabulary, &xp_range, &r.location, r.xp()))
        .collect();
    let targets: Vec<f64> = owned.iter().map(|r| output_range.normalize(r.compensation)).collect();

    let mut rng = rng_for(config);
    let mut network = Network::mlp(input_dim(&vocabulary), &config.hidden_layers, &mut rng);
    debug!(
        parameters = network.parameter_count(),
        records = owned.len(),
        "Training regression network"
    );
    let report = train_network(&mut network, &inputs, &targets, config, &mut rng);
    if report.timed_out {
        warn!(epochs = report.epochs_run, "Training timed out, using degenerate snapshot");
        return degenerate_snapshot(config);
    }
    info!(
        epochs = report.epochs_run,
        stopped_early = report.stopped_early,
        val_mae = report.final_val_loss,
        val_mse = report.final_val_mse,
        "Training finished"
    );

    ModelSnapshot::new(
        vocabulary,
        xp_range,
        output_range,
        network,
        SnapshotOrigin::Trained,
        Some(report),
    )
}
