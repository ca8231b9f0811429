//! Immutable model snapshots.
//!
//! A snapshot bundles everything that must agree for a prediction to mean
//! anything: the location vocabulary, the experience range, the output range
//! and the weights trained against exactly those. Snapshots are never mutated
//! after construction; a refresh builds a new one and swaps it in.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SnapshotMeta;
use crate::error::{Error, Result};
use crate::fit::TrainingReport;
use crate::math::{MinMax, clamp_unit};
use crate::models::encoder::{LocationVocabulary, encode_features};
use crate::models::network::Network;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// How a snapshot's weights came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    /// Too little data (or training gave up); single linear unit, unit ranges.
    Degenerate,
    /// Trained in this process.
    Trained,
    /// Weights reused from the durable store, ranges recomputed.
    WarmStart,
}

impl SnapshotOrigin {
    pub fn display_name(self) -> &'static str {
        match self {
            SnapshotOrigin::Degenerate => "degenerate",
            SnapshotOrigin::Trained => "trained",
            SnapshotOrigin::WarmStart => "warm-start",
        }
    }
}

/// A profile encoded under one particular snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedProfile {
    pub snapshot_version: u64,
    pub features: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    version: u64,
    vocabulary: LocationVocabulary,
    xp_range: MinMax,
    output_range: MinMax,
    network: Network,
    origin: SnapshotOrigin,
    trained_at: DateTime<Utc>,
    report: Option<TrainingReport>,
}

impl ModelSnapshot {
    /// Assemble a snapshot. Each call takes a fresh, process-unique version.
    pub fn new(
        vocabulary: LocationVocabulary,
        xp_range: MinMax,
        output_range: MinMax,
        network: Network,
        origin: SnapshotOrigin,
        report: Option<TrainingReport>,
    ) -> Self {
        Self {
            version: next_version(),
            vocabulary,
            xp_range,
            output_range,
            network,
            origin,
            trained_at: Utc::now(),
            report,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn vocabulary(&self) -> &LocationVocabulary {
        &self.vocabulary
    }

    pub fn xp_range(&self) -> MinMax {
        self.xp_range
    }

    pub fn output_range(&self) -> MinMax {
        self.output_range
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn origin(&self) -> SnapshotOrigin {
        self.origin
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    pub fn encode(&self, location: &str, xp: f64) -> EncodedProfile {
        EncodedProfile {
            snapshot_version: self.version,
            features: encode_features(&self.vocabulary, &self.xp_range, location, xp),
        }
    }

    /// Normalised prediction for an encoding made by this snapshot.
    pub fn predict_encoded(&self, encoded: &EncodedProfile) -> Result<f64> {
        if encoded.snapshot_version != self.version {
            return Err(Error::StaleEncoding {
                encoded: encoded.snapshot_version,
                current: self.version,
            });
        }
        Ok(clamp_unit(self.network.predict_one(&encoded.features)))
    }

    /// Predicted compensation for `(location, xp)`, inside the output range.
    pub fn predict(&self, location: &str, years_xp: Option<f64>) -> f64 {
        let features = encode_features(&self.vocabulary, &self.xp_range, location, years_xp.unwrap_or(0.0));
        let normalized = clamp_unit(self.network.predict_one(&features));
        self.output_range.denormalize(normalized)
    }

    pub fn meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            snapshot_version: self.version,
            origin: self.origin,
            locations: self.vocabulary.entries().to_vec(),
            xp_range: self.xp_range,
            output_range: self.output_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn unit_snapshot() -> ModelSnapshot {
        let mut rng = StdRng::seed_from_u64(5);
        let vocab = LocationVocabulary::fallback_only();
        let net = Network::linear(2, &mut rng);
        ModelSnapshot::new(vocab, MinMax::unit(), MinMax::unit(), net, SnapshotOrigin::Degenerate, None)
    }

    #[test]
    fn versions_are_unique_and_increasing() {
        let a = unit_snapshot();
        let b = unit_snapshot();
        assert!(b.version() > a.version());
    }

    #[test]
    fn stale_encoding_is_rejected() {
        let a = unit_snapshot();
        let b = unit_snapshot();
        let enc = a.encode("X", 3.0);
        assert!(a.predict_encoded(&enc).is_ok());
        assert!(matches!(b.predict_encoded(&enc), Err(Error::StaleEncoding { .. })));
    }

    #[test]
    fn predictions_stay_inside_output_range() {
        let s = unit_snapshot();
        for (loc, xp) in [("X", Some(3.0)), ("", None), ("other", Some(-50.0))] {
            let v = s.predict(loc, xp);
            assert!(v.is_finite());
            assert!((0.0..=1.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn meta_reports_vocabulary_and_ranges() {
        let s = unit_snapshot();
        let meta = s.meta();
        assert_eq!(meta.locations, vec!["other".to_string()]);
        assert_eq!(meta.output_range, MinMax::unit());
        assert_eq!(meta.origin, SnapshotOrigin::Degenerate);
    }
}
