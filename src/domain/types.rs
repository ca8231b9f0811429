//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - read from CSV files or a JSON feed
//! - passed between the engine, the trainer and the report builder
//! - exported to JSON alongside a diagnostic

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vocabulary entry every unknown or missing location maps to.
pub const FALLBACK_LOCATION: &str = "other";

/// One observed compensation in the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationRecord {
    /// May be empty when the source did not know the location.
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "total_xp")]
    pub years_xp: Option<f64>,
    pub compensation: f64,
}

impl CompensationRecord {
    pub fn new(location: impl Into<String>, years_xp: Option<f64>, compensation: f64) -> Self {
        Self {
            location: location.into(),
            years_xp,
            compensation,
        }
    }

    /// Years of experience, 0 when unknown.
    pub fn xp(&self) -> f64 {
        self.years_xp.unwrap_or(0.0)
    }
}

/// A profile whose declared compensation is being judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "total_xp")]
    pub years_xp: Option<f64>,
    pub compensation: f64,
    /// Used for attribution only (e.g. an email address); never scored.
    #[serde(default, alias = "email")]
    pub identity_token: Option<String>,
}

impl Profile {
    pub fn new(location: impl Into<String>, years_xp: Option<f64>, compensation: f64) -> Self {
        Self {
            location: location.into(),
            years_xp,
            compensation,
            identity_token: None,
        }
    }

    pub fn with_identity(mut self, token: impl Into<String>) -> Self {
        self.identity_token = Some(token.into());
        self
    }

    /// Years of experience, 0 when absent.
    pub fn xp(&self) -> f64 {
        self.years_xp.unwrap_or(0.0)
    }

    /// The population record this profile would be if it were observed.
    pub fn as_record(&self) -> CompensationRecord {
        CompensationRecord::new(self.location.clone(), self.years_xp, self.compensation)
    }
}

/// Hyper-parameters for the regression network and its training loop.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Hidden layer widths (ReLU). The output layer is a single linear unit.
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    /// Epochs without improvement before stopping.
    pub patience: usize,
    /// Minimum validation loss decrease that counts as improvement.
    pub min_delta: f64,
    pub validation_fraction: f64,
    /// Below this population size training is skipped (degenerate snapshot).
    pub min_records: usize,
    /// Fixed RNG seed for reproducible training; entropy when `None`.
    pub seed: Option<u64>,
    /// Restore the best-validation weights when early stopping fires.
    pub restore_best: bool,
    /// Upper bound on one training run; on expiry the degenerate snapshot is used.
    pub timeout: Option<Duration>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 16],
            learning_rate: 0.01,
            batch_size: 32,
            max_epochs: 200,
            patience: 10,
            min_delta: 1e-6,
            validation_fraction: 0.1,
            min_records: 5,
            seed: None,
            restore_best: false,
            timeout: None,
        }
    }
}

/// Weights and thresholds for profile similarity and peer comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    pub w_location: f64,
    pub w_xp: f64,
    /// Gaussian kernel width for experience, in years.
    pub sigma_xp: f64,
    /// Scores above this count as "near" peers.
    pub near_threshold: f64,
    pub histogram_bins: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            w_location: 0.6,
            w_xp: 0.4,
            sigma_xp: 2.0,
            near_threshold: 0.5,
            histogram_bins: 10,
        }
    }
}

/// Full engine configuration as understood by the lifecycle manager.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub training: TrainingConfig,
    pub similarity: SimilarityConfig,
    /// Durable snapshot location; persistence is disabled when `None`.
    pub snapshot_path: Option<PathBuf>,
}

/// A scored request, as handed to the record sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub location: String,
    pub years_xp: Option<f64>,
    pub compensation: f64,
    pub identity_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            location: profile.location.clone(),
            years_xp: profile.years_xp,
            compensation: profile.compensation,
            identity_token: profile.identity_token.clone(),
            created_at: Utc::now(),
        }
    }
}

/// The input half of a stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub location: Option<String>,
    pub years_xp: Option<f64>,
    pub compensation: f64,
    pub identity_token: Option<String>,
}

impl From<&Profile> for AnalysisInput {
    fn from(profile: &Profile) -> Self {
        Self {
            location: Some(profile.location.clone()).filter(|l| !l.is_empty()),
            years_xp: profile.years_xp,
            compensation: profile.compensation,
            identity_token: profile.identity_token.clone(),
        }
    }
}

/// Reference returned by identity lookups: id plus what was asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRef {
    pub id: Uuid,
    pub input: AnalysisInput,
}

/// Aggregate figures over every scored request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub number_of_scores: usize,
    pub average_compensation: f64,
    pub median_compensation: f64,
    /// Distinct non-empty identity tokens.
    pub number_of_users: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_defaults_missing_xp_to_zero() {
        let p = Profile::new("Paris", None, 42_000.0);
        assert_eq!(p.xp(), 0.0);
        assert_eq!(p.as_record().years_xp, None);
    }

    #[test]
    fn record_accepts_total_xp_alias() {
        let r: CompensationRecord =
            serde_json::from_str(r#"{"location":"Lyon","total_xp":4,"compensation":51000}"#).unwrap();
        assert_eq!(r.years_xp, Some(4.0));
        let r: CompensationRecord = serde_json::from_str(r#"{"compensation":1}"#).unwrap();
        assert!(r.location.is_empty());
    }

    #[test]
    fn analysis_input_drops_empty_location() {
        let input = AnalysisInput::from(&Profile::new("", Some(1.0), 10.0).with_identity("a@b.c"));
        assert_eq!(input.location, None);
        assert_eq!(input.identity_token.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn training_defaults_match_reference_sizing() {
        let c = TrainingConfig::default();
        assert_eq!(c.hidden_layers, vec![64, 16]);
        assert_eq!(c.max_epochs, 200);
        assert_eq!(c.patience, 10);
        assert_eq!(c.min_records, 5);
        assert!(!c.restore_best);
    }
}
