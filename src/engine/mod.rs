//! Training lifecycle and the scoring surface.
//!
//! The engine owns exactly one installed `ModelSnapshot` at a time. Training
//! runs in the background; callers await readiness, then read the installed
//! snapshot through an `Arc` that stays valid even if a refresh swaps in a
//! newer one mid-request.
//!
//! State machine:
//!
//! ```text
//! Uninitialized -> Training -> Ready <-> Refreshing
//! ```
//!
//! There is no error state. A failed or timed-out bootstrap installs the
//! degenerate snapshot; a failed refresh keeps the current one.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::data::PopulationSource;
use crate::domain::{
    AnalysisInput, AnalysisRef, CompensationRecord, DiagnosticResult, EngineConfig, Profile, ScoreRecord,
    ScoreSummary, StoredAnalysis, TrainingConfig,
};
use crate::error::{Error, Result};
use crate::fit::{WarmStart, degenerate_snapshot, fit_snapshot};
use crate::io::snapshot_store::{load_snapshot, save_snapshot};
use crate::models::{EncodedProfile, ModelSnapshot, SnapshotOrigin};
use crate::report::{PeerScore, assemble_diagnostic, diagnostic_from_peers, peer_scores, summarize_scores};
use crate::similarity::coherence_score;
use crate::store::{AnalysisStore, InMemoryAnalysisStore, InMemoryScoreSink, ScoreSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Training,
    Ready,
    Refreshing,
}

impl EngineState {
    pub fn display_name(self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Training => "training",
            EngineState::Ready => "ready",
            EngineState::Refreshing => "refreshing",
        }
    }
}

pub struct CoherenceEngine<S: PopulationSource> {
    source: S,
    config: EngineConfig,
    scores: Arc<dyn ScoreSink>,
    analyses: Arc<dyn AnalysisStore>,
    state: watch::Sender<EngineState>,
    /// `None` until the first snapshot is installed.
    snapshot: watch::Sender<Option<Arc<ModelSnapshot>>>,
    /// Held for the whole of a training run; at most one runs at a time.
    training: Mutex<()>,
}

impl<S: PopulationSource + 'static> CoherenceEngine<S> {
    /// Create the engine with in-memory sinks and start training.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(source: S, config: EngineConfig) -> Arc<Self> {
        Self::start_with_sinks(
            source,
            config,
            Arc::new(InMemoryScoreSink::default()),
            Arc::new(InMemoryAnalysisStore::default()),
        )
    }

    pub fn start_with_sinks(
        source: S,
        config: EngineConfig,
        scores: Arc<dyn ScoreSink>,
        analyses: Arc<dyn AnalysisStore>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(EngineState::Uninitialized);
        let (snapshot, _) = watch::channel(None);
        let engine = Arc::new(Self {
            source,
            config,
            scores,
            analyses,
            state,
            snapshot,
            training: Mutex::new(()),
        });

        let background = Arc::clone(&engine);
        tokio::spawn(async move {
            background.bootstrap().await;
        });
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Resolves once a snapshot (possibly degenerate) is installed.
    pub async fn ready(&self) {
        let _ = self.snapshot().await;
    }

    /// The installed snapshot, waiting for the first one if necessary.
    pub async fn snapshot(&self) -> Arc<ModelSnapshot> {
        let mut rx = self.snapshot.subscribe();
        loop {
            if let Some(snap) = rx.borrow_and_update().clone() {
                return snap;
            }
            if rx.changed().await.is_err() {
                // Unreachable while `self` is alive; keep the call total anyway.
                return Arc::new(degenerate_snapshot(&self.config.training));
            }
        }
    }

    /// Predicted compensation for the profile's location and experience.
    pub async fn predict(&self, profile: &Profile) -> f64 {
        self.snapshot().await.predict(&profile.location, profile.years_xp)
    }

    pub async fn coherence_score(&self, profile: &Profile) -> f64 {
        let predicted = self.predict(profile).await;
        coherence_score(profile.compensation, predicted)
    }

    /// Encode under the installed snapshot, for later [`Self::predict_encoded`].
    pub async fn encode(&self, profile: &Profile) -> EncodedProfile {
        self.snapshot().await.encode(&profile.location, profile.xp())
    }

    /// Normalised prediction; `Error::StaleEncoding` if a refresh happened since
    /// `encoded` was built.
    pub async fn predict_encoded(&self, encoded: &EncodedProfile) -> Result<f64> {
        self.snapshot().await.predict_encoded(encoded)
    }

    /// Full diagnostic for `profile`. The request is logged to the score sink.
    pub async fn statistics(&self, profile: &Profile) -> Result<DiagnosticResult> {
        let snapshot = self.snapshot().await;

        if let Err(e) = self.scores.record(ScoreRecord::from_profile(profile)).await {
            warn!(error = %e, "Failed to record scored request");
        }

        let population = self.source.list_all_compensation_records().await?;
        let target = profile.clone();
        let similarity = self.config.similarity;
        tokio::task::spawn_blocking(move || assemble_diagnostic(&target, &population, &snapshot, &similarity))
            .await
            .map_err(|e| Error::Internal(format!("Diagnostic task failed: {e}")))
    }

    /// Diagnostic and per-record scores for `profile` from a single population
    /// read. The request is logged to the score sink.
    pub async fn statistics_with_peers(&self, profile: &Profile) -> Result<(DiagnosticResult, Vec<PeerScore>)> {
        let snapshot = self.snapshot().await;

        if let Err(e) = self.scores.record(ScoreRecord::from_profile(profile)).await {
            warn!(error = %e, "Failed to record scored request");
        }

        let population = self.source.list_all_compensation_records().await?;
        let target = profile.clone();
        let similarity = self.config.similarity;
        tokio::task::spawn_blocking(move || {
            let peers = peer_scores(&target, &population, &snapshot, &similarity);
            let diagnostic = diagnostic_from_peers(&target, &population, &peers, &snapshot, &similarity);
            (diagnostic, peers)
        })
        .await
        .map_err(|e| Error::Internal(format!("Diagnostic task failed: {e}")))
    }

    /// Retrain from the current population and install the result.
    ///
    /// Calls queued behind an in-flight refresh return that refresh's version
    /// instead of training again. Calls made before the first snapshot was
    /// installed never collapse into the startup run, which may have read an
    /// older population. If the population cannot be read, the current
    /// snapshot stays installed and the error is returned.
    pub async fn refresh_model(&self) -> Result<u64> {
        let seen = self.installed_version();
        let _guard = self.training.lock().await;
        if let (Some(seen), Some(current)) = (seen, self.installed_version()) {
            if current != seen {
                debug!(version = current, "Refresh collapsed into the run that just finished");
                return Ok(current);
            }
        }

        self.state.send_replace(EngineState::Refreshing);
        info!(source = %self.source.describe(), "Refreshing model");

        let records = match self.source.list_all_compensation_records().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Population unavailable, keeping current snapshot");
                self.state.send_replace(EngineState::Ready);
                return Err(e);
            }
        };

        let snapshot = self.train(records, None).await;
        let version = snapshot.version();
        self.persist(&snapshot).await;
        self.install(snapshot);
        Ok(version)
    }

    /// Run [`Self::statistics`] and store `{input, output}`.
    pub async fn analyze_and_save(&self, profile: &Profile) -> Result<(Uuid, DiagnosticResult)> {
        let output = self.statistics(profile).await?;
        let id = self.save_analysis(profile, &output).await?;
        Ok((id, output))
    }

    /// Store an already computed diagnostic for `profile`.
    pub async fn save_analysis(&self, profile: &Profile, output: &DiagnosticResult) -> Result<Uuid> {
        self.analyses.save(AnalysisInput::from(profile), output.clone()).await
    }

    pub async fn get_analysis(&self, id: Uuid) -> Result<StoredAnalysis> {
        self.analyses.get(id).await
    }

    pub async fn find_analyses_by_identity(&self, token: &str) -> Result<Vec<AnalysisRef>> {
        self.analyses.find_by_identity(token).await
    }

    /// Global figures over every request logged by [`Self::statistics`].
    pub async fn score_summary(&self) -> Result<ScoreSummary> {
        Ok(summarize_scores(&self.scores.all().await?))
    }

    fn installed_version(&self) -> Option<u64> {
        self.snapshot.borrow().as_ref().map(|s| s.version())
    }

    async fn bootstrap(&self) {
        let _guard = self.training.lock().await;
        self.state.send_replace(EngineState::Training);
        info!(source = %self.source.describe(), "Training initial model");

        let records = match self.source.list_all_compensation_records().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Population unavailable at startup, training on an empty population");
                Vec::new()
            }
        };

        let warm = self.load_warm_start().await;
        let snapshot = self.train(records, warm).await;
        self.persist(&snapshot).await;
        self.install(snapshot);
    }

    async fn train(&self, records: Vec<CompensationRecord>, warm: Option<WarmStart>) -> ModelSnapshot {
        let config: TrainingConfig = self.config.training.clone();
        let fallback = config.clone();
        match tokio::task::spawn_blocking(move || fit_snapshot(&records, &config, warm)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Training task failed, using degenerate snapshot");
                degenerate_snapshot(&fallback)
            }
        }
    }

    fn install(&self, snapshot: ModelSnapshot) {
        info!(
            version = snapshot.version(),
            origin = snapshot.origin().display_name(),
            locations = snapshot.vocabulary().len(),
            "Snapshot installed"
        );
        self.snapshot.send_replace(Some(Arc::new(snapshot)));
        self.state.send_replace(EngineState::Ready);
    }

    async fn load_warm_start(&self) -> Option<WarmStart> {
        let path = self.config.snapshot_path.clone()?;
        let shown = path.display().to_string();
        match tokio::task::spawn_blocking(move || load_snapshot(&path)).await {
            Ok(Ok(Some(file))) => {
                debug!(path = %shown, "Loaded stored snapshot");
                Some(file.into_warm_start())
            }
            Ok(Ok(None)) => {
                debug!(path = %shown, "No stored snapshot");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Ignoring stored snapshot");
                None
            }
            Err(e) => {
                warn!(error = %e, "Snapshot load task failed");
                None
            }
        }
    }

    /// Degenerate snapshots carry nothing worth keeping and are not saved.
    async fn persist(&self, snapshot: &ModelSnapshot) {
        let Some(path) = self.config.snapshot_path.clone() else {
            return;
        };
        if snapshot.origin() == SnapshotOrigin::Degenerate {
            return;
        }
        let shown = path.display().to_string();
        let snap = snapshot.clone();
        match tokio::task::spawn_blocking(move || save_snapshot(&path, &snap)).await {
            Ok(Ok(())) => debug!(path = %shown, "Snapshot saved"),
            Ok(Err(e)) => warn!(error = %e, "Snapshot not saved"),
            Err(e) => warn!(error = %e, "Snapshot save task failed"),
        }
    }
}

/// Where the durable snapshot lives when none is configured explicitly.
pub fn default_snapshot_path() -> PathBuf {
    PathBuf::from("model").join("snapshot.json")
}
