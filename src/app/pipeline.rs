//! Shared "score pipeline" used by the `score` and `summary` commands.
//!
//! ready -> statistics and peer scores (logged) -> closest peers -> optional save

use std::sync::Arc;

use uuid::Uuid;

use crate::data::PopulationSource;
use crate::domain::{DiagnosticResult, Profile};
use crate::engine::CoherenceEngine;
use crate::error::Result;
use crate::report::{PeerScore, closest_peers};

/// All computed outputs of scoring one profile.
#[derive(Debug, Clone)]
pub struct ScoreOutput {
    pub diagnostic: DiagnosticResult,
    pub peers: Vec<PeerScore>,
    pub closest: Vec<PeerScore>,
    /// Set when the analysis was stored.
    pub analysis_id: Option<Uuid>,
}

/// Score `profile` against the engine's installed snapshot.
pub async fn run_score<S: PopulationSource + 'static>(
    engine: &Arc<CoherenceEngine<S>>,
    profile: &Profile,
    top_n: usize,
    save: bool,
) -> Result<ScoreOutput> {
    engine.ready().await;

    let (diagnostic, peers) = engine.statistics_with_peers(profile).await?;
    let analysis_id = if save {
        Some(engine.save_analysis(profile, &diagnostic).await?)
    } else {
        None
    };

    let closest = closest_peers(&peers, top_n);

    Ok(ScoreOutput {
        diagnostic,
        peers,
        closest,
        analysis_id,
    })
}
