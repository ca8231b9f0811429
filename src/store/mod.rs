//! Attribution sinks: the scored-request log and the analysis store.
//!
//! The engine only depends on the two traits. The in-memory implementations
//! are what the binary and the tests use.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{AnalysisInput, AnalysisRef, DiagnosticResult, ScoreRecord, StoredAnalysis};
use crate::error::{Error, Result};

/// Audit log of scored requests.
#[async_trait]
pub trait ScoreSink: Send + Sync {
    async fn record(&self, record: ScoreRecord) -> Result<()>;
    async fn all(&self) -> Result<Vec<ScoreRecord>>;
}

/// Stores `{input, output}` pairs under an opaque identifier.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn save(&self, input: AnalysisInput, output: DiagnosticResult) -> Result<Uuid>;

    /// `Error::NotFound` when `id` is unknown.
    async fn get(&self, id: Uuid) -> Result<StoredAnalysis>;

    /// Every analysis attributed to `token`, oldest first.
    async fn find_by_identity(&self, token: &str) -> Result<Vec<AnalysisRef>>;
}

#[derive(Debug, Default)]
pub struct InMemoryScoreSink {
    records: RwLock<Vec<ScoreRecord>>,
}

#[async_trait]
impl ScoreSink for InMemoryScoreSink {
    async fn record(&self, record: ScoreRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<ScoreRecord>> {
        Ok(self.records.read().await.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAnalysisStore {
    by_id: RwLock<HashMap<Uuid, StoredAnalysis>>,
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn save(&self, input: AnalysisInput, output: DiagnosticResult) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let stored = StoredAnalysis {
            id,
            input,
            output,
            created_at: Utc::now(),
        };
        self.by_id.write().await.insert(id, stored);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<StoredAnalysis> {
        self.by_id
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("analysis {id}")))
    }

    async fn find_by_identity(&self, token: &str) -> Result<Vec<AnalysisRef>> {
        let guard = self.by_id.read().await;
        let mut hits: Vec<&StoredAnalysis> = guard
            .values()
            .filter(|a| a.input.identity_token.as_deref() == Some(token))
            .collect();
        hits.sort_by_key(|a| a.created_at);
        Ok(hits
            .into_iter()
            .map(|a| AnalysisRef {
                id: a.id,
                input: a.input.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompensationRecord, Profile, SimilarityConfig, TrainingConfig};
    use crate::fit::fit_snapshot;
    use crate::report::assemble_diagnostic;

    fn diagnostic() -> DiagnosticResult {
        let pop = vec![CompensationRecord::new("Paris", Some(2.0), 40_000.0)];
        let snap = fit_snapshot(&pop, &TrainingConfig::default(), None);
        assemble_diagnostic(
            &Profile::new("Paris", Some(2.0), 40_000.0),
            &pop,
            &snap,
            &SimilarityConfig::default(),
        )
    }

    #[tokio::test]
    async fn save_get_and_find_by_identity() {
        let store = InMemoryAnalysisStore::default();
        let profile = Profile::new("Paris", Some(2.0), 40_000.0).with_identity("a@b.c");
        let id = store.save(AnalysisInput::from(&profile), diagnostic()).await.unwrap();
        store
            .save(AnalysisInput::from(&Profile::new("Lyon", None, 1.0)), diagnostic())
            .await
            .unwrap();

        let got = store.get(id).await.unwrap();
        assert_eq!(got.id, id);
        assert_eq!(got.input.location.as_deref(), Some("Paris"));

        let refs = store.find_by_identity("a@b.c").await.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].id, id);
        assert!(store.find_by_identity("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = InMemoryAnalysisStore::default();
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn score_sink_keeps_order() {
        let sink = InMemoryScoreSink::default();
        for c in [1.0, 2.0, 3.0] {
            sink.record(ScoreRecord::from_profile(&Profile::new("X", None, c))).await.unwrap();
        }
        let all = sink.all().await.unwrap();
        assert_eq!(all.iter().map(|r| r.compensation).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }
}
