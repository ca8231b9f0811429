//! CSV file population source.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::data::PopulationSource;
use crate::domain::CompensationRecord;
use crate::error::{Error, Result};
use crate::io::ingest::load_population_csv;

/// Re-reads the file on every call, so edits show up on the next refresh.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PopulationSource for CsvSource {
    async fn list_all_compensation_records(&self) -> Result<Vec<CompensationRecord>> {
        let path = self.path.clone();
        let ingested = tokio::task::spawn_blocking(move || load_population_csv(&path))
            .await
            .map_err(|e| Error::Internal(format!("CSV ingest task failed: {e}")))?
            .map_err(|e| Error::Source(e.to_string()))?;

        for err in ingested.row_errors.iter().take(5) {
            warn!(line = err.line, "Skipped CSV row: {}", err.message);
        }
        debug!(
            rows_read = ingested.rows_read,
            rows_used = ingested.records.len(),
            rows_skipped = ingested.row_errors.len(),
            "Loaded population CSV"
        );
        Ok(ingested.records)
    }

    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }
}
