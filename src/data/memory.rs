//! In-process population.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::data::PopulationSource;
use crate::domain::CompensationRecord;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct InMemorySource {
    records: RwLock<Vec<CompensationRecord>>,
}

impl InMemorySource {
    pub fn new(records: Vec<CompensationRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn push(&self, record: CompensationRecord) {
        self.records.write().await.push(record);
    }

    pub async fn replace(&self, records: Vec<CompensationRecord>) {
        *self.records.write().await = records;
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl PopulationSource for InMemorySource {
    async fn list_all_compensation_records(&self) -> Result<Vec<CompensationRecord>> {
        Ok(self.records.read().await.clone())
    }

    fn describe(&self) -> String {
        "in-memory population".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listing_reflects_current_population() {
        let source = InMemorySource::default();
        assert!(source.list_all_compensation_records().await.unwrap().is_empty());

        source.push(CompensationRecord::new("Paris", Some(1.0), 40_000.0)).await;
        assert_eq!(source.count().await, 1);

        source.replace(vec![]).await;
        assert!(source.list_all_compensation_records().await.unwrap().is_empty());
    }
}
