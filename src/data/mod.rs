//! Population sources.
//!
//! The engine only ever asks one question of its population: "what are all the
//! records right now?". Every source answers it through [`PopulationSource`]:
//!
//! - `memory`: a mutable in-process population (tests, embedding)
//! - `file`: a CSV file re-read on every call
//! - `feed`: a JSON feed over HTTP
//! - `sample`: a synthetic population generator

pub mod feed;
pub mod file;
pub mod memory;
pub mod sample;

use async_trait::async_trait;

use crate::domain::CompensationRecord;
use crate::error::Result;

pub use feed::FeedSource;
pub use file::CsvSource;
pub use memory::InMemorySource;
pub use sample::{SampleConfig, SampleSource, generate_population};

/// Where the training population comes from.
///
/// Must be callable repeatedly; each call reflects the population at call time.
#[async_trait]
pub trait PopulationSource: Send + Sync {
    async fn list_all_compensation_records(&self) -> Result<Vec<CompensationRecord>>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: PopulationSource + ?Sized> PopulationSource for Box<T> {
    async fn list_all_compensation_records(&self) -> Result<Vec<CompensationRecord>> {
        (**self).list_all_compensation_records().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
