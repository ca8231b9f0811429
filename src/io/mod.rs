//! Input/output helpers.
//!
//! - population CSV ingest + validation (`ingest`)
//! - diagnostic and peer-score exports (JSON/CSV) (`export`)
//! - snapshot JSON read/write (`snapshot_store`)

pub mod export;
pub mod ingest;
pub mod snapshot_store;

pub use export::*;
pub use ingest::*;
pub use snapshot_store::*;
