//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - population records and query profiles (`CompensationRecord`, `Profile`)
//! - engine configuration (`TrainingConfig`, `SimilarityConfig`, `EngineConfig`)
//! - the per-request diagnostic (`DiagnosticResult` and its parts)

pub mod diagnostic;
pub mod types;

pub use diagnostic::*;
pub use types::*;
