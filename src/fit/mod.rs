//! Model fitting orchestration.
//!
//! Responsibilities:
//!
//! - decide between degenerate, warm-start and trained snapshots (`build`)
//! - run the mini-batch training loop with early stopping (`trainer`)
//! - update weights with Adam (`optimizer`)

pub mod build;
pub mod optimizer;
pub mod trainer;

pub use build::*;
pub use trainer::*;
