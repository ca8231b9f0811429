//! Mathematical utilities: unit-interval normalisation and descriptive statistics.

pub mod normalize;
pub mod stats;

pub use normalize::*;
