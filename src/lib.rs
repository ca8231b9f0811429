//! `salary-coherence` library crate.
//!
//! Scores how coherent a declared salary is with a compensation population:
//! a small regression network predicts pay from `(location, experience)`, and
//! the diagnostic compares the declared figure with that prediction and with
//! the population around it.
//!
//! The binary (`coherence`) is a thin wrapper around this library so that:
//!
//! - the engine is testable without spawning processes
//! - population sources and sinks can be swapped behind traits
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod similarity;
pub mod store;
