//! The regression model: feature encoding, network and immutable snapshots.

pub mod encoder;
pub mod network;
pub mod snapshot;

pub use encoder::*;
pub use network::*;
pub use snapshot::*;
