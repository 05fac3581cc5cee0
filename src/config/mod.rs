//! Run configuration for the simulator.

pub mod options;

pub use options::{ComputeDevice, DatasetKind, ModelKind, RunConfig};
