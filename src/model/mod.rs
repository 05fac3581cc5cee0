//! Model contract, parameter snapshots, and persistence.

pub mod net;
pub mod store;
pub mod tensor;

pub use net::{build_model, Linear, Mlp, Mode, Model, DEFAULT_HIDDEN_DIM};
pub use store::{Checkpoint, SnapshotStore};
pub use tensor::{ParameterSnapshot, Tensor};
