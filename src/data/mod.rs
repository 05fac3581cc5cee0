//! Data access and client partitioning.
//!
//! The dataset itself is an external collaborator; this module defines
//! the contract it must satisfy and how its index range is split across
//! simulated clients.

pub mod dataset;
pub mod partition;

pub use dataset::{Dataset, DatasetView, InMemoryDataset};
pub use partition::{ClientPartition, PartitionMode, Partitioner};
