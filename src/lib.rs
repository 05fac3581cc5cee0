//! # fedsim - Federated Averaging Simulator
//!
//! Simulates federated learning: a coordinator trains a shared model by
//! averaging updates computed independently by simulated clients on
//! disjoint local data partitions, without clients sharing raw data.
//!
//! - **data**: dataset contract, IID and label-skewed client partitioning
//! - **federated**: local updates, snapshot averaging, the round loop
//! - **model**: the learnable-function contract and reference models
//! - **monitoring**: scalar metrics sink and logging bootstrap
//! - **report**: persisted training-loss artifacts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fedsim::config::RunConfig;
//! use fedsim::data::{Dataset, InMemoryDataset, PartitionMode, Partitioner};
//! use fedsim::federated::Coordinator;
//! use fedsim::model::build_model;
//! use fedsim::monitoring::NoopSink;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RunConfig::default().with_num_users(10).with_seed(42);
//!     let mut rng = config.rng();
//!
//!     let dataset = InMemoryDataset::synthetic(1000, 16, config.num_classes, &mut rng);
//!     let partition = Partitioner::new()
//!         .partition(
//!             &dataset,
//!             config.num_users,
//!             PartitionMode::from_flag(config.iid),
//!             &mut rng,
//!         )
//!         .unwrap();
//!
//!     let mut model = build_model(
//!         config.model,
//!         dataset.feature_dim(),
//!         config.num_classes,
//!         &mut rng,
//!     );
//!     let coordinator = Coordinator::new(&dataset, &partition, config).unwrap();
//!     let run = coordinator
//!         .run(model.as_mut(), &NoopSink, &mut rng)
//!         .await
//!         .unwrap();
//!     println!("final loss: {:?}", run.final_loss());
//! }
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod federated;
pub mod model;
pub mod monitoring;
pub mod report;

pub use crate::core::error::{Error, Result};
