//! Federated Averaging Core
//!
//! The algorithmic heart of the simulator:
//! - Local optimization on private client splits
//! - Unweighted elementwise snapshot averaging
//! - The round loop: sample, train, join, aggregate, load
//! - Read-only evaluation

pub mod aggregator;
pub mod coordinator;
pub mod evaluator;
pub mod local;

pub use aggregator::average;
pub use coordinator::{Coordinator, RoundRecord, TrainingRun, TRAIN_LOSS_TAG};
pub use evaluator::{evaluate, evaluate_clients, Evaluation};
pub use local::{LocalOutcome, LocalUpdate};
