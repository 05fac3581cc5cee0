//! Resolved run configuration.
//!
//! The simulator has no argument-parsing surface of its own; whatever
//! frontend drives it hands over a fully resolved [`RunConfig`].

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::{Error, Result};

/// Dataset selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    Mnist,
    Cifar,
    Synthetic,
}

impl FromStr for DatasetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mnist" => Ok(Self::Mnist),
            "cifar" => Ok(Self::Cifar),
            "synthetic" => Ok(Self::Synthetic),
            other => Err(Error::UnknownDataset(other.to_string())),
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mnist => write!(f, "mnist"),
            Self::Cifar => write!(f, "cifar"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Model selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Two-layer perceptron with ReLU hidden layer
    Mlp,
    /// Single-layer softmax regression
    Linear,
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mlp" => Ok(Self::Mlp),
            "linear" => Ok(Self::Linear),
            other => Err(Error::UnknownModel(other.to_string())),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mlp => write!(f, "mlp"),
            Self::Linear => write!(f, "linear"),
        }
    }
}

/// Compute device for training.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeDevice {
    Cpu,
    Gpu,
}

impl Default for ComputeDevice {
    fn default() -> Self {
        Self::Cpu
    }
}

/// Resolved configuration of one simulation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Dataset choice
    pub dataset: DatasetKind,
    /// Model choice
    pub model: ModelKind,
    /// Whether client partitions are IID
    pub iid: bool,
    /// Number of simulated clients
    pub num_users: usize,
    /// Fraction of clients sampled each round
    pub frac: f32,
    /// Number of communication rounds
    pub rounds: usize,
    /// Local epochs per client per round
    pub local_epochs: usize,
    /// Local minibatch size
    pub local_batch_size: usize,
    /// SGD learning rate
    pub lr: f32,
    /// SGD momentum
    pub momentum: f32,
    /// Number of label classes
    pub num_classes: usize,
    /// Compute device selector
    pub device: ComputeDevice,
    /// Seed for the shared random source; `None` leaves seeding to entropy
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::Mnist,
            model: ModelKind::Mlp,
            iid: false,
            num_users: 100,
            frac: 0.1,
            rounds: 10,
            local_epochs: 5,
            local_batch_size: 50,
            lr: 0.01,
            momentum: 0.5,
            num_classes: 10,
            device: ComputeDevice::Cpu,
            seed: None,
        }
    }
}

impl RunConfig {
    /// Create a configuration with default experiment settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set dataset choice.
    pub fn with_dataset(mut self, dataset: DatasetKind) -> Self {
        self.dataset = dataset;
        self
    }

    /// Set model choice.
    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    /// Set IID partitioning.
    pub fn with_iid(mut self, iid: bool) -> Self {
        self.iid = iid;
        self
    }

    /// Set number of simulated clients.
    pub fn with_num_users(mut self, num_users: usize) -> Self {
        self.num_users = num_users;
        self
    }

    /// Set per-round client fraction.
    pub fn with_frac(mut self, frac: f32) -> Self {
        self.frac = frac;
        self
    }

    /// Set number of communication rounds.
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    /// Set local epochs per round.
    pub fn with_local_epochs(mut self, local_epochs: usize) -> Self {
        self.local_epochs = local_epochs;
        self
    }

    /// Set local minibatch size.
    pub fn with_local_batch_size(mut self, local_batch_size: usize) -> Self {
        self.local_batch_size = local_batch_size;
        self
    }

    /// Set learning rate.
    pub fn with_lr(mut self, lr: f32) -> Self {
        self.lr = lr;
        self
    }

    /// Set momentum.
    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    /// Set number of label classes.
    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate numeric ranges.
    pub fn validate(&self) -> Result<()> {
        if self.num_users == 0 {
            return Err(Error::InvalidClientCount(self.num_users));
        }
        if !self.frac.is_finite() || self.frac <= 0.0 || self.frac > 1.0 {
            return Err(Error::InvalidClientFraction(self.frac));
        }
        if self.rounds == 0 {
            return Err(Error::InvalidRounds);
        }
        if self.local_epochs == 0 {
            return Err(Error::InvalidLocalEpochs);
        }
        if self.local_batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }
        Ok(())
    }

    /// Number of clients sampled each round, floored at one.
    pub fn clients_per_round(&self) -> usize {
        ((self.frac * self.num_users as f32).round() as usize).max(1)
    }

    /// Build the shared random source from the configured seed.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// File-name stem encoding the experiment, used for persisted artifacts.
    pub fn artifact_stem(&self) -> String {
        format!(
            "fed_{}_{}_{}_C{}_iid{}",
            self.dataset, self.model, self.rounds, self.frac, self.iid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_users, 100);
        assert_eq!(config.local_batch_size, 50);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("mnist".parse::<DatasetKind>().unwrap(), DatasetKind::Mnist);
        assert_eq!("MLP".parse::<ModelKind>().unwrap(), ModelKind::Mlp);
        assert!(matches!(
            "imagenet".parse::<DatasetKind>(),
            Err(Error::UnknownDataset(_))
        ));
        assert!(matches!(
            "transformer".parse::<ModelKind>(),
            Err(Error::UnknownModel(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_ranges() {
        assert!(matches!(
            RunConfig::default().with_num_users(0).validate(),
            Err(Error::InvalidClientCount(0))
        ));
        assert!(matches!(
            RunConfig::default().with_frac(0.0).validate(),
            Err(Error::InvalidClientFraction(_))
        ));
        assert!(matches!(
            RunConfig::default().with_frac(1.5).validate(),
            Err(Error::InvalidClientFraction(_))
        ));
        assert!(matches!(
            RunConfig::default().with_rounds(0).validate(),
            Err(Error::InvalidRounds)
        ));
        assert!(matches!(
            RunConfig::default().with_local_batch_size(0).validate(),
            Err(Error::InvalidBatchSize)
        ));
    }

    #[test]
    fn test_clients_per_round() {
        let config = RunConfig::default().with_num_users(10).with_frac(0.2);
        assert_eq!(config.clients_per_round(), 2);

        // A single client is always sampled, however small the fraction.
        let config = RunConfig::default().with_num_users(1).with_frac(0.01);
        assert_eq!(config.clients_per_round(), 1);

        let config = RunConfig::default().with_num_users(100).with_frac(0.01);
        assert_eq!(config.clients_per_round(), 1);
    }

    #[test]
    fn test_seeded_rng_reproducible() {
        use rand::Rng;
        let config = RunConfig::default().with_seed(7);
        let a: u64 = config.rng().gen();
        let b: u64 = config.rng().gen();
        assert_eq!(a, b);
    }

    #[test]
    fn test_artifact_stem() {
        let config = RunConfig::default()
            .with_dataset(DatasetKind::Mnist)
            .with_model(ModelKind::Mlp)
            .with_rounds(10)
            .with_frac(0.1)
            .with_iid(false);
        assert_eq!(config.artifact_stem(), "fed_mnist_mlp_10_C0.1_iidfalse");
    }
}
