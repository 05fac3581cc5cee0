//! The federated training loop.
//!
//! One round: sample a client subset, dispatch local updates against a
//! copy of the global snapshot, join all results, average, load the mean
//! back into the global model, record the round loss.

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::core::{now, ClientId, Error, Result, RunId, Timestamp};
use crate::data::dataset::Dataset;
use crate::data::partition::ClientPartition;
use crate::federated::aggregator;
use crate::federated::local::LocalUpdate;
use crate::model::net::{build_model, Mode, Model};
use crate::monitoring::metrics::MetricsSink;

/// Metric tag for the per-round mean training loss.
pub const TRAIN_LOSS_TAG: &str = "train/loss";

/// One appended entry of the training-loss sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round index, starting at zero
    pub round: usize,
    /// Mean training loss across the round's sampled clients
    pub loss: f32,
    /// Clients sampled this round
    pub clients: Vec<ClientId>,
    /// Completion timestamp
    pub timestamp: Timestamp,
}

/// Completed training run: identity plus the ordered loss history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingRun {
    /// Unique id of this run
    pub run_id: RunId,
    /// One record per round, in round order
    pub history: Vec<RoundRecord>,
}

impl TrainingRun {
    /// Per-round losses in round order.
    pub fn losses(&self) -> Vec<f32> {
        self.history.iter().map(|r| r.loss).collect()
    }

    /// Loss of the final round, if any rounds ran.
    pub fn final_loss(&self) -> Option<f32> {
        self.history.last().map(|r| r.loss)
    }
}

/// Orchestrates rounds over a fixed dataset, partition, and configuration.
///
/// The global model stays outside: it is passed `&mut` into [`run`] and is
/// the single object this coordinator writes, once per round.
///
/// [`run`]: Coordinator::run
#[derive(Debug)]
pub struct Coordinator<'a, D: Dataset + ?Sized> {
    dataset: &'a D,
    partition: &'a ClientPartition,
    config: RunConfig,
}

impl<'a, D: Dataset + ?Sized> Coordinator<'a, D> {
    /// Create a coordinator, rejecting invalid configurations up front.
    pub fn new(
        dataset: &'a D,
        partition: &'a ClientPartition,
        config: RunConfig,
    ) -> Result<Self> {
        config.validate()?;
        if partition.num_clients() < config.num_users {
            return Err(Error::PartitionMismatch {
                covered: partition.num_clients(),
                required: config.num_users,
            });
        }
        Ok(Self {
            dataset,
            partition,
            config,
        })
    }

    /// The resolved configuration this coordinator runs under.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run all configured rounds, mutating `model` once per round.
    ///
    /// Per-client updates are dispatched as joined futures; every result
    /// is collected before aggregation (the round barrier). A single
    /// failed update fails the whole round and aborts the run.
    pub async fn run<R: Rng>(
        &self,
        model: &mut dyn Model,
        sink: &dyn MetricsSink,
        rng: &mut R,
    ) -> Result<TrainingRun> {
        let run_id = RunId::generate();
        let clients_per_round = self.config.clients_per_round();
        let feature_dim = self.dataset.feature_dim();

        tracing::info!(
            %run_id,
            rounds = self.config.rounds,
            num_users = self.config.num_users,
            clients_per_round,
            "starting federated training"
        );

        model.set_mode(Mode::Train);
        let mut history = Vec::with_capacity(self.config.rounds);

        for round in 0..self.config.rounds {
            let sampled: Vec<ClientId> =
                index::sample(rng, self.config.num_users, clients_per_round)
                    .into_iter()
                    .collect();
            // Per-client seeds are drawn from the shared source before the
            // fan-out, so execution order cannot perturb reproducibility.
            let seeded: Vec<(ClientId, u64)> =
                sampled.iter().map(|&client| (client, rng.gen())).collect();

            let global = model.state_dict();
            let jobs = seeded.iter().map(|&(client, seed)| {
                let global = &global;
                async move {
                    let indices = self
                        .partition
                        .indices(client)
                        .ok_or(Error::EmptyPartition(client))?;
                    let update = LocalUpdate::new(self.dataset, client, indices, &self.config)?;
                    let mut local_rng = StdRng::seed_from_u64(seed);
                    let mut local_model = build_model(
                        self.config.model,
                        feature_dim,
                        self.config.num_classes,
                        &mut local_rng,
                    );
                    update.train(local_model.as_mut(), global, &mut local_rng).await
                }
            });
            let results = join_all(jobs).await;

            let mut snapshots = Vec::with_capacity(results.len());
            let mut losses = Vec::with_capacity(results.len());
            for result in results {
                let outcome = result?;
                snapshots.push(outcome.snapshot);
                losses.push(outcome.loss);
            }

            let averaged = aggregator::average(&snapshots)?;
            model.load_state_dict(&averaged)?;

            let round_loss = losses.iter().sum::<f32>() / losses.len() as f32;
            sink.scalar(TRAIN_LOSS_TAG, round_loss as f64, round);
            tracing::info!(round, loss = round_loss, "round complete");

            history.push(RoundRecord {
                round,
                loss: round_loss,
                clients: sampled,
                timestamp: now(),
            });
        }

        Ok(TrainingRun { run_id, history })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelKind;
    use crate::data::dataset::InMemoryDataset;
    use crate::data::partition::Partitioner;
    use crate::federated::evaluator;
    use crate::monitoring::metrics::{MemorySink, NoopSink};
    use std::collections::BTreeMap;
    use std::collections::HashSet;

    fn small_config() -> RunConfig {
        RunConfig::default()
            .with_model(ModelKind::Linear)
            .with_num_users(10)
            .with_frac(0.2)
            .with_rounds(3)
            .with_local_epochs(1)
            .with_local_batch_size(10)
            .with_lr(0.1)
            .with_momentum(0.0)
            .with_num_classes(4)
            .with_seed(17)
    }

    fn fixture(
        config: &RunConfig,
        samples: usize,
    ) -> (InMemoryDataset, ClientPartition, StdRng) {
        let mut rng = config.rng();
        let dataset = InMemoryDataset::synthetic(samples, 4, config.num_classes, &mut rng);
        let partition = Partitioner::new()
            .iid(samples, config.num_users, &mut rng)
            .unwrap();
        (dataset, partition, rng)
    }

    #[tokio::test]
    async fn test_round_accounting() {
        let config = small_config();
        let (dataset, partition, mut rng) = fixture(&config, 100);
        let coordinator = Coordinator::new(&dataset, &partition, config.clone()).unwrap();
        let mut model = build_model(config.model, 4, config.num_classes, &mut rng);
        let sink = MemorySink::new();

        let run = coordinator
            .run(model.as_mut(), &sink, &mut rng)
            .await
            .unwrap();

        assert_eq!(run.history.len(), 3);
        for (i, record) in run.history.iter().enumerate() {
            assert_eq!(record.round, i);
            assert_eq!(record.clients.len(), 2);
            let distinct: HashSet<ClientId> = record.clients.iter().copied().collect();
            assert_eq!(distinct.len(), 2, "sampled clients must be distinct");
            assert!(record.loss.is_finite());
        }

        // One metrics event per completed round - the aggregation barrier
        // held every time.
        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.tag == TRAIN_LOSS_TAG));
        assert_eq!(run.losses().len(), 3);
        assert!(run.final_loss().is_some());
    }

    #[tokio::test]
    async fn test_single_user_always_sampled() {
        let config = small_config().with_num_users(1).with_frac(0.1);
        let (dataset, partition, mut rng) = fixture(&config, 30);
        let coordinator = Coordinator::new(&dataset, &partition, config.clone()).unwrap();
        let mut model = build_model(config.model, 4, config.num_classes, &mut rng);

        let run = coordinator
            .run(model.as_mut(), &NoopSink, &mut rng)
            .await
            .unwrap();

        for record in &run.history {
            assert_eq!(record.clients, vec![0]);
        }
    }

    #[tokio::test]
    async fn test_training_improves_global_model() {
        let config = small_config()
            .with_num_users(5)
            .with_frac(1.0)
            .with_rounds(5)
            .with_local_epochs(3)
            .with_lr(0.3);
        let (dataset, partition, mut rng) = fixture(&config, 200);
        let coordinator = Coordinator::new(&dataset, &partition, config.clone()).unwrap();
        let mut model = build_model(config.model, 4, config.num_classes, &mut rng);

        let run = coordinator
            .run(model.as_mut(), &NoopSink, &mut rng)
            .await
            .unwrap();

        let eval = evaluator::evaluate(model.as_mut(), &dataset).unwrap();
        assert!(eval.accuracy > 0.5, "accuracy was {}", eval.accuracy);
        let losses = run.losses();
        assert!(losses.last().unwrap() < losses.first().unwrap());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_loop() {
        let config = small_config().with_num_users(0);
        let (dataset, partition, _) = fixture(&small_config(), 50);
        let err = Coordinator::new(&dataset, &partition, config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_partition_must_cover_all_users() {
        let config = small_config().with_num_users(20);
        let (dataset, partition, _) = fixture(&small_config(), 50);
        let err = Coordinator::new(&dataset, &partition, config).unwrap_err();
        assert!(matches!(
            err,
            Error::PartitionMismatch {
                covered: 10,
                required: 20
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_client_partition_fails_round() {
        let config = small_config().with_num_users(1).with_frac(1.0);
        let mut rng = config.rng();
        let dataset = InMemoryDataset::synthetic(10, 4, 4, &mut rng);
        let mut assignments = BTreeMap::new();
        assignments.insert(0, Vec::new());
        let partition = ClientPartition::from_assignments(assignments);

        let coordinator = Coordinator::new(&dataset, &partition, config.clone()).unwrap();
        let mut model = build_model(config.model, 4, config.num_classes, &mut rng);

        let err = coordinator
            .run(model.as_mut(), &NoopSink, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyPartition(0)));
    }

    #[tokio::test]
    async fn test_seeded_runs_reproduce_losses() {
        let config = small_config();

        let mut first_losses = Vec::new();
        let mut second_losses = Vec::new();
        for losses in [&mut first_losses, &mut second_losses] {
            let (dataset, partition, mut rng) = fixture(&config, 100);
            let coordinator =
                Coordinator::new(&dataset, &partition, config.clone()).unwrap();
            let mut model = build_model(config.model, 4, config.num_classes, &mut rng);
            let run = coordinator
                .run(model.as_mut(), &NoopSink, &mut rng)
                .await
                .unwrap();
            *losses = run.losses();
        }

        assert_eq!(first_losses, second_losses);
    }
}
